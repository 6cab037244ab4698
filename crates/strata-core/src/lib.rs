//! # strata-core
//!
//! Soil-type classification between logged boreholes.
//!
//! Raw stratum rows are normalized into depth-contiguous intervals with
//! single-character soil codes, indexed per borehole as interface nodes plus a
//! domain sequence, and queried by an inverse-distance weighted vote of each
//! query point's natural-neighbour boreholes.
//!
//! ```
//! use strata_core::{Borehole, QueryPoint, Site, SiteConfig, StratumRow, WeightedClassifier};
//!
//! let cfg = SiteConfig::default();
//! let boreholes = vec![
//!     Borehole::new("ZK1", 0.0, 0.0, 0.0),
//!     Borehole::new("ZK2", 10.0, 0.0, 0.0),
//!     Borehole::new("ZK3", 0.0, 10.0, 0.0),
//! ];
//! let rows: Vec<StratumRow> = ["ZK1", "ZK2", "ZK3"]
//!     .iter()
//!     .map(|id| StratumRow::new(*id, 5.0, "1", "clay"))
//!     .collect();
//! let site = Site::build(boreholes, &rows, &cfg.normalize).unwrap();
//!
//! let classifier = WeightedClassifier::new(cfg.classifier).unwrap();
//! let mut points = vec![QueryPoint::new(3.0, 3.0, -2.0)];
//! strata_core::classify_batch(&classifier, &site, &mut points);
//! assert_eq!(site.describe(points[0].result.unwrap()), "clay");
//! ```

pub mod batch;
pub mod borehole;
pub mod classifier;
pub mod config;
pub mod error;
pub mod index;
pub mod neighbors;
pub mod normalize;
pub mod probability;
pub mod site;
pub mod soil;

pub use batch::{classify_batch, classify_pending, BatchSummary};
pub use borehole::{Borehole, PlanarPoint, QueryPoint, StratumInterval, StratumRow};
pub use classifier::{Classification, Outcome, WeightedClassifier};
pub use config::{ClassifierConfig, NormalizeConfig, RowOrdering, SiteConfig, TieBreak, VerticalDatum};
pub use error::{Result, StrataError};
pub use index::{BoreholeColumn, NodeIdGenerator, StratigraphicIndex, StratigraphicNode};
pub use neighbors::{DelaunayNeighbors, NearestNeighbors, NeighborResolver};
pub use normalize::{normalize_strata, NormalizedStrata};
pub use probability::{IntervalOverlap, LocalProbabilityEstimator};
pub use site::Site;
pub use soil::{SoilCatalog, SoilCode, SoilId};
