//! Batch classification over many query points.
//!
//! Points are independent: each one only reads the shared site and writes its
//! own `result`. With the `threading` feature the batch is a rayon parallel
//! map; results and summaries are identical either way. An interrupted batch
//! can be resumed with `classify_pending`, which skips points that already
//! carry a result.

use std::collections::BTreeMap;

#[cfg(feature = "threading")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::borehole::QueryPoint;
use crate::classifier::{Outcome, WeightedClassifier};
use crate::neighbors::NeighborResolver;
use crate::probability::LocalProbabilityEstimator;
use crate::site::Site;
use crate::soil::SoilCode;

/// Counts over one batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Points in the batch, including skipped ones.
    pub points: usize,
    /// Points classified by this run.
    pub processed: usize,
    /// Points that already had a result and were left alone.
    pub skipped: usize,
    pub most_likely: usize,
    pub runner_up: usize,
    pub unresolvable: usize,
    pub coincident: usize,
    /// Reported codes of processed points.
    pub per_code: BTreeMap<SoilCode, usize>,
}

impl BatchSummary {
    fn record(&mut self, result: SoilCode, outcome: Outcome, coincident: bool) {
        self.processed += 1;
        match outcome {
            Outcome::MostLikely => self.most_likely += 1,
            Outcome::RunnerUp => self.runner_up += 1,
            Outcome::Unresolvable => self.unresolvable += 1,
        }
        if coincident {
            self.coincident += 1;
        }
        *self.per_code.entry(result).or_insert(0) += 1;
    }
}

/// Classify every point in place; output order is input order.
pub fn classify_batch<R, E>(
    classifier: &WeightedClassifier<R, E>,
    site: &Site,
    points: &mut [QueryPoint],
) -> BatchSummary
where
    R: NeighborResolver,
    E: LocalProbabilityEstimator,
{
    run(classifier, site, points, false)
}

/// Classify only the points whose result is still absent.
pub fn classify_pending<R, E>(
    classifier: &WeightedClassifier<R, E>,
    site: &Site,
    points: &mut [QueryPoint],
) -> BatchSummary
where
    R: NeighborResolver,
    E: LocalProbabilityEstimator,
{
    run(classifier, site, points, true)
}

fn run<R, E>(
    classifier: &WeightedClassifier<R, E>,
    site: &Site,
    points: &mut [QueryPoint],
    pending_only: bool,
) -> BatchSummary
where
    R: NeighborResolver,
    E: LocalProbabilityEstimator,
{
    let classify = |p: &mut QueryPoint| {
        if pending_only && !p.is_pending() {
            return None;
        }
        let c = classifier.classify_point(site, p);
        Some((c.result, c.outcome, c.coincident))
    };

    #[cfg(feature = "threading")]
    let outcomes: Vec<_> = points.par_iter_mut().map(classify).collect();
    #[cfg(not(feature = "threading"))]
    let outcomes: Vec<_> = points.iter_mut().map(classify).collect();

    let mut summary = BatchSummary { points: points.len(), ..BatchSummary::default() };
    for outcome in outcomes {
        match outcome {
            Some((result, outcome, coincident)) => summary.record(result, outcome, coincident),
            None => summary.skipped += 1,
        }
    }

    tracing::info!(
        points = summary.points,
        processed = summary.processed,
        skipped = summary.skipped,
        runner_up = summary.runner_up,
        unresolvable = summary.unresolvable,
        "batch classified"
    );
    summary
}
