//! Run configuration.
//!
//! All fields have defaults, so a JSON file only needs the values it changes:
//!
//! ```
//! use strata_core::config::{SiteConfig, VerticalDatum};
//!
//! let cfg = SiteConfig::from_json_str(r#"{"classifier":{"window_half_width":1.0}}"#).unwrap();
//! assert_eq!(cfg.classifier.window_half_width, 1.0);
//! assert_eq!(cfg.classifier.vertical_datum, VerticalDatum::NegatedElevation);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};

/// How raw stratum rows are ordered before depth tops are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrdering {
    /// Group rows by borehole (first-appearance order) and sort each group by
    /// base depth.
    #[default]
    Regroup,
    /// Take rows as given; a borehole whose rows are split by another
    /// borehole's rows is a data integrity error.
    Trusted,
}

/// Frame in which a query's z is compared with interface depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalDatum {
    /// depth = -z. Query z is elevation relative to the collar datum, negative downward.
    #[default]
    NegatedElevation,
    /// depth = collar_z - z, per neighbouring borehole. Query z is absolute elevation.
    CollarRelative,
    /// depth = z. Query z is already a depth below collar.
    DepthBelowCollar,
}

impl VerticalDatum {
    /// Depth below the collar of a borehole with collar elevation `collar_z`.
    #[inline]
    pub fn depth_of(self, z: f64, collar_z: f64) -> f64 {
        match self {
            Self::NegatedElevation => -z,
            Self::CollarRelative => collar_z - z,
            Self::DepthBelowCollar => z,
        }
    }
}

/// Rule for choosing between soil codes with equal accumulated weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Earliest contribution in neighbour enumeration order wins.
    #[default]
    FirstContribution,
    /// Lowest code wins ('A' < ... < 'Z' < 'a' < ... < 'z' < null).
    SoilOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeConfig {
    #[serde(default)]
    pub ordering: RowOrdering,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self { ordering: RowOrdering::Regroup }
    }
}

/// Parameters of the weighted classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Half-width θ of the vertical window [depth − θ, depth + θ], metres.
    /// Default: 0.5
    #[serde(default = "default_window_half_width")]
    pub window_half_width: f64,

    #[serde(default)]
    pub vertical_datum: VerticalDatum,

    #[serde(default)]
    pub tie_break: TieBreak,

    /// Planar distance at or below which a neighbour counts as coincident
    /// with the query point. Default: 1e-9
    #[serde(default = "default_coincidence_tolerance")]
    pub coincidence_tolerance: f64,

    /// Neighbour count used when natural neighbours cannot be resolved
    /// (fewer than three boreholes, collinear layout). Default: 3
    #[serde(default = "default_fallback_neighbors")]
    pub fallback_neighbors: usize,
}

fn default_window_half_width() -> f64 {
    0.5
}

fn default_coincidence_tolerance() -> f64 {
    1e-9
}

fn default_fallback_neighbors() -> usize {
    3
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_half_width: default_window_half_width(),
            vertical_datum: VerticalDatum::default(),
            tie_break: TieBreak::default(),
            coincidence_tolerance: default_coincidence_tolerance(),
            fallback_neighbors: default_fallback_neighbors(),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.window_half_width.is_finite() || self.window_half_width < 0.0 {
            return Err(StrataError::InvalidConfig(format!(
                "window_half_width must be finite and >= 0, got {}",
                self.window_half_width
            )));
        }
        if !self.coincidence_tolerance.is_finite() || self.coincidence_tolerance < 0.0 {
            return Err(StrataError::InvalidConfig(format!(
                "coincidence_tolerance must be finite and >= 0, got {}",
                self.coincidence_tolerance
            )));
        }
        if self.fallback_neighbors == 0 {
            return Err(StrataError::InvalidConfig("fallback_neighbors must be at least 1".into()));
        }
        Ok(())
    }
}

/// Everything needed for one classification run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl SiteConfig {
    /// Rows taken in delivered order, as the database export produces them.
    pub fn trusted_rows() -> Self {
        Self {
            normalize: NormalizeConfig { ordering: RowOrdering::Trusted },
            ..Self::default()
        }
    }

    /// Ties resolved by code order instead of neighbour order, so results do
    /// not depend on how the resolver enumerates neighbours.
    pub fn reproducible() -> Self {
        Self {
            classifier: ClassifierConfig { tie_break: TieBreak::SoilOrder, ..ClassifierConfig::default() },
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.classifier.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_field_defaults() {
        let cfg = SiteConfig::default();
        assert_eq!(cfg.classifier.window_half_width, 0.5);
        assert_eq!(cfg.classifier.fallback_neighbors, 3);
        assert_eq!(cfg.classifier.tie_break, TieBreak::FirstContribution);
        assert_eq!(cfg.normalize.ordering, RowOrdering::Regroup);
        assert_eq!(SiteConfig::from_json_str("{}").unwrap(), cfg);
    }

    #[test]
    fn presets_change_only_their_field() {
        let trusted = SiteConfig::trusted_rows();
        assert_eq!(trusted.normalize.ordering, RowOrdering::Trusted);
        assert_eq!(trusted.classifier, ClassifierConfig::default());

        let repro = SiteConfig::reproducible();
        assert_eq!(repro.classifier.tie_break, TieBreak::SoilOrder);
        assert_eq!(repro.normalize, NormalizeConfig::default());
    }

    #[test]
    fn enums_use_snake_case_names() {
        let cfg = SiteConfig::from_json_str(
            r#"{"normalize":{"ordering":"trusted"},
                "classifier":{"vertical_datum":"collar_relative","tie_break":"soil_order"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.normalize.ordering, RowOrdering::Trusted);
        assert_eq!(cfg.classifier.vertical_datum, VerticalDatum::CollarRelative);
        assert_eq!(cfg.classifier.tie_break, TieBreak::SoilOrder);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(SiteConfig::from_json_str(r#"{"classifier":{"window_half_width":-1.0}}"#).is_err());
        assert!(SiteConfig::from_json_str(r#"{"classifier":{"fallback_neighbors":0}}"#).is_err());
        assert!(SiteConfig::from_json_str(r#"{"classifier":{"coincidence_tolerance":-0.1}}"#).is_err());
    }

    #[test]
    fn datum_conversions() {
        assert_eq!(VerticalDatum::NegatedElevation.depth_of(-2.0, 100.0), 2.0);
        assert_eq!(VerticalDatum::CollarRelative.depth_of(97.5, 100.0), 2.5);
        assert_eq!(VerticalDatum::DepthBelowCollar.depth_of(4.0, 100.0), 4.0);
    }
}
