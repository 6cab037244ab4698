//! The read-only site model shared by every query of a run.

use std::collections::HashSet;

use crate::borehole::{Borehole, StratumInterval, StratumRow};
use crate::config::NormalizeConfig;
use crate::error::{Result, StrataError};
use crate::index::{NodeIdGenerator, StratigraphicIndex};
use crate::normalize::{normalize_strata, NormalizedStrata};
use crate::soil::{SoilCatalog, SoilCode};

/// Borehole table, normalized strata and stratigraphic index of one site.
#[derive(Debug, Clone)]
pub struct Site {
    boreholes: Vec<Borehole>,
    strata: NormalizedStrata,
    index: StratigraphicIndex,
}

impl Site {
    /// Normalize `rows` and index them against `boreholes`, numbering nodes from 0.
    pub fn build(boreholes: Vec<Borehole>, rows: &[StratumRow], config: &NormalizeConfig) -> Result<Self> {
        Self::build_with_ids(boreholes, rows, config, &mut NodeIdGenerator::new())
    }

    /// As `build`, drawing node IDs from `ids`.
    pub fn build_with_ids(
        boreholes: Vec<Borehole>,
        rows: &[StratumRow],
        config: &NormalizeConfig,
        ids: &mut NodeIdGenerator,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for b in &boreholes {
            if !seen.insert(b.id.as_str()) {
                return Err(StrataError::DuplicateBorehole(b.id.clone()));
            }
        }

        let strata = normalize_strata(rows, config)?;
        let index = StratigraphicIndex::build(&strata.intervals, &boreholes, ids);

        let unlogged = boreholes.iter().filter(|b| index.column(&b.id).is_none()).count();
        if unlogged > 0 {
            tracing::warn!(unlogged, "boreholes without strata only contribute unclassified ground");
        }

        Ok(Self { boreholes, strata, index })
    }

    pub fn boreholes(&self) -> &[Borehole] {
        &self.boreholes
    }

    pub fn intervals(&self) -> &[StratumInterval] {
        &self.strata.intervals
    }

    pub fn catalog(&self) -> &SoilCatalog {
        &self.strata.catalog
    }

    pub fn index(&self) -> &StratigraphicIndex {
        &self.index
    }

    /// Geology description for a code, or the sentinel text.
    pub fn describe(&self, code: SoilCode) -> &str {
        self.strata.catalog.label(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soil::SoilId;

    #[test]
    fn duplicate_borehole_ids_are_rejected() {
        let boreholes = vec![Borehole::new("ZK1", 0.0, 0.0, 0.0), Borehole::new("ZK1", 5.0, 0.0, 0.0)];
        let err = Site::build(boreholes, &[], &NormalizeConfig::default()).unwrap_err();
        assert!(matches!(err, StrataError::DuplicateBorehole(id) if id == "ZK1"));
    }

    #[test]
    fn describe_maps_codes_back_to_descriptions() {
        let boreholes = vec![Borehole::new("ZK1", 0.0, 0.0, 0.0)];
        let rows = vec![StratumRow::new("ZK1", 2.0, "3-1", "silty clay")];
        let site = Site::build(boreholes, &rows, &NormalizeConfig::default()).unwrap();
        let a = SoilCode::Soil(SoilId::from_index(0).unwrap());
        assert_eq!(site.describe(a), "silty clay");
        assert_eq!(site.describe(SoilCode::Unclassified), "null");
        assert_eq!(site.intervals().len(), 1);
        assert_eq!(site.index().len(), 1);
    }

    #[test]
    fn integrity_errors_abort_the_build() {
        let boreholes = vec![Borehole::new("ZK1", 0.0, 0.0, 0.0)];
        let rows = vec![StratumRow::new("ZK1", 2.0, "", "clay"), StratumRow::new("ZK1", 2.0, "", "sand")];
        assert!(Site::build(boreholes, &rows, &NormalizeConfig::default()).is_err());
    }
}
