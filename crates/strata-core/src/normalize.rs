//! Stratum normalizer: raw base-depth rows → depth-contiguous intervals with
//! canonical soil codes.
//!
//! Each row only records the base depth of its stratum. The top is 0 for the
//! first row of a borehole and the previous row's base otherwise, which only
//! holds if the rows of a borehole are consecutive and sorted by depth. Under
//! `RowOrdering::Regroup` this is established here; under
//! `RowOrdering::Trusted` it is checked. Either way, base depths must strictly
//! increase within a borehole.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::borehole::{StratumInterval, StratumRow};
use crate::config::{NormalizeConfig, RowOrdering};
use crate::error::{Result, StrataError};
use crate::soil::SoilCatalog;

/// Normalizer output: intervals grouped by borehole, plus the code catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedStrata {
    pub intervals: Vec<StratumInterval>,
    pub catalog: SoilCatalog,
}

impl NormalizedStrata {
    /// Intervals of one borehole, in depth order.
    pub fn borehole<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a StratumInterval> + 'a {
        self.intervals.iter().filter(move |iv| iv.borehole_id == id)
    }
}

/// Normalize raw stratum rows.
pub fn normalize_strata(rows: &[StratumRow], config: &NormalizeConfig) -> Result<NormalizedStrata> {
    let groups = match config.ordering {
        RowOrdering::Regroup => regroup(rows),
        RowOrdering::Trusted => split_runs(rows)?,
    };

    let mut catalog = SoilCatalog::new();
    let mut intervals = Vec::with_capacity(rows.len());

    for (borehole_id, group) in &groups {
        let mut depth_top = 0.0;
        for row in group {
            check_depth(borehole_id, depth_top, row.depth_base)?;
            let soil_id = catalog.assign(&row.geology_code)?;
            intervals.push(StratumInterval {
                borehole_id: borehole_id.to_string(),
                depth_top,
                depth_base: row.depth_base,
                legend_code: row.legend_code.clone(),
                geology_code: row.geology_code.clone(),
                soil_id,
            });
            depth_top = row.depth_base;
        }
    }

    tracing::info!(
        boreholes = groups.len(),
        intervals = intervals.len(),
        soil_codes = catalog.len(),
        "normalized strata"
    );

    Ok(NormalizedStrata { intervals, catalog })
}

fn check_depth(borehole_id: &str, depth_top: f64, depth_base: f64) -> Result<()> {
    if !depth_base.is_finite() || depth_base < 0.0 {
        return Err(StrataError::integrity(
            borehole_id,
            format!("base depth {depth_base} is not a finite non-negative value"),
        ));
    }
    if depth_base <= depth_top {
        return Err(StrataError::integrity(
            borehole_id,
            format!("base depth {depth_base} does not exceed stratum top {depth_top}"),
        ));
    }
    Ok(())
}

/// Group rows by borehole in order of first appearance, each group stably
/// sorted by base depth.
fn regroup(rows: &[StratumRow]) -> Vec<(&str, Vec<&StratumRow>)> {
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&StratumRow>)> = Vec::new();
    for row in rows {
        let i = *slot.entry(row.borehole_id.as_str()).or_insert_with(|| {
            groups.push((row.borehole_id.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[i].1.push(row);
    }
    for (_, group) in &mut groups {
        group.sort_by(|a, b| a.depth_base.total_cmp(&b.depth_base));
    }
    groups
}

/// Split rows into consecutive runs of one borehole, rejecting a borehole
/// whose rows are not contiguous.
fn split_runs(rows: &[StratumRow]) -> Result<Vec<(&str, Vec<&StratumRow>)>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut groups: Vec<(&str, Vec<&StratumRow>)> = Vec::new();
    for row in rows {
        let id = row.borehole_id.as_str();
        if let Some((_, group)) = groups.last_mut().filter(|(current, _)| *current == id) {
            group.push(row);
            continue;
        }
        if !seen.insert(id) {
            return Err(StrataError::integrity(
                id,
                "rows are not contiguous: borehole reappears after another borehole",
            ));
        }
        groups.push((id, vec![row]));
    }
    Ok(groups)
}
