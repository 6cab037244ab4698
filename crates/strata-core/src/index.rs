//! Stratigraphic index: per-borehole interface nodes and domain sequences.
//!
//! Walking the normalized intervals borehole by borehole, every interface
//! depth gets a node with a dataset-wide sequential ID: one node for the top
//! of the first interval, then one for the base of each interval. A borehole
//! with n intervals therefore owns n + 1 consecutive node IDs, and its domain
//! sequence holds the n soil codes filling the gaps between them.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::borehole::{Borehole, StratumInterval};
use crate::soil::SoilId;

/// Issues globally unique, monotonically increasing node IDs.
#[derive(Debug, Clone, Default)]
pub struct NodeIdGenerator {
    next: u64,
}

impl NodeIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start issuing at `first` (e.g. to continue a previous index).
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of IDs issued so far (when started at 0).
    pub fn peek(&self) -> u64 {
        self.next
    }
}

/// An interface between strata (or the top/bottom of a borehole log).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StratigraphicNode {
    pub id: u64,
    /// Depth below collar, positive downward.
    pub depth: f64,
}

/// Index entry of one borehole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoreholeColumn {
    pub borehole_id: String,
    /// Collar elevation, copied from the borehole table.
    pub collar_z: f64,
    /// n + 1 nodes ordered by depth.
    pub nodes: Vec<StratigraphicNode>,
    /// n soil codes; `domains[i]` fills `nodes[i]..nodes[i + 1]`.
    pub domains: Vec<SoilId>,
}

impl BoreholeColumn {
    pub fn top_depth(&self) -> f64 {
        self.nodes.first().map_or(0.0, |n| n.depth)
    }

    pub fn bottom_depth(&self) -> f64 {
        self.nodes.last().map_or(0.0, |n| n.depth)
    }

    /// Iterate `(top, base, soil)` triples.
    pub fn layers(&self) -> impl Iterator<Item = (f64, f64, SoilId)> + '_ {
        self.nodes
            .windows(2)
            .zip(&self.domains)
            .map(|(pair, &soil)| (pair[0].depth, pair[1].depth, soil))
    }

    /// Soil at `depth`; a depth on an interface belongs to the deeper layer,
    /// except the bottom node which closes the last layer.
    pub fn soil_at(&self, depth: f64) -> Option<SoilId> {
        let bottom = self.bottom_depth();
        self.layers()
            .find(|&(top, base, _)| depth >= top && (depth < base || (depth == base && base == bottom)))
            .map(|(_, _, soil)| soil)
    }
}

/// Node lists and domain sequences for every indexed borehole, in the order
/// boreholes appear among the intervals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StratigraphicIndex {
    columns: Vec<BoreholeColumn>,
    #[serde(skip)]
    by_id: HashMap<String, usize>,
}

impl StratigraphicIndex {
    /// Build the index from normalized intervals.
    ///
    /// Intervals of boreholes missing from `boreholes` are skipped. Node IDs
    /// are drawn from `ids`, so several indexes built from one generator never
    /// share an ID.
    pub fn build(
        intervals: &[StratumInterval],
        boreholes: &[Borehole],
        ids: &mut NodeIdGenerator,
    ) -> Self {
        let collars: HashMap<&str, f64> =
            boreholes.iter().map(|b| (b.id.as_str(), b.z)).collect();

        let mut columns: Vec<BoreholeColumn> = Vec::new();
        let mut skipped: HashSet<&str> = HashSet::new();

        for iv in intervals {
            let Some(&collar_z) = collars.get(iv.borehole_id.as_str()) else {
                skipped.insert(iv.borehole_id.as_str());
                continue;
            };

            let entering = columns.last().map_or(true, |c| c.borehole_id != iv.borehole_id);
            if entering {
                columns.push(BoreholeColumn {
                    borehole_id: iv.borehole_id.clone(),
                    collar_z,
                    nodes: vec![StratigraphicNode { id: ids.next_id(), depth: iv.depth_top }],
                    domains: Vec::new(),
                });
            }
            if let Some(column) = columns.last_mut() {
                column.nodes.push(StratigraphicNode { id: ids.next_id(), depth: iv.depth_base });
                column.domains.push(iv.soil_id);
            }
        }

        for id in &skipped {
            tracing::debug!(borehole = %id, "strata skipped: borehole not in borehole table");
        }
        tracing::info!(
            columns = columns.len(),
            skipped = skipped.len(),
            nodes = columns.iter().map(|c| c.nodes.len()).sum::<usize>(),
            "built stratigraphic index"
        );

        let mut index = Self { columns, by_id: HashMap::new() };
        index.reindex();
        index
    }

    /// Rebuild the ID lookup (after deserialization).
    pub fn reindex(&mut self) {
        self.by_id = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.borehole_id.clone(), i))
            .collect();
    }

    pub fn column(&self, borehole_id: &str) -> Option<&BoreholeColumn> {
        self.by_id.get(borehole_id).map(|&i| &self.columns[i])
    }

    pub fn columns(&self) -> &[BoreholeColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Node-ID lists keyed by borehole.
    pub fn node_ids(&self) -> HashMap<&str, Vec<u64>> {
        self.columns
            .iter()
            .map(|c| (c.borehole_id.as_str(), c.nodes.iter().map(|n| n.id).collect()))
            .collect()
    }

    /// Domain sequences keyed by borehole.
    pub fn domain_sequences(&self) -> HashMap<&str, &[SoilId]> {
        self.columns
            .iter()
            .map(|c| (c.borehole_id.as_str(), c.domains.as_slice()))
            .collect()
    }
}
