use serde::{Deserialize, Serialize};

use crate::soil::{SoilCode, SoilId};

/// Planar position in site coordinates (metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

impl PlanarPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance(self, other: PlanarPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    #[inline]
    pub fn distance_sq(self, other: PlanarPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// A logged borehole: ID, collar position and collar elevation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borehole {
    pub id: String,
    pub x: f64,
    pub y: f64,
    /// Collar (reference) elevation.
    pub z: f64,
}

impl Borehole {
    pub fn new(id: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self { id: id.into(), x, y, z }
    }

    pub fn position(&self) -> PlanarPoint {
        PlanarPoint::new(self.x, self.y)
    }
}

/// One raw stratum row as delivered by the ingestion side: only the base depth
/// is recorded, the top is implied by the previous row of the same borehole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratumRow {
    pub borehole_id: String,
    pub depth_base: f64,
    #[serde(default)]
    pub legend_code: String,
    pub geology_code: String,
}

impl StratumRow {
    pub fn new(
        borehole_id: impl Into<String>,
        depth_base: f64,
        legend_code: impl Into<String>,
        geology_code: impl Into<String>,
    ) -> Self {
        Self {
            borehole_id: borehole_id.into(),
            depth_base,
            legend_code: legend_code.into(),
            geology_code: geology_code.into(),
        }
    }
}

/// A normalized, depth-contiguous stratum interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratumInterval {
    pub borehole_id: String,
    /// Depth below collar of the interval top; 0 for the first interval.
    pub depth_top: f64,
    pub depth_base: f64,
    pub legend_code: String,
    pub geology_code: String,
    pub soil_id: SoilId,
}

/// A location to classify. `result` stays `None` until the classifier writes
/// a soil code or `SoilCode::Unclassified` onto it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub result: Option<SoilCode>,
}

impl QueryPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, result: None }
    }

    pub fn position(&self) -> PlanarPoint {
        PlanarPoint::new(self.x, self.y)
    }

    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }
}
