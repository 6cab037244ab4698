//! Error taxonomy for building a site model.
//!
//! Only dataset problems are errors. Degenerate geometry and unresolvable
//! query points are per-point outcomes (see `classifier::Outcome`) and never
//! abort a batch.

use thiserror::Error;

/// Errors raised while normalizing strata, building the index or loading config.
#[derive(Error, Debug)]
pub enum StrataError {
    /// Depth values of a borehole are inconsistent (non-monotonic, overlapping,
    /// negative, non-finite) or its rows are not contiguous in the input.
    #[error("data integrity violation in borehole {borehole}: {reason}")]
    DataIntegrity { borehole: String, reason: String },

    /// More than 52 distinct geology descriptions.
    #[error("soil code space exhausted: no code left for description {description:?} (limit 52)")]
    SoilCodeSpaceExhausted { description: String },

    /// The borehole table lists the same ID twice.
    #[error("duplicate borehole id {0}")]
    DuplicateBorehole(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StrataError {
    pub(crate) fn integrity(borehole: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataIntegrity { borehole: borehole.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, StrataError>;
