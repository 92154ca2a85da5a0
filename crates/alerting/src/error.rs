//! Alerting Error Types

use thiserror::Error;

/// Invalid policy configuration, reported at construction time
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    /// Cutoffs must satisfy `0 < elevated < critical <= 1`
    #[error("Invalid cutoffs: elevated {elevated} must be below critical {critical} within (0, 1]")]
    InvalidCutoffs { elevated: f64, critical: f64 },

    /// Hysteresis margin must be non-negative and smaller than the lowest cutoff
    #[error("Invalid hysteresis margin {margin}: must be in [0, {elevated})")]
    InvalidMargin { margin: f64, elevated: f64 },

    /// Ordinal level outside the supported scale
    #[error("{field} level {level} is out of range [{min}, {max}]")]
    LevelOutOfRange {
        field: &'static str,
        level: u8,
        min: u8,
        max: u8,
    },

    /// Ceiling must be strictly more severe than the baseline
    #[error("Severity ceiling {ceiling} is not more severe than baseline {baseline}")]
    CeilingNotMoreSevere { ceiling: u8, baseline: u8 },
}

/// Snapshot construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The same entity key appeared twice in one snapshot
    #[error("Duplicate entity key in snapshot: {0}")]
    DuplicateKey(String),
}
