//! Error types for ray casting.

use thiserror::Error;

/// Errors raised while building regions or aggregating ray statistics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RaycastError {
    /// The influence area names a region kind that does not exist.
    #[error("invalid influence area type: {0:?}")]
    InvalidRegionType(String),

    /// The region kind is known but its data is missing or degenerate.
    #[error("invalid influence region: {0}")]
    InvalidRegion(String),

    /// Cast settings outside their allowed range.
    #[error("invalid cast settings: {0}")]
    InvalidSettings(String),

    /// No ray of the batch intersected the tree, so per-ray figures are undefined.
    #[error("no data: none of the {rays_cast} rays hit the tree")]
    UndefinedAggregate {
        /// Rays traced in the batch.
        rays_cast: usize,
    },
}

/// Result type for ray casting operations.
pub type Result<T> = std::result::Result<T, RaycastError>;
