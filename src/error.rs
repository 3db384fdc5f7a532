//! Error types for spatial_map.

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Contract violations surfaced synchronously to the caller.
///
/// Everything else in the crate is total: looking up an absent key returns
/// `None` and removing an absent key is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Error {
    /// Cell size passed at construction was not usable
    #[error("invalid cell size {0}: must be positive and finite")]
    InvalidCellSize(f32),

    /// Radius passed to a query was not usable
    #[error("invalid query radius {0}: must be non-negative and not NaN")]
    InvalidRadius(f32),
}
