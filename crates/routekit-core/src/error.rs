//! Error types for geometry and clipping operations.

use thiserror::Error;

/// Errors that can occur while resolving 2D geometry.
#[derive(Error, Debug, Clone)]
pub enum GeometryError {
    /// The polygon offset primitive failed on a contour.
    #[error("Polygon offset failed: {0}")]
    OffsetFailed(String),

    /// A contour is degenerate (too few distinct points).
    #[error("Degenerate contour with {points} point(s)")]
    DegenerateContour {
        /// Number of distinct points in the contour.
        points: usize,
    },

    /// Generic geometry error.
    #[error("Geometry error: {0}")]
    Other(String),
}

/// Result type alias for geometry operations.
pub type GeometryResult<T> = Result<T, GeometryError>;
