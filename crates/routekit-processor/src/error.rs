//! Error types for the processing pipeline.

use routekit_core::GeometryError;
use routekit_settings::SettingsError;
use thiserror::Error;

/// Errors that can abort a processing pass.
///
/// A failed pass is caught and logged by the dispatcher; it never
/// terminates the background worker.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Settings could not be resolved for an assigned geometry node.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// A geometry operation failed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Generic processing error.
    #[error("Processing error: {0}")]
    Other(String),
}
