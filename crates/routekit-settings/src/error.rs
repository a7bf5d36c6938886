//! Error types for settings resolution.

use thiserror::Error;

/// Errors that can occur while resolving settings for a job.
#[derive(Error, Debug, Clone)]
pub enum SettingsError {
    /// A geometry node references a tool index the machine does not have.
    #[error("Tool index {index} out of range ({count} tool(s) configured)")]
    ToolIndexOutOfRange {
        /// The requested tool index.
        index: usize,
        /// Number of tools configured on the machine.
        count: usize,
    },

    /// A geometry node references an operation index the tool does not have.
    #[error("Operation index {index} out of range for tool {tool} ({count} operation(s))")]
    OperationIndexOutOfRange {
        /// Index of the tool the operation was looked up on.
        tool: usize,
        /// The requested operation index.
        index: usize,
        /// Number of operations configured on the tool.
        count: usize,
    },
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;
