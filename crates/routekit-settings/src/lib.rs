//! # RouteKit Settings
//!
//! The machine settings hierarchy and its resolution into the flattened
//! numeric parameters the processor consumes. Resolution is a fixed-order
//! cascade (machine, then tool, then operation) over one settings value;
//! later stages may read fields earlier stages wrote, which is how an
//! operation derives its cut offset from the tool diameter.

pub mod error;
pub mod machine;
pub mod operation;
pub mod processor_settings;
pub mod tool;

pub use error::{SettingsError, SettingsResult};
pub use machine::Machine;
pub use operation::{Operation, OperationKind};
pub use processor_settings::ProcessorSettings;
pub use tool::Tool;
