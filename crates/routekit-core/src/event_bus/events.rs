//! Event types published on the application bus.

use serde::{Deserialize, Serialize};

/// Coarse event category used for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventCategory {
    /// Machine, tool and operation settings changes.
    Machine,
    /// Document tree changes (geometry, structure, assignments).
    Document,
}

/// Changes to the machine settings hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MachineEvent {
    /// A machine-level setting changed.
    SettingChanged {
        /// Name of the setting that changed.
        setting: String,
    },
    /// A tool was inserted at the given index.
    ToolInserted { index: usize },
    /// A tool was removed from the given index.
    ToolRemoved { index: usize },
    /// An operation was inserted under a tool.
    OperationInserted { tool: usize, index: usize },
    /// An operation was removed from a tool.
    OperationRemoved { tool: usize, index: usize },
}

/// Changes to the assigned-geometry document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocumentEvent {
    /// A node was inserted.
    NodeInserted,
    /// A node was removed.
    NodeRemoved,
    /// A node's (tool, operation) assignment changed.
    AssignmentChanged,
    /// A node's geometry changed.
    GeometryChanged,
}

/// Any application event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppEvent {
    Machine(MachineEvent),
    Document(DocumentEvent),
}

impl AppEvent {
    /// Category of this event.
    pub fn category(&self) -> EventCategory {
        match self {
            AppEvent::Machine(_) => EventCategory::Machine,
            AppEvent::Document(_) => EventCategory::Document,
        }
    }
}
