//! One machining job: resolved settings plus collected geometry.

use routekit_core::Path;
use routekit_settings::{Machine, Operation, ProcessorSettings, Tool};

/// The unit of work for one (tool, operation) pair. Jobs are transient:
/// they are rebuilt from scratch on every processing pass and never
/// mutated incrementally across passes.
#[derive(Debug, Clone)]
pub struct Job {
    tool_index: usize,
    operation_index: usize,
    settings: ProcessorSettings,
    closed_paths: Vec<Path>,
    open_paths: Vec<Path>,
}

impl Job {
    /// Creates a job, resolving its settings through the fixed-order
    /// cascade machine -> tool -> operation.
    pub fn new(
        machine: &Machine,
        tool: &Tool,
        operation: &Operation,
        tool_index: usize,
        operation_index: usize,
    ) -> Self {
        let mut settings = ProcessorSettings::default();
        machine.fill_processor_settings(&mut settings);
        tool.fill_processor_settings(&mut settings);
        operation.fill_processor_settings(&mut settings);
        Self {
            tool_index,
            operation_index,
            settings,
            closed_paths: Vec::new(),
            open_paths: Vec::new(),
        }
    }

    pub fn tool_index(&self) -> usize {
        self.tool_index
    }

    pub fn operation_index(&self) -> usize {
        self.operation_index
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    pub fn closed_paths(&self) -> &[Path] {
        &self.closed_paths
    }

    pub fn open_paths(&self) -> &[Path] {
        &self.open_paths
    }

    /// Appends a contour to the appropriate collection.
    pub fn add_path(&mut self, path: Path) {
        if path.is_closed() {
            self.closed_paths.push(path);
        } else {
            self.open_paths.push(path);
        }
    }

    /// Whether the job carries any geometry at all.
    pub fn is_empty(&self) -> bool {
        self.closed_paths.is_empty() && self.open_paths.is_empty()
    }
}
