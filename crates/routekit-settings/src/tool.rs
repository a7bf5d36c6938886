//! Cutting tools and their contribution to the settings cascade.

use crate::operation::Operation;
use crate::processor_settings::ProcessorSettings;
use routekit_core::{AppEvent, EventBus, MachineEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One cutting tool configured on the machine, with the operations that
/// can be assigned to geometry under it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    name: String,
    diameter: f64,
    cut_depth_pass: f64,
    cut_feedrate: f64,
    plunge_feedrate: f64,
    operations: Vec<Operation>,
    #[serde(skip)]
    bus: Option<Arc<EventBus>>,
}

impl Tool {
    /// Creates a tool with router defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diameter: 6.0,
            cut_depth_pass: 1.0,
            cut_feedrate: 1200.0,
            plunge_feedrate: 180.0,
            operations: Vec::new(),
            bus: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    pub fn cut_depth_pass(&self) -> f64 {
        self.cut_depth_pass
    }

    pub fn cut_feedrate(&self) -> f64 {
        self.cut_feedrate
    }

    pub fn plunge_feedrate(&self) -> f64 {
        self.plunge_feedrate
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn operation(&self, index: usize) -> Option<&Operation> {
        self.operations.get(index)
    }

    pub fn operation_mut(&mut self, index: usize) -> Option<&mut Operation> {
        self.operations.get_mut(index)
    }

    pub fn set_diameter(&mut self, value: f64) {
        self.diameter = value;
        self.notify("tool_diameter");
    }

    pub fn set_cut_depth_pass(&mut self, value: f64) {
        self.cut_depth_pass = value;
        self.notify("cut_depth_pass");
    }

    pub fn set_cut_feedrate(&mut self, value: f64) {
        self.cut_feedrate = value;
        self.notify("cut_feedrate");
    }

    pub fn set_plunge_feedrate(&mut self, value: f64) {
        self.plunge_feedrate = value;
        self.notify("plunge_feedrate");
    }

    /// Applies this tool's contribution to the settings cascade.
    pub fn fill_processor_settings(&self, settings: &mut ProcessorSettings) {
        settings.tool_diameter = self.diameter;
        settings.cut_depth_pass = self.cut_depth_pass;
        settings.cut_feedrate = self.cut_feedrate;
        settings.plunge_feedrate = self.plunge_feedrate;
    }

    pub(crate) fn push_operation(&mut self, mut operation: Operation) -> usize {
        if let Some(bus) = &self.bus {
            operation.attach_bus(bus.clone());
        }
        self.operations.push(operation);
        self.operations.len() - 1
    }

    pub(crate) fn take_operation(&mut self, index: usize) -> Option<Operation> {
        if index >= self.operations.len() {
            return None;
        }
        let mut operation = self.operations.remove(index);
        operation.detach_bus();
        Some(operation)
    }

    pub(crate) fn attach_bus(&mut self, bus: Arc<EventBus>) {
        for operation in &mut self.operations {
            operation.attach_bus(bus.clone());
        }
        self.bus = Some(bus);
    }

    pub(crate) fn detach_bus(&mut self) {
        for operation in &mut self.operations {
            operation.detach_bus();
        }
        self.bus = None;
    }

    fn notify(&self, setting: &str) {
        if let Some(bus) = &self.bus {
            bus.publish(AppEvent::Machine(MachineEvent::SettingChanged {
                setting: setting.to_string(),
            }));
        }
    }
}
