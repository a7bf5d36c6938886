//! The machine: top of the settings hierarchy.

use crate::error::{SettingsError, SettingsResult};
use crate::operation::Operation;
use crate::processor_settings::ProcessorSettings;
use crate::tool::Tool;
use routekit_core::{AppEvent, EventBus, MachineEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A machine configuration: machine-level motion settings plus the tools
/// configured on it. Mutations publish change events on the attached bus;
/// attaching the bus wires every tool and operation already present, and
/// tools/operations added later are wired on insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    name: String,
    attack_angle: f64,
    travel_height: f64,
    travel_speed: f64,
    lift_speed: f64,
    tools: Vec<Tool>,
    #[serde(skip)]
    bus: Option<Arc<EventBus>>,
}

impl Machine {
    /// Creates a machine with router defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attack_angle: 15.0,
            travel_height: 5.0,
            travel_speed: 1200.0,
            lift_speed: 300.0,
            tools: Vec::new(),
            bus: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attack_angle(&self) -> f64 {
        self.attack_angle
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn tool(&self, index: usize) -> Option<&Tool> {
        self.tools.get(index)
    }

    pub fn tool_mut(&mut self, index: usize) -> Option<&mut Tool> {
        self.tools.get_mut(index)
    }

    /// Looks up a (tool, operation) pair, with range checking suitable for
    /// resolving geometry assignments.
    pub fn resolve(&self, tool: usize, operation: usize) -> SettingsResult<(&Tool, &Operation)> {
        let t = self
            .tools
            .get(tool)
            .ok_or(SettingsError::ToolIndexOutOfRange {
                index: tool,
                count: self.tools.len(),
            })?;
        let o = t
            .operation(operation)
            .ok_or(SettingsError::OperationIndexOutOfRange {
                tool,
                index: operation,
                count: t.operations().len(),
            })?;
        Ok((t, o))
    }

    pub fn set_attack_angle(&mut self, value: f64) {
        self.attack_angle = value;
        self.notify("attack_angle");
    }

    pub fn set_travel_height(&mut self, value: f64) {
        self.travel_height = value;
        self.notify("travel_height");
    }

    pub fn set_travel_speed(&mut self, value: f64) {
        self.travel_speed = value;
        self.notify("travel_speed");
    }

    pub fn set_lift_speed(&mut self, value: f64) {
        self.lift_speed = value;
        self.notify("lift_speed");
    }

    /// Adds a tool, wiring it to the attached bus. Returns its index.
    pub fn add_tool(&mut self, mut tool: Tool) -> usize {
        if let Some(bus) = &self.bus {
            tool.attach_bus(bus.clone());
        }
        tracing::debug!("Tool '{}' added to machine '{}'", tool.name(), self.name);
        self.tools.push(tool);
        let index = self.tools.len() - 1;
        self.publish(MachineEvent::ToolInserted { index });
        index
    }

    /// Removes a tool, unwiring it from the bus.
    pub fn remove_tool(&mut self, index: usize) -> Option<Tool> {
        if index >= self.tools.len() {
            return None;
        }
        let mut tool = self.tools.remove(index);
        tool.detach_bus();
        tracing::debug!("Tool '{}' removed from machine '{}'", tool.name(), self.name);
        self.publish(MachineEvent::ToolRemoved { index });
        Some(tool)
    }

    /// Adds an operation under a tool. Returns the operation index.
    pub fn add_operation(&mut self, tool: usize, operation: Operation) -> Option<usize> {
        let index = self.tools.get_mut(tool)?.push_operation(operation);
        self.publish(MachineEvent::OperationInserted { tool, index });
        Some(index)
    }

    /// Removes an operation from a tool.
    pub fn remove_operation(&mut self, tool: usize, index: usize) -> Option<Operation> {
        let operation = self.tools.get_mut(tool)?.take_operation(index)?;
        self.publish(MachineEvent::OperationRemoved { tool, index });
        Some(operation)
    }

    /// Applies the machine's contribution to the settings cascade.
    pub fn fill_processor_settings(&self, settings: &mut ProcessorSettings) {
        settings.attack_angle = self.attack_angle;
        settings.travel_height = self.travel_height;
        settings.travel_speed = self.travel_speed;
        settings.lift_speed = self.lift_speed;
    }

    /// Attaches the change-notification bus, wiring all descendants.
    pub fn attach_bus(&mut self, bus: Arc<EventBus>) {
        for tool in &mut self.tools {
            tool.attach_bus(bus.clone());
        }
        self.bus = Some(bus);
    }

    /// Detaches the bus from the machine and all descendants.
    pub fn detach_bus(&mut self) {
        for tool in &mut self.tools {
            tool.detach_bus();
        }
        self.bus = None;
    }

    fn publish(&self, event: MachineEvent) {
        if let Some(bus) = &self.bus {
            bus.publish(AppEvent::Machine(event));
        }
    }

    fn notify(&self, setting: &str) {
        self.publish(MachineEvent::SettingChanged {
            setting: setting.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationKind;
    use routekit_core::EventFilter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn router() -> Machine {
        let mut machine = Machine::new("Router");
        let tool = Tool::new("6mm endmill");
        machine.add_tool(tool);
        machine.add_operation(0, Operation::new(OperationKind::CutInside));
        machine
    }

    #[test]
    fn test_cascade_order() {
        let machine = router();
        let (tool, operation) = machine.resolve(0, 0).unwrap();

        let mut settings = ProcessorSettings::default();
        machine.fill_processor_settings(&mut settings);
        tool.fill_processor_settings(&mut settings);
        operation.fill_processor_settings(&mut settings);

        assert!((settings.attack_angle - 15.0).abs() < 1e-12);
        assert!((settings.tool_diameter - 6.0).abs() < 1e-12);
        // The operation stage reads the tool diameter written before it.
        assert!((settings.cut_offset + 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_resolve_range_errors() {
        let machine = router();
        assert!(matches!(
            machine.resolve(3, 0),
            Err(SettingsError::ToolIndexOutOfRange { index: 3, count: 1 })
        ));
        assert!(matches!(
            machine.resolve(0, 5),
            Err(SettingsError::OperationIndexOutOfRange { index: 5, .. })
        ));
    }

    #[test]
    fn test_mutations_publish_events() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.subscribe(EventFilter::All, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let mut machine = router();
        machine.attach_bus(bus.clone());

        machine.set_attack_angle(20.0);
        machine.tool_mut(0).unwrap().set_diameter(3.175);
        machine
            .tool_mut(0)
            .unwrap()
            .operation_mut(0)
            .unwrap()
            .set_cut_depth_total(12.0);
        machine.add_tool(Tool::new("1mm endmill"));

        assert_eq!(count.load(Ordering::SeqCst), 4);

        // Detached containers stop publishing.
        let removed = machine.remove_tool(1).unwrap();
        let after_remove = count.load(Ordering::SeqCst);
        let mut removed = removed;
        removed.set_diameter(2.0);
        assert_eq!(count.load(Ordering::SeqCst), after_remove);
    }
}
