//! Machining operations and their contribution to the settings cascade.

use crate::processor_settings::ProcessorSettings;
use routekit_core::{AppEvent, EventBus, MachineEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The kind of cut an operation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    /// Cut outside the contour (keeps the drawn shape).
    CutOutside,
    /// Cut inside the contour (keeps the surrounding material).
    CutInside,
    /// Cut on the contour centerline.
    CutCenter,
    /// Cut inside the contour and clear the interior.
    CutPocket,
    /// Cut outside the contour and clear the surrounding holes.
    CutOutsideWithPocket,
}

/// One machining operation configured under a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    name: String,
    kind: OperationKind,
    cut_depth_total: f64,
    tab_height: f64,
    pocket_overlap: f64,
    #[serde(skip)]
    bus: Option<Arc<EventBus>>,
}

impl Operation {
    /// Creates an operation of the given kind with its default settings.
    pub fn new(kind: OperationKind) -> Self {
        let (name, tab_height, pocket_overlap) = match kind {
            OperationKind::CutOutside => ("Outside", 2.5, 0.0),
            OperationKind::CutInside => ("Inside", 2.5, 0.0),
            OperationKind::CutCenter => ("Center", 2.5, 0.0),
            OperationKind::CutPocket => ("Pocket", 0.0, 50.0),
            OperationKind::CutOutsideWithPocket => ("Outside+Pocket", 0.0, 50.0),
        };
        Self {
            name: name.to_string(),
            kind,
            cut_depth_total: 6.0,
            tab_height,
            pocket_overlap,
            bus: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn cut_depth_total(&self) -> f64 {
        self.cut_depth_total
    }

    pub fn tab_height(&self) -> f64 {
        self.tab_height
    }

    pub fn pocket_overlap(&self) -> f64 {
        self.pocket_overlap
    }

    pub fn set_cut_depth_total(&mut self, value: f64) {
        self.cut_depth_total = value;
        self.notify("cut_depth_total");
    }

    pub fn set_tab_height(&mut self, value: f64) {
        self.tab_height = value;
        self.notify("tab_height");
    }

    pub fn set_pocket_overlap(&mut self, value: f64) {
        self.pocket_overlap = value;
        self.notify("pocket_overlap");
    }

    /// Applies this operation's contribution to the settings cascade. Runs
    /// after the tool stage, so the tool diameter is already resolved.
    pub fn fill_processor_settings(&self, settings: &mut ProcessorSettings) {
        settings.cut_depth_total = self.cut_depth_total;
        match self.kind {
            OperationKind::CutOutside => {
                settings.cut_offset = settings.tool_diameter / 2.0;
                settings.tab_height = self.tab_height;
            }
            OperationKind::CutInside => {
                settings.cut_offset = -settings.tool_diameter / 2.0;
                settings.tab_height = self.tab_height;
            }
            OperationKind::CutCenter => {
                settings.cut_offset = 0.0;
                settings.tab_height = self.tab_height;
            }
            OperationKind::CutPocket => {
                settings.cut_offset = -settings.tool_diameter / 2.0;
                settings.pocket_offset =
                    settings.tool_diameter * (100.0 - self.pocket_overlap) / 100.0;
            }
            OperationKind::CutOutsideWithPocket => {
                settings.cut_offset = settings.tool_diameter / 2.0;
                settings.pocket_offset =
                    -settings.tool_diameter * (100.0 - self.pocket_overlap) / 100.0;
            }
        }
    }

    pub(crate) fn attach_bus(&mut self, bus: Arc<EventBus>) {
        self.bus = Some(bus);
    }

    pub(crate) fn detach_bus(&mut self) {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_reads_tool_diameter() {
        let mut settings = ProcessorSettings {
            tool_diameter: 6.0,
            ..Default::default()
        };
        let op = Operation::new(OperationKind::CutInside);
        op.fill_processor_settings(&mut settings);
        assert!((settings.cut_offset + 3.0).abs() < 1e-12);
        assert!((settings.tab_height - 2.5).abs() < 1e-12);
        assert!((settings.pocket_offset - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_pocket_offset_from_overlap() {
        let mut settings = ProcessorSettings {
            tool_diameter: 6.0,
            ..Default::default()
        };
        let mut op = Operation::new(OperationKind::CutPocket);
        op.set_pocket_overlap(25.0);
        op.fill_processor_settings(&mut settings);
        assert!((settings.pocket_offset - 4.5).abs() < 1e-12);
        assert!((settings.cut_offset + 3.0).abs() < 1e-12);
        assert!((settings.tab_height - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_outside_with_pocket_clears_holes() {
        let mut settings = ProcessorSettings {
            tool_diameter: 4.0,
            ..Default::default()
        };
        let op = Operation::new(OperationKind::CutOutsideWithPocket);
        op.fill_processor_settings(&mut settings);
        assert!((settings.cut_offset - 2.0).abs() < 1e-12);
        assert!((settings.pocket_offset + 2.0).abs() < 1e-12);
    }
}
