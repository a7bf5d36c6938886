//! Flattened numeric parameters consumed by the processor.

use serde::{Deserialize, Serialize};

/// The fully resolved parameters for one machining job, built once per job
/// by cascading machine, tool and operation contributions in that order.
///
/// Distances are millimeters, feed rates millimeters per minute, angles
/// degrees. Depths are magnitudes (positive values cut downward).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorSettings {
    /// Endmill diameter.
    pub tool_diameter: f64,
    /// Horizontal offset of the cut relative to the drawn contour;
    /// positive cuts outside, negative inside, zero on the centerline.
    pub cut_offset: f64,
    /// Depth removed per pass.
    pub cut_depth_pass: f64,
    /// Total depth to cut to.
    pub cut_depth_total: f64,
    /// Horizontal feed rate while cutting.
    pub cut_feedrate: f64,
    /// Vertical feed rate while plunging.
    pub plunge_feedrate: f64,
    /// Ramp angle used instead of an instantaneous plunge; 0 or >= 90
    /// disables ramping.
    pub attack_angle: f64,
    /// Z height for rapid travel between cuts.
    pub travel_height: f64,
    /// Horizontal speed at travel height.
    pub travel_speed: f64,
    /// Vertical speed when lifting out of a cut.
    pub lift_speed: f64,
    /// Concentric infill step; positive pockets outlines, negative
    /// pockets holes, zero disables pocketing.
    pub pocket_offset: f64,
    /// Height of holding tabs above the final cut depth; zero disables
    /// tabs.
    pub tab_height: f64,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            tool_diameter: 0.0,
            cut_offset: 0.0,
            cut_depth_pass: 1.0,
            cut_depth_total: 6.0,
            cut_feedrate: 600.0,
            plunge_feedrate: 60.0,
            attack_angle: 0.0,
            travel_height: 5.0,
            travel_speed: 1200.0,
            lift_speed: 300.0,
            pocket_offset: 0.0,
            tab_height: 0.0,
        }
    }
}

impl ProcessorSettings {
    /// Horizontal ramp distance for one pass depth, or 0 when no usable
    /// attack angle is configured (instant plunge).
    pub fn ramp_length(&self) -> f64 {
        if self.attack_angle > 0.0 && self.attack_angle < 90.0 {
            self.cut_depth_pass / self.attack_angle.to_radians().tan()
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_length() {
        let mut settings = ProcessorSettings {
            cut_depth_pass: 2.0,
            attack_angle: 45.0,
            ..Default::default()
        };
        assert!((settings.ramp_length() - 2.0).abs() < 1e-12);
        settings.attack_angle = 0.0;
        assert_eq!(settings.ramp_length(), 0.0);
        settings.attack_angle = 90.0;
        assert_eq!(settings.ramp_length(), 0.0);
    }

    #[test]
    fn test_serde_round_trip() {
        let settings = ProcessorSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: ProcessorSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
