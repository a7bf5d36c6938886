//! Holding-tab generation.
//!
//! Tabs are short bridges of material left standing in the deepest passes
//! so a cut-free part stays attached to the stock. They are expressed as
//! depth-profile modulation: within a tab span the profile is raised back
//! up towards the surface, with ramped flanks so the cutter eases in and
//! out instead of stepping.

use routekit_core::Path;
use routekit_settings::ProcessorSettings;

/// Fallback ramp length when no usable attack angle is configured; keeps
/// the tab widths strictly ordered.
const RAMP_EPSILON: f64 = 1e-4;

/// Computes where and how deep to raise the material for one path.
#[derive(Debug, Clone)]
pub struct TabGenerator {
    tab_height: f64,
    tab_top_width: f64,
    ramp_length: f64,
    tab_bottom_width: f64,
}

impl TabGenerator {
    pub fn new(settings: &ProcessorSettings) -> Self {
        let tab_top_width = settings.tool_diameter * 1.5;
        let ramp_length = if settings.attack_angle > 0.0 && settings.attack_angle < 90.0 {
            settings.tab_height / settings.attack_angle.to_radians().tan()
        } else {
            RAMP_EPSILON
        };
        Self {
            tab_height: settings.tab_height,
            tab_top_width,
            ramp_length,
            tab_bottom_width: tab_top_width + 2.0 * ramp_length,
        }
    }

    /// Adds tabs to a path whose depth profile is already complete.
    ///
    /// The path is split into three equal arc-length thirds with one tab
    /// per third. A third long enough to leave room is allowed to shift
    /// its tab towards straighter geometry; short thirds keep the tab at
    /// their center.
    pub fn apply(&self, path: &mut Path) {
        if self.tab_height <= 0.0 {
            return;
        }
        let length = path.length();
        if length < 4.0 * self.tab_bottom_width {
            // Feature too small to tab safely.
            return;
        }
        let third = length / 3.0;
        for i in 0..3 {
            let center = third * i as f64 + third / 2.0;
            let offset = if third > 2.0 * self.tab_bottom_width {
                self.find_better_tab_offset(path, center)
            } else {
                center
            };
            self.add_tab(path, offset);
        }
    }

    /// Evaluates the unshifted tab position and shifts of +-0.5 and +-1.0
    /// bottom widths, scoring each window by cornering plus a tiny bias
    /// favoring the unshifted position, and keeps the lowest score.
    fn find_better_tab_offset(&self, path: &Path, offset: f64) -> f64 {
        let half = self.tab_bottom_width / 2.0;
        let mut best = offset;
        let mut best_score = f64::INFINITY;
        for shift in [0.0, -0.5, 0.5, -1.0, 1.0] {
            let candidate = offset + shift * self.tab_bottom_width;
            let score =
                path.score_cornering(candidate - half, candidate + half) + shift.abs() * 0.001;
            if score < best_score {
                best_score = score;
                best = candidate;
            }
        }
        best
    }

    /// Raises the profile into a tab centered at `offset`, repeating every
    /// `path.length()` so closed paths re-apply the same tab pattern on
    /// every pass. Tabs only ever raise depth, never lower it below what
    /// is already scheduled.
    fn add_tab(&self, path: &mut Path, offset: f64) {
        let length = path.length();
        let total = path.total_depth_distance();
        let base = path.max_depth();
        let top = base + self.tab_height;
        let half_bottom = self.tab_bottom_width / 2.0;
        let half_top = self.tab_top_width / 2.0;
        let flank = (self.tab_bottom_width - self.tab_top_width) / 2.0;

        let mut center = offset;
        if center < half_bottom {
            center += length;
        }
        while center < total {
            let bottom_start = center - half_bottom;
            let bottom_end = center + half_bottom;
            let top_start = center - half_top;
            let top_end = center + half_top;

            let anchors = [
                (bottom_start, base),
                (top_start, top),
                (top_end, top),
                (bottom_end, base),
            ];
            let recorded: Vec<f64> = anchors.iter().map(|(d, _)| path.depth_at(*d)).collect();
            for ((d, floor), rec) in anchors.iter().zip(recorded) {
                if *d >= 0.0 && *d <= total {
                    path.add_depth_at_distance(rec.max(*floor), *d);
                }
            }

            // A breakpoint already scheduled inside the span (a pass
            // transition, for instance) must not dip below the tab.
            path.raise_depth_within(bottom_start, bottom_end, |d| {
                if d < top_start {
                    base + self.tab_height * ((d - bottom_start) / flank).clamp(0.0, 1.0)
                } else if d <= top_end {
                    top
                } else {
                    base + self.tab_height * ((bottom_end - d) / flank).clamp(0.0, 1.0)
                }
            });

            center += length;
        }
    }
}
