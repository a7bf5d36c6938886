//! Ordered move sink with feed-rate synthesis.

use routekit_core::{clip, geom, Loop, Point};
use serde::{Deserialize, Serialize};

/// One emitted tool motion. `xy` is `None` for pure vertical moves. Moves
/// are immutable once emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Move {
    /// Target position in the machining plane, if the move has a
    /// horizontal component.
    pub xy: Option<Point>,
    /// Target Z height.
    pub z: f64,
    /// Feed rate in mm/min.
    pub speed: f64,
}

/// Per-axis speed limits for the job currently being emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedLimits {
    /// Horizontal limit while cutting.
    pub xy_cut: f64,
    /// Horizontal limit while travelling.
    pub xy_travel: f64,
    /// Vertical limit moving down (plunge).
    pub z_down: f64,
    /// Vertical limit moving up (lift).
    pub z_up: f64,
}

impl SpeedLimits {
    pub fn new(xy_cut: f64, xy_travel: f64, z_down: f64, z_up: f64) -> Self {
        Self {
            xy_cut,
            xy_travel,
            z_down,
            z_up,
        }
    }
}

impl Default for SpeedLimits {
    fn default() -> Self {
        Self::new(600.0, 1200.0, 60.0, 300.0)
    }
}

/// Accumulates the ordered move list for a pass, synthesizing the feed
/// rate of each move from the per-axis limits of the current job, and
/// collects problem-region polygons for the UI.
#[derive(Debug, Clone, Default)]
pub struct ProcessResult {
    moves: Vec<Move>,
    limits: SpeedLimits,
    last_xy: Option<Point>,
    last_z: Option<f64>,
    problem_regions: Vec<Loop>,
}

impl ProcessResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the speed limits of the job about to be emitted.
    pub fn set_limits(&mut self, limits: SpeedLimits) {
        self.limits = limits;
    }

    /// Appends a cutting move.
    pub fn add_move(&mut self, xy: Option<Point>, z: f64) {
        self.push(xy, z, self.limits.xy_cut);
    }

    /// Appends a travel move.
    pub fn add_travel(&mut self, xy: Option<Point>, z: f64) {
        self.push(xy, z, self.limits.xy_travel);
    }

    /// Accumulates problem-region polygons. Regions are merged by polygon
    /// union, not deduplicated by identity.
    pub fn add_problem_region(&mut self, region: &[Loop]) {
        if region.is_empty() {
            return;
        }
        self.problem_regions = clip::union_loops(&self.problem_regions, region);
    }

    /// Last emitted horizontal position, if any move had one.
    pub fn last_xy(&self) -> Option<Point> {
        self.last_xy
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn problem_regions(&self) -> &[Loop] {
        &self.problem_regions
    }

    pub fn into_parts(self) -> (Vec<Move>, Vec<Loop>) {
        (self.moves, self.problem_regions)
    }

    /// Synthesizes the feed rate for a displacement and appends the move.
    ///
    /// The move is time-limited by whichever axis would exceed its rated
    /// speed: with both axes moving the rate is
    /// `min(xy_limit / xy_dist, z_limit / z_dist) * total_dist`; with one
    /// axis moving its limit applies directly. Zero-displacement moves
    /// are dropped.
    fn push(&mut self, xy: Option<Point>, z: f64, xy_limit: f64) {
        let target_xy = xy.or(self.last_xy);
        // A move introducing the first known xy has an unmeasurable
        // horizontal displacement; it gets the horizontal limit and is
        // never dropped.
        let unknown_displacement =
            self.last_z.is_none() || (xy.is_some() && self.last_xy.is_none());
        let speed = if unknown_displacement {
            xy_limit
        } else {
            let last_z = self.last_z.unwrap_or(0.0);
            let xy_dist = match (xy, self.last_xy) {
                (Some(p), Some(lp)) => p.distance_to(&lp),
                _ => 0.0,
            };
            let dz = z - last_z;
            let z_dist = dz.abs();
            if xy_dist < geom::EPSILON && z_dist < geom::EPSILON {
                return;
            }
            let z_limit = if dz < 0.0 {
                self.limits.z_down
            } else {
                self.limits.z_up
            };
            if xy_dist < geom::EPSILON {
                z_limit
            } else if z_dist < geom::EPSILON {
                xy_limit
            } else {
                let total = (xy_dist * xy_dist + z_dist * z_dist).sqrt();
                (xy_limit / xy_dist).min(z_limit / z_dist) * total
            }
        };
        self.moves.push(Move { xy, z, speed });
        self.last_xy = target_xy;
        self.last_z = Some(z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> ProcessResult {
        let mut result = ProcessResult::new();
        result.set_limits(SpeedLimits::new(100.0, 1200.0, 50.0, 300.0));
        result
    }

    #[test]
    fn test_horizontal_move_uses_xy_limit() {
        let mut result = sink();
        result.add_move(Some(Point::new(0.0, 0.0)), 0.0);
        result.add_move(Some(Point::new(3.0, 4.0)), 0.0);
        let m = result.moves().last().unwrap();
        assert!((m.speed - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_vertical_move_uses_plunge_limit() {
        let mut result = sink();
        result.add_move(Some(Point::new(0.0, 0.0)), 0.0);
        result.add_move(None, -5.0);
        let m = result.moves().last().unwrap();
        assert!((m.speed - 50.0).abs() < 1e-9);
        assert!(m.xy.is_none());
    }

    #[test]
    fn test_lift_uses_lift_limit() {
        let mut result = sink();
        result.add_move(Some(Point::new(0.0, 0.0)), -5.0);
        result.add_travel(None, 5.0);
        let m = result.moves().last().unwrap();
        assert!((m.speed - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_mixed_move_is_limited_by_slower_axis() {
        let mut result = sink();
        result.add_move(Some(Point::new(0.0, 0.0)), 0.0);
        // 4mm horizontal, 3mm down: the plunge limit dominates
        // (50/3 < 100/4), so speed = 50/3 * 5.
        result.add_move(Some(Point::new(4.0, 0.0)), -3.0);
        let m = result.moves().last().unwrap();
        assert!((m.speed - 50.0 / 3.0 * 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_displacement_moves_are_dropped() {
        let mut result = sink();
        result.add_move(Some(Point::new(1.0, 1.0)), -2.0);
        result.add_move(Some(Point::new(1.0, 1.0)), -2.0);
        result.add_move(None, -2.0);
        assert_eq!(result.moves().len(), 1);
    }

    #[test]
    fn test_first_move_uses_horizontal_limit() {
        let mut result = sink();
        result.add_travel(None, 5.0);
        let m = result.moves().last().unwrap();
        assert!((m.speed - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_last_xy_tracking() {
        let mut result = sink();
        assert!(result.last_xy().is_none());
        result.add_travel(None, 5.0);
        assert!(result.last_xy().is_none());
        result.add_move(Some(Point::new(2.0, 3.0)), 0.0);
        assert_eq!(result.last_xy(), Some(Point::new(2.0, 3.0)));
        result.add_travel(None, 5.0);
        assert_eq!(result.last_xy(), Some(Point::new(2.0, 3.0)));
    }

    #[test]
    fn test_move_serde_round_trip() {
        let m = Move {
            xy: Some(Point::new(1.5, -2.5)),
            z: -3.0,
            speed: 600.0,
        };
        let json = serde_json::to_string(&m).unwrap();
        let back: Move = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_problem_regions_merge_by_union() {
        let square = |o: f64| -> Vec<Loop> {
            vec![Loop::solid(vec![
                Point::new(o, o),
                Point::new(o + 4.0, o),
                Point::new(o + 4.0, o + 4.0),
                Point::new(o, o + 4.0),
            ])]
        };
        let mut result = sink();
        result.add_problem_region(&square(0.0));
        result.add_problem_region(&square(2.0));
        // Overlapping regions merge into one solid.
        assert_eq!(
            result
                .problem_regions()
                .iter()
                .filter(|l| !l.is_hole)
                .count(),
            1
        );
    }
}
