//! Per-job toolpath generation.
//!
//! The processor turns one job's 2D geometry into 3D motion in four
//! stages: resolve the 2D polygon work (union and cut offset), tag nodes
//! for pocketing or tabs, order the resulting contours to minimize rapid
//! travel, and synthesize the multi-pass depth profile for each contour
//! before emitting moves.

use crate::job::Job;
use crate::result::{ProcessResult, SpeedLimits};
use crate::tab_generator::TabGenerator;
use routekit_core::{clip, geom, Loop, Path, PathTree, Point, TAG_TABS};
use routekit_settings::ProcessorSettings;
use tracing::warn;

/// Processes one job into a move sink. Stateless across jobs: a processor
/// is built for a job, consumed by [`Processor::process`], and dropped.
pub struct Processor {
    job: Job,
}

impl Processor {
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    /// Runs the full pipeline for this job, appending moves and problem
    /// regions to `result`.
    pub fn process(self, result: &mut ProcessResult) {
        let settings = self.job.settings().clone();
        result.set_limits(SpeedLimits::new(
            settings.cut_feedrate,
            settings.travel_speed,
            settings.plunge_feedrate,
            settings.lift_speed,
        ));
        if self.job.is_empty() {
            // Not an error: an empty job simply yields no moves.
            return;
        }

        result.add_travel(None, settings.travel_height);

        let mut tree = self.resolve_2d(result, &settings);
        for child in &mut tree.children {
            apply_pockets_and_tabs(child, &settings);
        }

        let mut candidates: Vec<Path> = tree
            .flatten()
            .into_iter()
            .filter(|p| p.length() > geom::EPSILON)
            .collect();

        let depths = pass_depths(&settings);
        while !candidates.is_empty() {
            let position = result.last_xy().unwrap_or(Point::ORIGIN);
            let nearest = candidates
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    let da = a.start().map(|p| p.distance_to(&position)).unwrap_or(f64::MAX);
                    let db = b.start().map(|p| p.distance_to(&position)).unwrap_or(f64::MAX);
                    da.total_cmp(&db)
                })
                .map(|(i, _)| i)
                .unwrap_or(0);
            let mut path = candidates.remove(nearest);

            if path.is_closed() {
                path.shift_start_towards(position);
            }
            build_depth_profile(&mut path, &depths, &settings);
            if path.has_tag(TAG_TABS) {
                TabGenerator::new(&settings).apply(&mut path);
            }

            if let Some(start) = path.start() {
                result.add_travel(Some(start), settings.travel_height);
                for (point, z) in path.depth_points() {
                    result.add_move(Some(point), z);
                }
                result.add_travel(None, settings.travel_height);
            }
        }

        result.add_travel(Some(Point::ORIGIN), settings.travel_height);
    }

    /// Resolves the job's 2D geometry into an offset containment tree.
    ///
    /// With a cut offset the closed paths are unioned and offset; open
    /// paths cannot be offset and are dropped with a warning. Without an
    /// offset, closed and open paths are cut on their centerline as-is.
    fn resolve_2d(&self, result: &mut ProcessResult, settings: &ProcessorSettings) -> PathTree {
        if settings.cut_offset.abs() > geom::EPSILON {
            if !self.job.open_paths().is_empty() {
                warn!(
                    "Job has {} open path(s); offsetting only applies to closed polygons, ignoring them",
                    self.job.open_paths().len()
                );
            }
            let groups = clip::union_paths_grouped(self.job.closed_paths());
            if settings.cut_offset > 0.0 {
                self.collect_problem_regions(result, settings, &groups);
            }
            let loops: Vec<Loop> = groups.into_iter().flatten().collect();
            clip::offset_tree(&loops, settings.cut_offset)
        } else {
            let mut root = PathTree::root();
            for path in self.job.closed_paths().iter().chain(self.job.open_paths()) {
                let mut path = path.clone();
                path.remove_duplicates();
                root.children.push(PathTree::from_path(path, false));
            }
            root
        }
    }

    /// Flags geometry an outward offset makes unsafe: a polygon grown by
    /// the cut offset plus the tool radius sweeps over everything the
    /// cutter can touch, so its overlap with any *other* polygon is
    /// material that would be destroyed.
    fn collect_problem_regions(
        &self,
        result: &mut ProcessResult,
        settings: &ProcessorSettings,
        groups: &[Vec<Loop>],
    ) {
        if groups.len() < 2 {
            return;
        }
        let sweep = settings.cut_offset + settings.tool_diameter / 2.0;
        for (i, group) in groups.iter().enumerate() {
            let swept = clip::offset_loops(group, sweep);
            let others: Vec<Loop> = groups
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .flat_map(|(_, g)| g.iter().cloned())
                .collect();
            let overlap = clip::intersect_loops(&swept, &others);
            if !overlap.is_empty() {
                warn!("Cut for a contour overlaps neighbouring geometry");
                result.add_problem_region(&overlap);
            }
        }
    }
}

/// Whether a node's interior gets concentric infill: positive pocket
/// offsets clear outlines, negative ones clear holes.
fn need_pocket(is_hole: bool, settings: &ProcessorSettings) -> bool {
    (settings.pocket_offset > 0.0 && !is_hole) || (settings.pocket_offset < 0.0 && is_hole)
}

/// Whether a node's contours get holding tabs: tabs are requested and the
/// feature is wide enough that a tool-diameter inset still leaves
/// geometry. Pocketed nodes never get tabs.
fn need_tabs(node: &PathTree, settings: &ProcessorSettings) -> bool {
    settings.tab_height > 0.0
        && !clip::offset_paths(&node.paths, -settings.tool_diameter).is_empty()
}

/// Depth-first pocket/tab pass over the offset tree (root excluded).
///
/// A pocketed node absorbs its children (their contours are cut together
/// with the node's own), adopts its grandchildren, and grows concentric
/// infill rings as new children until an inset attempt yields nothing.
fn apply_pockets_and_tabs(node: &mut PathTree, settings: &ProcessorSettings) {
    if need_pocket(node.is_hole, settings) {
        let children = std::mem::take(&mut node.children);
        let mut work: Vec<Loop> = node
            .paths
            .iter()
            .map(|p| Loop::solid(p.points().to_vec()))
            .collect();
        let mut grandchildren = Vec::new();
        for mut child in children {
            for path in &child.paths {
                work.push(Loop::hole(path.points().to_vec()));
            }
            node.paths.append(&mut child.paths);
            grandchildren.append(&mut child.children);
        }
        for grandchild in &mut grandchildren {
            apply_pockets_and_tabs(grandchild, settings);
        }

        let step = -settings.pocket_offset.abs();
        let mut infill = Vec::new();
        let mut current = work;
        loop {
            current = clip::offset_loops(&current, step);
            if current.is_empty() {
                break;
            }
            infill.push(PathTree::from_loops(&current, node.is_hole));
        }

        node.children = grandchildren;
        node.children.extend(infill);
    } else {
        if need_tabs(node, settings) {
            for path in &mut node.paths {
                path.add_tag(TAG_TABS);
            }
        }
        for child in &mut node.children {
            apply_pockets_and_tabs(child, settings);
        }
    }
}

/// Pass depths stepping down from the surface, with the final pass
/// clamped exactly to the total depth.
fn pass_depths(settings: &ProcessorSettings) -> Vec<f64> {
    let total = settings.cut_depth_total;
    let step = if settings.cut_depth_pass > geom::EPSILON {
        settings.cut_depth_pass
    } else {
        total
    };
    let mut depths = vec![-step];
    while let Some(&last) = depths.last() {
        if last <= -total {
            break;
        }
        depths.push(last - step);
    }
    if let Some(last) = depths.last_mut() {
        *last = -total;
    }
    depths
}

/// Builds the per-pass depth profile of one path: a ramp (or instant
/// plunge) to each pass depth, a full traversal at that depth, then a
/// tail at final depth and a ramp back out to the surface when ramping.
fn build_depth_profile(path: &mut Path, depths: &[f64], settings: &ProcessorSettings) {
    let length = path.length();
    let ramp = settings.ramp_length();
    let mut run = 0.0;
    for &depth in depths {
        path.add_depth_at_distance(depth, run + ramp);
        path.add_depth_at_distance(depth, run + length.max(ramp));
        run += length;
    }

    let final_depth = depths.last().copied().unwrap_or(0.0);
    if ramp > 0.0 {
        let end = path.total_depth_distance();
        if path.is_closed() {
            path.add_depth_at_distance(final_depth, end + ramp / 2.0);
        } else {
            path.add_depth_at_distance(final_depth, end + length);
        }
        // Climb back to the surface at the attack angle.
        let climb = -final_depth / settings.cut_depth_pass * ramp;
        if climb > geom::EPSILON {
            let end = path.total_depth_distance();
            path.add_depth_at_distance(0.0, end + climb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_depths_exact_division() {
        let settings = ProcessorSettings {
            cut_depth_total: 6.0,
            cut_depth_pass: 2.0,
            ..Default::default()
        };
        assert_eq!(pass_depths(&settings), vec![-2.0, -4.0, -6.0]);
    }

    #[test]
    fn test_pass_depths_clamped_last_pass() {
        let settings = ProcessorSettings {
            cut_depth_total: 5.0,
            cut_depth_pass: 2.0,
            ..Default::default()
        };
        assert_eq!(pass_depths(&settings), vec![-2.0, -4.0, -5.0]);
    }

    #[test]
    fn test_pass_depths_single_deep_pass() {
        let settings = ProcessorSettings {
            cut_depth_total: 1.5,
            cut_depth_pass: 2.0,
            ..Default::default()
        };
        assert_eq!(pass_depths(&settings), vec![-1.5]);
    }

    #[test]
    fn test_need_pocket_sign_table() {
        let pocket = |offset: f64| ProcessorSettings {
            pocket_offset: offset,
            ..Default::default()
        };
        assert!(need_pocket(false, &pocket(3.0)));
        assert!(!need_pocket(true, &pocket(3.0)));
        assert!(!need_pocket(false, &pocket(-3.0)));
        assert!(need_pocket(true, &pocket(-3.0)));
        assert!(!need_pocket(false, &pocket(0.0)));
        assert!(!need_pocket(true, &pocket(0.0)));
    }

    fn square_path(origin: f64, size: f64) -> Path {
        Path::closed(vec![
            Point::new(origin, origin),
            Point::new(origin + size, origin),
            Point::new(origin + size, origin + size),
            Point::new(origin, origin + size),
        ])
    }

    #[test]
    fn test_pocket_appends_infill_until_inset_is_empty() {
        let settings = ProcessorSettings {
            pocket_offset: 3.0,
            ..Default::default()
        };
        let mut node = PathTree::from_path(square_path(0.0, 24.0), false);
        apply_pockets_and_tabs(&mut node, &settings);

        // 24 -> 18 -> 12 -> 6 -> gone: three infill rings.
        assert_eq!(node.children.len(), 3);
        for child in &node.children {
            assert!(!child.is_hole);
            assert!(child.children.is_empty());
        }
        // The last appended ring's own inset yields nothing.
        let last = node.children.last().unwrap();
        assert!(clip::offset_paths(&last.paths, -3.0).is_empty());
    }

    #[test]
    fn test_pocket_absorbs_hole_children() {
        let settings = ProcessorSettings {
            pocket_offset: 2.0,
            ..Default::default()
        };
        let mut node = PathTree::from_path(square_path(0.0, 12.0), false);
        node.children
            .push(PathTree::from_path(square_path(5.0, 2.0), true));
        apply_pockets_and_tabs(&mut node, &settings);

        // The hole contour is cut together with the node's own contour,
        // and the infill ring respects the hole.
        assert_eq!(node.paths.len(), 2);
        assert_eq!(node.children.len(), 1);
        let ring = &node.children[0];
        assert_eq!(ring.paths.len(), 2);
        assert!(!ring.is_hole);
    }

    #[test]
    fn test_hole_node_not_pocketed_with_positive_offset() {
        let settings = ProcessorSettings {
            pocket_offset: 3.0,
            tab_height: 0.0,
            ..Default::default()
        };
        let mut node = PathTree::from_path(square_path(0.0, 24.0), true);
        apply_pockets_and_tabs(&mut node, &settings);
        assert!(node.children.is_empty());
        assert_eq!(node.paths.len(), 1);
    }

    #[test]
    fn test_tab_tagging_requires_room_for_the_tool() {
        let settings = ProcessorSettings {
            tool_diameter: 6.0,
            tab_height: 2.5,
            ..Default::default()
        };
        // Wide enough: a 6mm inset of a 20mm square survives.
        let mut wide = PathTree::from_path(square_path(0.0, 20.0), false);
        apply_pockets_and_tabs(&mut wide, &settings);
        assert!(wide.paths[0].has_tag(TAG_TABS));

        // Too narrow: the tool-diameter inset collapses, no tabs.
        let mut narrow = PathTree::from_path(square_path(0.0, 10.0), false);
        apply_pockets_and_tabs(&mut narrow, &settings);
        assert!(!narrow.paths[0].has_tag(TAG_TABS));
    }

    #[test]
    fn test_ramped_profile_returns_to_surface() {
        let settings = ProcessorSettings {
            cut_depth_total: 6.0,
            cut_depth_pass: 2.0,
            attack_angle: 45.0,
            ..Default::default()
        };
        let mut path = Path::closed(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        build_depth_profile(&mut path, &pass_depths(&settings), &settings);
        let end = path.total_depth_distance();
        assert!((path.depth_at(end) - 0.0).abs() < 1e-9);
        assert!((path.max_depth() + 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_instant_plunge_profile_has_no_tail() {
        let settings = ProcessorSettings {
            cut_depth_total: 4.0,
            cut_depth_pass: 2.0,
            attack_angle: 0.0,
            ..Default::default()
        };
        let mut path = Path::closed(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        build_depth_profile(&mut path, &pass_depths(&settings), &settings);
        // Two passes over a 40mm perimeter, no ramp-out.
        assert!((path.total_depth_distance() - 80.0).abs() < 1e-9);
        assert!((path.depth_at(80.0) + 4.0).abs() < 1e-9);
    }
}
