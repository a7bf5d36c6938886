//! Wrapper around the 2D polygon boolean/offset primitives.
//!
//! Booleans run on [`csgrs`] sketches (backed by multipolygons with hole
//! rings), parallel offsets on [`cavalier_contours`] polylines. Everything
//! entering or leaving this module is a [`Loop`]: a closed point ring plus
//! a hole flag. Solid regions are "exterior loops minus hole loops"; all
//! offset amounts are expressed as solid-region growth (positive grows the
//! solid, negative shrinks it).

use crate::geom::{self, point_in_polygon, signed_area, Point};
use crate::path::Path;
use crate::path_tree::PathTree;
use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use csgrs::sketch::Sketch;
use csgrs::traits::CSG;
use std::panic;
use tracing::warn;

/// Coincidence tolerance used when converting between representations.
const MERGE_EPS: f64 = 1e-5;

/// A closed contour with its role in the solid region it bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub points: Vec<Point>,
    pub is_hole: bool,
}

impl Loop {
    pub fn solid(points: Vec<Point>) -> Self {
        Self {
            points,
            is_hole: false,
        }
    }

    pub fn hole(points: Vec<Point>) -> Self {
        Self {
            points,
            is_hole: true,
        }
    }

    /// Absolute enclosed area.
    pub fn area(&self) -> f64 {
        signed_area(&self.points).abs()
    }
}

fn loop_to_sketch(points: &[Point]) -> Sketch<()> {
    if points.len() < 3 {
        return Sketch::new();
    }
    let pts: Vec<[f64; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
    Sketch::polygon(&pts, None)
}

/// Unions exterior loops and subtracts hole loops, yielding one sketch for
/// the solid region the loops describe.
fn loops_to_sketch(loops: &[Loop]) -> Sketch<()> {
    let mut positive = Sketch::new();
    let mut negative = Sketch::new();
    for l in loops {
        let s = loop_to_sketch(&l.points);
        if l.is_hole {
            negative = negative.union(&s);
        } else {
            positive = positive.union(&s);
        }
    }
    positive.difference(&negative)
}

fn ring_to_points(ring: impl Iterator<Item = (f64, f64)>) -> Vec<Point> {
    let mut points: Vec<Point> = Vec::new();
    for (x, y) in ring {
        let p = Point::new(x, y);
        if let Some(last) = points.last() {
            if last.distance_to(&p) < MERGE_EPS {
                continue;
            }
        }
        points.push(p);
    }
    if points.len() > 1 && points[0].distance_to(&points[points.len() - 1]) < MERGE_EPS {
        points.pop();
    }
    points
}

/// Extracts the loops of a sketch, grouped per polygon: each group holds
/// the exterior loop followed by its hole loops.
fn sketch_to_loop_groups(sketch: &Sketch<()>) -> Vec<Vec<Loop>> {
    let mut groups = Vec::new();
    let mp = sketch.to_multipolygon();
    for poly in mp.0 {
        let mut group = Vec::new();
        let exterior = ring_to_points(poly.exterior().0.iter().map(|c| (c.x, c.y)));
        if exterior.len() < 3 {
            continue;
        }
        group.push(Loop::solid(exterior));
        for interior in poly.interiors() {
            let ring = ring_to_points(interior.0.iter().map(|c| (c.x, c.y)));
            if ring.len() >= 3 {
                group.push(Loop::hole(ring));
            }
        }
        groups.push(group);
    }
    groups
}

fn sketch_to_loops(sketch: &Sketch<()>) -> Vec<Loop> {
    sketch_to_loop_groups(sketch).into_iter().flatten().collect()
}

/// Unions a set of closed paths into resolved loops, grouped per resulting
/// polygon. Filling follows the even-odd rule for nested input: a contour
/// drawn inside another contour becomes a hole of the union result.
pub fn union_paths_grouped(paths: &[Path]) -> Vec<Vec<Loop>> {
    let rings: Vec<&[Point]> = paths
        .iter()
        .filter(|p| p.points().len() >= 3)
        .map(|p| p.points())
        .collect();

    // Nesting parity decides which input contours describe holes. A
    // contour counts as nested only when every vertex lies inside the
    // other contour; partially overlapping contours stay solid and merge.
    let mut positive = Sketch::new();
    let mut negative = Sketch::new();
    for (i, ring) in rings.iter().enumerate() {
        let depth = rings
            .iter()
            .enumerate()
            .filter(|(j, other)| {
                *j != i && ring.iter().all(|p| point_in_polygon(*p, other))
            })
            .count();
        let s = loop_to_sketch(ring);
        if depth % 2 == 1 {
            negative = negative.union(&s);
        } else {
            positive = positive.union(&s);
        }
    }
    sketch_to_loop_groups(&positive.difference(&negative))
}

/// Unions a set of closed paths into a flat loop list.
pub fn union_paths(paths: &[Path]) -> Vec<Loop> {
    union_paths_grouped(paths).into_iter().flatten().collect()
}

/// Unions two loop sets (used to accumulate problem regions).
pub fn union_loops(a: &[Loop], b: &[Loop]) -> Vec<Loop> {
    if a.is_empty() {
        return b.to_vec();
    }
    if b.is_empty() {
        return a.to_vec();
    }
    sketch_to_loops(&loops_to_sketch(a).union(&loops_to_sketch(b)))
}

/// Intersects two loop sets.
pub fn intersect_loops(a: &[Loop], b: &[Loop]) -> Vec<Loop> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    sketch_to_loops(&loops_to_sketch(a).intersection(&loops_to_sketch(b)))
}

/// Offsets the solid region described by `loops`. A positive amount grows
/// the solid, a negative amount shrinks it; hole boundaries move the
/// opposite way so the wall thickness changes consistently. Returns the
/// resolved loops of the offset region (empty when the region vanishes).
pub fn offset_loops(loops: &[Loop], amount: f64) -> Vec<Loop> {
    if amount.abs() < geom::EPSILON {
        return loops.to_vec();
    }
    let mut positive = Sketch::new();
    let mut negative = Sketch::new();
    for l in loops {
        let delta = if l.is_hole { -amount } else { amount };
        for ring in offset_ring(&l.points, l.is_hole, delta) {
            let s = loop_to_sketch(&ring);
            if l.is_hole {
                negative = negative.union(&s);
            } else {
                positive = positive.union(&s);
            }
        }
    }
    sketch_to_loops(&positive.difference(&negative))
}

/// Offsets a set of closed paths treated as plain solid contours.
pub fn offset_paths(paths: &[Path], amount: f64) -> Vec<Loop> {
    let loops: Vec<Loop> = paths
        .iter()
        .filter(|p| p.points().len() >= 3)
        .map(|p| Loop::solid(p.points().to_vec()))
        .collect();
    offset_loops(&loops, amount)
}

/// Offsets the solid region and rebuilds the containment tree from the
/// result: exterior loops become nodes, hole loops become their children,
/// and loops nested inside a hole attach below that hole node.
pub fn offset_tree(loops: &[Loop], amount: f64) -> PathTree {
    build_tree(&offset_loops(loops, amount))
}

/// Arranges resolved loops into a containment forest under a root node.
pub fn build_tree(loops: &[Loop]) -> PathTree {
    let n = loops.len();
    let mut parent: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        let probe = match loops[i].points.first() {
            Some(p) => *p,
            None => continue,
        };
        let mut best: Option<usize> = None;
        for j in 0..n {
            if i == j || !point_in_polygon(probe, &loops[j].points) {
                continue;
            }
            if best.is_none_or(|b| loops[j].area() < loops[b].area()) {
                best = Some(j);
            }
        }
        parent[i] = best;
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut roots: Vec<usize> = Vec::new();
    for i in 0..n {
        match parent[i] {
            Some(p) => children[p].push(i),
            None => roots.push(i),
        }
    }

    fn assemble(idx: usize, loops: &[Loop], children: &[Vec<usize>]) -> PathTree {
        let mut node = PathTree::from_path(Path::closed(loops[idx].points.clone()), loops[idx].is_hole);
        for &c in &children[idx] {
            node.children.push(assemble(c, loops, children));
        }
        node
    }

    let mut root = PathTree::root();
    for r in roots {
        root.children.push(assemble(r, loops, &children));
    }
    root
}

/// Runs the parallel-offset primitive on one ring. `delta` follows the
/// primitive's sign convention after the ring has been normalized
/// (clockwise for exteriors, counter-clockwise for holes): negative
/// insets an exterior, positive outsets it. The primitive can panic on
/// pathological input, which is contained here and reported as an empty
/// result.
fn offset_ring(points: &[Point], is_hole: bool, delta: f64) -> Vec<Vec<Point>> {
    if points.len() < 3 {
        return Vec::new();
    }
    let mut ring: Vec<Point> = points.to_vec();
    let clockwise = signed_area(&ring) < 0.0;
    if clockwise == is_hole {
        ring.reverse();
    }

    let mut pline = Polyline::new();
    let mut last: Option<Point> = None;
    for p in &ring {
        if let Some(l) = last {
            if l.distance_to(p) < MERGE_EPS {
                continue;
            }
        }
        pline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
        last = Some(*p);
    }
    if pline.vertex_count() > 1 {
        if let (Some(first), Some(end)) = (pline.get(0), pline.get(pline.vertex_count() - 1)) {
            if (first.x - end.x).abs() < MERGE_EPS && (first.y - end.y).abs() < MERGE_EPS {
                pline.remove(pline.vertex_count() - 1);
            }
        }
    }
    if pline.vertex_count() < 3 {
        return Vec::new();
    }
    pline.set_is_closed(true);
    pline.remove_repeat_pos(MERGE_EPS);

    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| pline.parallel_offset(delta)));
    match result {
        Ok(offsets) => offsets
            .iter()
            .map(flatten_pline)
            .filter(|ring| ring.len() >= 3)
            .collect(),
        Err(_) => {
            warn!("Panic during parallel offset of a contour, dropping it");
            Vec::new()
        }
    }
}

/// Converts an offset polyline back to a plain point ring, sampling arc
/// (bulge) segments as short line runs.
fn flatten_pline(pline: &Polyline<f64>) -> Vec<Point> {
    let mut points = Vec::new();
    let count = pline.vertex_count();
    if count < 2 {
        return points;
    }
    for i in 0..count {
        let v1 = pline.at(i);
        let v2 = pline.at((i + 1) % count);
        points.push(Point::new(v1.x, v1.y));

        if v1.bulge.abs() > MERGE_EPS {
            let theta = 4.0 * v1.bulge.atan();
            let chord_len = ((v2.x - v1.x).powi(2) + (v2.y - v1.y).powi(2)).sqrt();
            if chord_len > MERGE_EPS {
                let radius = chord_len / (2.0 * (theta / 2.0).sin());
                let dist_to_center = radius.abs() * (theta.abs() / 2.0).cos();
                let mx = (v1.x + v2.x) / 2.0;
                let my = (v1.y + v2.y) / 2.0;
                let nx = -(v2.y - v1.y) / chord_len;
                let ny = (v2.x - v1.x) / chord_len;
                let sign = if v1.bulge > 0.0 { 1.0 } else { -1.0 };
                let cx = mx + nx * dist_to_center * sign;
                let cy = my + ny * dist_to_center * sign;
                let start_angle = (v1.y - cy).atan2(v1.x - cx);
                let mut end_angle = (v2.y - cy).atan2(v2.x - cx);
                if v1.bulge > 0.0 {
                    if end_angle <= start_angle {
                        end_angle += 2.0 * std::f64::consts::PI;
                    }
                } else if end_angle >= start_angle {
                    end_angle -= 2.0 * std::f64::consts::PI;
                }
                let segments = 8;
                for j in 1..segments {
                    let t = j as f64 / segments as f64;
                    let angle = start_angle + (end_angle - start_angle) * t;
                    points.push(Point::new(
                        cx + radius.abs() * angle.cos(),
                        cy + radius.abs() * angle.sin(),
                    ));
                }
            }
        }
    }
    points
}
