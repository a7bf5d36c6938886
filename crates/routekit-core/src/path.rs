//! Point-sequence paths with depth-at-distance profiles.
//!
//! A [`Path`] is the unit the toolpath pipeline works on: an ordered 2D
//! point sequence (open or closed) plus a depth profile that maps distance
//! travelled along the path to cutting depth. The profile is what turns a
//! flat contour into multi-pass, ramped and tabbed 3D motion.

use crate::geom::{self, project_onto_segment, Point};
use serde::{Deserialize, Serialize};

/// Tag marking a path that should receive holding tabs.
pub const TAG_TABS: &str = "tabs";

/// An ordered point sequence with an optional closing edge, a tag set and
/// a depth-at-distance profile.
///
/// Profile invariants: it always starts at distance 0, distances are
/// non-decreasing, and entries at the same distance are ordered shallow to
/// deep so a query at an instantaneous transition resolves to the deeper
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    points: Vec<Point>,
    closed: bool,
    tags: Vec<String>,
    /// (distance, depth) breakpoints, sorted by (distance, -depth).
    depth_profile: Vec<(f64, f64)>,
}

impl Path {
    /// Creates a path from a point sequence.
    pub fn new(points: Vec<Point>, closed: bool) -> Self {
        Self {
            points,
            closed,
            tags: Vec::new(),
            depth_profile: vec![(0.0, 0.0)],
        }
    }

    /// Creates a closed path.
    pub fn closed(points: Vec<Point>) -> Self {
        Self::new(points, true)
    }

    /// Creates an open path.
    pub fn open(points: Vec<Point>) -> Self {
        Self::new(points, false)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// First point of the path, if any.
    pub fn start(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn add_tag(&mut self, tag: &str) {
        if !self.has_tag(tag) {
            self.tags.push(tag.to_string());
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Total arc length; closed paths include the closing edge.
    pub fn length(&self) -> f64 {
        let mut total = 0.0;
        for w in self.points.windows(2) {
            total += w[0].distance_to(&w[1]);
        }
        if self.closed && self.points.len() > 1 {
            total += self.points[self.points.len() - 1].distance_to(&self.points[0]);
        }
        total
    }

    /// Collapses consecutive coincident points. For closed paths the first
    /// point is also checked against the last (the wrap edge); open paths
    /// have no wrap edge so index 0 is never removed.
    pub fn remove_duplicates(&mut self) {
        self.points.dedup_by(|b, a| a.almost_eq(b));
        if self.closed && self.points.len() > 1 {
            let first = self.points[0];
            if self.points[self.points.len() - 1].almost_eq(&first) {
                self.points.pop();
            }
        }
    }

    /// Rotates a closed path so it starts as near `target` as possible.
    ///
    /// The nearest vertex alone is not enough: the true nearest location
    /// can lie mid-edge, so the target is projected onto both edges
    /// adjacent to the nearest vertex and the closer projection becomes
    /// the new start point.
    pub fn shift_start_towards(&mut self, target: Point) {
        if !self.closed || self.points.len() < 3 {
            return;
        }
        let n = self.points.len();
        let nearest = self
            .points
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.distance_to(&target).total_cmp(&b.distance_to(&target))
            })
            .map(|(i, _)| i)
            .unwrap_or(0);

        let prev = (nearest + n - 1) % n;
        let next = (nearest + 1) % n;
        let on_prev = project_onto_segment(target, self.points[prev], self.points[nearest]);
        let on_next = project_onto_segment(target, self.points[nearest], self.points[next]);

        // Edge index i spans points[i] -> points[i + 1].
        let (edge, start_point) = if on_prev.distance_to(&target) <= on_next.distance_to(&target) {
            (prev, on_prev)
        } else {
            (nearest, on_next)
        };

        let mut rebuilt = Vec::with_capacity(n + 1);
        rebuilt.push(start_point);
        for k in 1..=n {
            rebuilt.push(self.points[(edge + k) % n]);
        }
        self.points = rebuilt;
        self.remove_duplicates();
    }

    /// Accumulates a cornering score over the arc-length window
    /// `(start, end)`: each vertex strictly inside the window contributes
    /// `1 + cos` of the angle between its two adjacent edges (as vectors
    /// pointing away from the vertex). Straight runs score near 0, sharp
    /// corners near 2, so lower is better.
    pub fn score_cornering(&self, start: f64, end: f64) -> f64 {
        let n = self.points.len();
        if n < 3 || end <= start || self.length() < geom::EPSILON {
            return 0.0;
        }
        let mut score = 0.0;
        let mut arc = 0.0;
        let mut k = 1usize;
        loop {
            let idx = k % n;
            let prev = (idx + n - 1) % n;
            arc += self.points[prev].distance_to(&self.points[idx]);
            if arc >= end {
                break;
            }
            if !self.closed && k >= n - 1 {
                break;
            }
            if arc > start {
                let next = (idx + 1) % n;
                let e1 = self.points[prev] - self.points[idx];
                let e2 = self.points[next] - self.points[idx];
                if let (Some(d1), Some(d2)) = (e1.normalized(), e2.normalized()) {
                    score += 1.0 + d1.dot(&d2);
                }
            }
            k += 1;
        }
        score
    }

    /// Inserts a depth breakpoint and restores the profile sort order.
    pub fn add_depth_at_distance(&mut self, depth: f64, distance: f64) {
        self.depth_profile.push((distance, depth));
        self.depth_profile
            .sort_by(|a, b| a.0.total_cmp(&b.0).then((-a.1).total_cmp(&-b.1)));
    }

    /// Depth at a given distance, linearly interpolated between the two
    /// bracketing breakpoints and clamped to the final value beyond the
    /// profile's end. An exact hit on an instantaneous transition yields
    /// the deeper value.
    pub fn depth_at(&self, distance: f64) -> f64 {
        let profile = &self.depth_profile;
        if profile.is_empty() {
            return 0.0;
        }
        if distance <= profile[0].0 + geom::EPSILON {
            if (profile[0].0 - distance).abs() <= geom::EPSILON {
                // Fall through to pick the deepest entry at this distance.
            } else {
                return profile[0].1;
            }
        }
        let mut j = 0;
        for (i, bp) in profile.iter().enumerate() {
            if bp.0 <= distance + geom::EPSILON {
                j = i;
            } else {
                break;
            }
        }
        let (dj, zj) = profile[j];
        if (dj - distance).abs() <= geom::EPSILON || j + 1 >= profile.len() {
            return zj;
        }
        let (dn, zn) = profile[j + 1];
        let t = (distance - dj) / (dn - dj);
        zj + (zn - zj) * t
    }

    /// Deepest (most negative) depth in the profile.
    pub fn max_depth(&self) -> f64 {
        self.depth_profile
            .iter()
            .map(|bp| bp.1)
            .fold(0.0, f64::min)
    }

    /// Distance of the final profile breakpoint.
    pub fn total_depth_distance(&self) -> f64 {
        self.depth_profile.last().map(|bp| bp.0).unwrap_or(0.0)
    }

    /// Raises every breakpoint strictly inside the arc-length window
    /// `(start, end)` to at least `floor(distance)` given by `envelope`.
    /// Used by tab generation; depths are only ever raised.
    pub fn raise_depth_within<F>(&mut self, start: f64, end: f64, envelope: F)
    where
        F: Fn(f64) -> f64,
    {
        for bp in &mut self.depth_profile {
            if bp.0 > start + geom::EPSILON && bp.0 < end - geom::EPSILON {
                bp.1 = bp.1.max(envelope(bp.0));
            }
        }
    }

    /// Walks path vertices and depth breakpoints in lockstep by arc
    /// length, emitting a `(point, depth)` pair at every boundary.
    /// Whichever boundary comes first is emitted, interpolating the other
    /// coordinate when it falls strictly between boundaries. Closed paths
    /// wrap around for as long as the profile extends; open paths are
    /// traversed forward then reversed, emulating round-trip multi-pass
    /// motion.
    pub fn depth_points(&self) -> Vec<(Point, f64)> {
        let mut out: Vec<(Point, f64)> = Vec::new();
        if self.points.len() < 2
            || self.length() < geom::EPSILON
            || self.depth_profile.is_empty()
        {
            return out;
        }

        let mut push = |out: &mut Vec<(Point, f64)>, pt: Point, z: f64| {
            if let Some((lp, lz)) = out.last() {
                if lp.almost_eq(&pt) && (lz - z).abs() < geom::EPSILON {
                    return;
                }
            }
            out.push((pt, z));
        };

        let mut cursor = EdgeCursor::new(&self.points, self.closed);
        let (mut p0, mut p1, mut len) = cursor.next_edge();
        let mut edge_start = 0.0;
        let mut bp_idx = 0;

        while bp_idx < self.depth_profile.len() {
            let (bd, bz) = self.depth_profile[bp_idx];
            let edge_end = edge_start + len;
            if bd < edge_end - geom::EPSILON {
                let t = ((bd - edge_start) / len).clamp(0.0, 1.0);
                push(&mut out, p0.lerp(&p1, t), bz);
                bp_idx += 1;
            } else if bd <= edge_end + geom::EPSILON {
                push(&mut out, p1, bz);
                bp_idx += 1;
            } else {
                push(&mut out, p1, self.depth_at(edge_end));
                edge_start = edge_end;
                let next = cursor.next_edge();
                p0 = next.0;
                p1 = next.1;
                len = next.2;
            }
        }
        out
    }
}

/// Produces successive non-degenerate edges of a path: cyclic for closed
/// paths, ping-pong (forward then reversed) for open ones.
struct EdgeCursor<'a> {
    points: &'a [Point],
    closed: bool,
    idx: usize,
    forward: bool,
}

impl<'a> EdgeCursor<'a> {
    fn new(points: &'a [Point], closed: bool) -> Self {
        Self {
            points,
            closed,
            idx: 0,
            forward: true,
        }
    }

    fn next_edge(&mut self) -> (Point, Point, f64) {
        let n = self.points.len();
        loop {
            let (a, b) = if self.closed {
                let i = self.idx % n;
                let j = (self.idx + 1) % n;
                self.idx += 1;
                (self.points[i], self.points[j])
            } else if self.forward {
                let i = self.idx;
                self.idx += 1;
                if self.idx >= n - 1 {
                    self.idx = n - 1;
                    self.forward = false;
                }
                (self.points[i], self.points[i + 1])
            } else {
                let i = self.idx;
                self.idx = self.idx.saturating_sub(1);
                if i <= 1 {
                    self.idx = 0;
                    self.forward = true;
                }
                (self.points[i], self.points[i - 1])
            };
            let len = a.distance_to(&b);
            if len >= geom::EPSILON {
                return (a, b, len);
            }
        }
    }
}
