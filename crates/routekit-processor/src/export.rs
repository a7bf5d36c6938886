//! Move-list consumers: G-code text export and the job summary.

use crate::result::Move;
use routekit_core::Point;
use std::fmt;
use std::io::{self, Write};

/// Writes the move list as G-code.
///
/// One `G1` per move with the synthesized feed rate; pure vertical moves
/// omit X/Y. Millimeter and absolute modes are set up front.
pub fn write_gcode<W: Write>(writer: &mut W, moves: &[Move]) -> io::Result<()> {
    writeln!(writer, "; RouteKit export")?;
    writeln!(writer, "G21")?;
    writeln!(writer, "G90")?;
    for m in moves {
        match m.xy {
            Some(p) => writeln!(
                writer,
                "G1 F{:.0} X{:.4} Y{:.4} Z{:.4}",
                m.speed, p.x, p.y, m.z
            )?,
            None => writeln!(writer, "G1 F{:.0} Z{:.4}", m.speed, m.z)?,
        }
    }
    writeln!(writer, "M2")?;
    Ok(())
}

/// Key figures of a processed move list, derived by scanning it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobSummary {
    /// Lower-left corner of the horizontal bounding box.
    pub min: Point,
    /// Upper-right corner of the horizontal bounding box.
    pub max: Point,
    /// Deepest Z reached.
    pub max_depth: f64,
    /// Total 3D distance travelled.
    pub total_distance: f64,
    /// Estimated duration in minutes at the synthesized feed rates.
    pub estimated_minutes: f64,
}

impl JobSummary {
    /// Scans a move list. Returns `None` for a list without any
    /// positioned move.
    pub fn from_moves(moves: &[Move]) -> Option<Self> {
        let mut bounds: Option<(Point, Point)> = None;
        let mut max_depth: f64 = 0.0;
        let mut total_distance = 0.0;
        let mut estimated_minutes = 0.0;

        let mut last_xy: Option<Point> = None;
        let mut last_z: Option<f64> = None;
        for m in moves {
            if let Some(p) = m.xy {
                bounds = Some(match bounds {
                    None => (p, p),
                    Some((lo, hi)) => (
                        Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                        Point::new(hi.x.max(p.x), hi.y.max(p.y)),
                    ),
                });
            }
            max_depth = max_depth.min(m.z);

            let xy_dist = match (m.xy.or(last_xy), last_xy) {
                (Some(p), Some(lp)) => p.distance_to(&lp),
                _ => 0.0,
            };
            let z_dist = last_z.map(|lz| (m.z - lz).abs()).unwrap_or(0.0);
            let dist = (xy_dist * xy_dist + z_dist * z_dist).sqrt();
            total_distance += dist;
            if m.speed > 0.0 {
                estimated_minutes += dist / m.speed;
            }

            last_xy = m.xy.or(last_xy);
            last_z = Some(m.z);
        }

        let (min, max) = bounds?;
        Some(Self {
            min,
            max,
            max_depth,
            total_distance,
            estimated_minutes,
        })
    }
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Bounds: {:.1} x {:.1} mm (X {:.1}..{:.1}, Y {:.1}..{:.1})",
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.min.x,
            self.max.x,
            self.min.y,
            self.max.y
        )?;
        writeln!(f, "Max depth: {:.2} mm", -self.max_depth)?;
        writeln!(f, "Total distance: {:.1} mm", self.total_distance)?;
        let seconds = (self.estimated_minutes * 60.0).round() as u64;
        write!(f, "Estimated time: {}:{:02}", seconds / 60, seconds % 60)
    }
}
