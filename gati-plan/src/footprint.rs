//! Robot footprint utilities.
//!
//! The footprint is a polygon in the body frame (meters, counter-clockwise).
//! These helpers compute its characteristic radii and rasterize it onto a
//! costmap, optionally filling the interior.

use crate::core::{Point, Pose};
use crate::costmap::Costmap;

/// Distance from a point to a line segment.
fn distance_to_segment(px: f64, py: f64, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return (px - a.x).hypot(py - a.y);
    }
    let t = (((px - a.x) * dx + (py - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    (px - (a.x + t * dx)).hypot(py - (a.y + t * dy))
}

/// Inscribed and circumscribed radii of a footprint polygon.
///
/// The inscribed radius is the smallest distance from the body origin to
/// any edge, the circumscribed radius the largest distance to any vertex.
/// Degenerate footprints (fewer than 3 vertices) describe a point robot
/// and yield `(0.0, 0.0)`.
pub fn min_max_radii(footprint: &[Point]) -> (f64, f64) {
    if footprint.len() < 3 {
        return (0.0, 0.0);
    }

    let mut min_dist = f64::MAX;
    let mut max_dist: f64 = 0.0;
    for i in 0..footprint.len() {
        let a = footprint[i];
        let b = footprint[(i + 1) % footprint.len()];
        let vertex_dist = a.x.hypot(a.y);
        let edge_dist = distance_to_segment(0.0, 0.0, a, b);
        min_dist = min_dist.min(vertex_dist.min(edge_dist));
        max_dist = max_dist.max(vertex_dist.max(edge_dist));
    }
    (min_dist, max_dist)
}

/// Transform a body-frame footprint to world coordinates at `pose`.
pub fn oriented_footprint(pose: Pose, footprint: &[Point]) -> Vec<Point> {
    let cos_t = pose.theta.cos();
    let sin_t = pose.theta.sin();
    footprint
        .iter()
        .map(|p| {
            Point::new(
                pose.x + p.x * cos_t - p.y * sin_t,
                pose.y + p.x * sin_t + p.y * cos_t,
            )
        })
        .collect()
}

/// Cells crossed by the segment between two cells, inclusive of both ends.
pub fn line_cells(x0: u32, y0: u32, x1: u32, y1: u32) -> Vec<(u32, u32)> {
    let (mut x0, mut y0) = (x0 as i64, y0 as i64);
    let (x1, y1) = (x1 as i64, y1 as i64);

    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;

    let mut cells = Vec::with_capacity((dx.max(dy) + 1) as usize);
    loop {
        cells.push((x0 as u32, y0 as u32));
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
    cells
}

/// Cells covered by the footprint polygon placed at `pose`.
///
/// Rasterizes the polygon outline; with `fill_interior` every cell between
/// the outline's per-column extremes is included as well. Returns an empty
/// list when any vertex falls off the costmap.
pub fn footprint_cells(
    pose: Pose,
    footprint: &[Point],
    costmap: &dyn Costmap,
    fill_interior: bool,
) -> Vec<(u32, u32)> {
    let oriented = oriented_footprint(pose, footprint);

    let mut vertices = Vec::with_capacity(oriented.len());
    for p in &oriented {
        match costmap.world_to_map(p.x, p.y) {
            Some(cell) => vertices.push(cell),
            None => return Vec::new(),
        }
    }

    let mut cells = Vec::new();
    for i in 0..vertices.len() {
        let (x0, y0) = vertices[i];
        let (x1, y1) = vertices[(i + 1) % vertices.len()];
        cells.extend(line_cells(x0, y0, x1, y1));
    }

    if fill_interior {
        cells = fill_columns(cells);
    }

    cells.sort_unstable();
    cells.dedup();
    cells
}

/// Complete each column of outline cells down to a solid span.
fn fill_columns(outline: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    use std::collections::BTreeMap;

    let mut spans: BTreeMap<u32, (u32, u32)> = BTreeMap::new();
    for (x, y) in outline {
        spans
            .entry(x)
            .and_modify(|(lo, hi)| {
                *lo = (*lo).min(y);
                *hi = (*hi).max(y);
            })
            .or_insert((y, y));
    }

    let mut cells = Vec::new();
    for (x, (lo, hi)) in spans {
        for y in lo..=hi {
            cells.push((x, y));
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costmap::GridCostmap;
    use approx::assert_relative_eq;

    fn square_footprint(half: f64) -> Vec<Point> {
        vec![
            Point::new(-half, -half),
            Point::new(half, -half),
            Point::new(half, half),
            Point::new(-half, half),
        ]
    }

    #[test]
    fn test_radii_of_square() {
        let (inscribed, circumscribed) = min_max_radii(&square_footprint(0.5));
        assert_relative_eq!(inscribed, 0.5);
        assert_relative_eq!(circumscribed, 0.5 * 2.0_f64.sqrt());
    }

    #[test]
    fn test_radii_of_point_robot() {
        assert_eq!(min_max_radii(&[]), (0.0, 0.0));
        assert_eq!(min_max_radii(&[Point::new(0.1, 0.0)]), (0.0, 0.0));
    }

    #[test]
    fn test_oriented_footprint_rotates() {
        let oriented = oriented_footprint(
            Pose::new(1.0, 1.0, std::f64::consts::FRAC_PI_2),
            &[Point::new(1.0, 0.0)],
        );
        assert_relative_eq!(oriented[0].x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(oriented[0].y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_line_cells_endpoints() {
        let cells = line_cells(0, 0, 3, 0);
        assert_eq!(cells, vec![(0, 0), (1, 0), (2, 0), (3, 0)]);

        let diagonal = line_cells(2, 2, 0, 0);
        assert_eq!(diagonal.first(), Some(&(2, 2)));
        assert_eq!(diagonal.last(), Some(&(0, 0)));
        assert_eq!(diagonal.len(), 3);
    }

    #[test]
    fn test_footprint_cells_filled() {
        let map = GridCostmap::new(20, 20, 0.1, 0.0, 0.0);
        let cells = footprint_cells(
            Pose::new(1.0, 1.0, 0.0),
            &square_footprint(0.25),
            &map,
            true,
        );

        // A 0.5 m square at 0.1 m resolution covers a 5x5..6x6 block
        assert!(cells.contains(&(10, 10)));
        assert!(cells.len() >= 25);
        // Interior cell present only because of the fill
        let outline = footprint_cells(
            Pose::new(1.0, 1.0, 0.0),
            &square_footprint(0.25),
            &map,
            false,
        );
        assert!(outline.len() < cells.len());
        assert!(!outline.contains(&(10, 10)));
    }

    #[test]
    fn test_footprint_off_map_is_empty() {
        let map = GridCostmap::new(10, 10, 0.1, 0.0, 0.0);
        let cells = footprint_cells(
            Pose::new(0.01, 0.01, 0.0),
            &square_footprint(0.25),
            &map,
            true,
        );
        assert!(cells.is_empty());
    }
}
