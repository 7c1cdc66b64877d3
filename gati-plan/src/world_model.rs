//! World model interface for footprint collision queries.
//!
//! The planner never inspects obstacle data directly; it asks a world model
//! whether the robot polygon placed at a pose intersects lethal cost.

use crate::core::{Point, Pose};
use crate::costmap::{costs, Costmap};
use crate::footprint::oriented_footprint;

/// Collision oracle for a robot footprint.
pub trait WorldModel {
    /// Cost of placing the footprint at `pose`.
    ///
    /// Non-negative values are the worst cell cost under the footprint;
    /// negative values mean the placement is illegal. The radii let
    /// grid-based implementations shortcut the polygon test.
    fn footprint_cost(
        &self,
        pose: Pose,
        footprint: &[Point],
        inscribed_radius: f64,
        circumscribed_radius: f64,
    ) -> f64;
}

/// World model backed directly by a costmap: the footprint outline is
/// ray-traced cell by cell.
pub struct CostmapModel<'a, C: Costmap> {
    costmap: &'a C,
}

impl<'a, C: Costmap> CostmapModel<'a, C> {
    /// Create a world model over a costmap.
    pub fn new(costmap: &'a C) -> Self {
        Self { costmap }
    }

    /// Cost of a single cell, or -1.0 when the cell is lethal, inscribed
    /// or unknown.
    pub fn point_cost(&self, cx: u32, cy: u32) -> f64 {
        let cost = self.costmap.get_cost(cx, cy);
        if cost == costs::LETHAL || cost == costs::INSCRIBED_INFLATED || cost == costs::NO_INFORMATION
        {
            return -1.0;
        }
        f64::from(cost)
    }

    /// Maximum cell cost along the segment between two cells, traversed
    /// with Bresenham's algorithm. Returns -1.0 as soon as any crossed
    /// cell is lethal, inscribed or unknown.
    pub fn line_cost(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> f64 {
        let (mut x, mut y) = (x0 as i64, y0 as i64);
        let (x1, y1) = (x1 as i64, y1 as i64);

        let dx = (x1 - x).abs();
        let dy = (y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx - dy;

        let mut line_cost: f64 = 0.0;
        loop {
            let point_cost = self.point_cost(x as u32, y as u32);
            if point_cost < 0.0 {
                return -1.0;
            }
            if point_cost > line_cost {
                line_cost = point_cost;
            }

            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }

        line_cost
    }
}

impl<'a, C: Costmap> WorldModel for CostmapModel<'a, C> {
    fn footprint_cost(
        &self,
        pose: Pose,
        footprint: &[Point],
        _inscribed_radius: f64,
        _circumscribed_radius: f64,
    ) -> f64 {
        let Some((cell_x, cell_y)) = self.costmap.world_to_map(pose.x, pose.y) else {
            return -1.0;
        };

        // A degenerate footprint describes a point robot
        if footprint.len() < 3 {
            let cost = self.costmap.get_cost(cell_x, cell_y);
            if cost == costs::NO_INFORMATION {
                return -2.0;
            }
            if cost == costs::LETHAL || cost == costs::INSCRIBED_INFLATED {
                return -1.0;
            }
            return f64::from(cost);
        }

        let oriented = oriented_footprint(pose, footprint);
        let mut cells = Vec::with_capacity(oriented.len());
        for p in &oriented {
            match self.costmap.world_to_map(p.x, p.y) {
                Some(cell) => cells.push(cell),
                None => return -1.0,
            }
        }

        let mut footprint_cost: f64 = 0.0;
        for i in 0..cells.len() {
            let (x0, y0) = cells[i];
            let (x1, y1) = cells[(i + 1) % cells.len()];
            let line_cost = self.line_cost(x0, y0, x1, y1);
            if line_cost < 0.0 {
                return -1.0;
            }
            footprint_cost = footprint_cost.max(line_cost);
        }

        footprint_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costmap::GridCostmap;

    fn square_footprint(half: f64) -> Vec<Point> {
        vec![
            Point::new(-half, -half),
            Point::new(half, -half),
            Point::new(half, half),
            Point::new(-half, half),
        ]
    }

    #[test]
    fn test_point_cost_sentinels() {
        let mut map = GridCostmap::new(5, 5, 1.0, 0.0, 0.0);
        map.set_cost(1, 1, costs::LETHAL);
        map.set_cost(2, 2, costs::INSCRIBED_INFLATED);
        map.set_cost(3, 3, costs::NO_INFORMATION);
        map.set_cost(4, 4, 42);
        let model = CostmapModel::new(&map);

        assert_eq!(model.point_cost(0, 0), 0.0);
        assert_eq!(model.point_cost(1, 1), -1.0);
        assert_eq!(model.point_cost(2, 2), -1.0);
        assert_eq!(model.point_cost(3, 3), -1.0);
        assert_eq!(model.point_cost(4, 4), 42.0);
    }

    #[test]
    fn test_line_cost_takes_maximum() {
        let mut map = GridCostmap::new(10, 10, 1.0, 0.0, 0.0);
        map.set_cost(3, 0, 17);
        map.set_cost(5, 0, 99);
        let model = CostmapModel::new(&map);

        assert_eq!(model.line_cost(0, 0, 9, 0), 99.0);
        assert_eq!(model.line_cost(0, 0, 2, 0), 0.0);
    }

    #[test]
    fn test_line_cost_blocked() {
        let mut map = GridCostmap::new(10, 10, 1.0, 0.0, 0.0);
        map.set_cost(4, 4, costs::LETHAL);
        let model = CostmapModel::new(&map);

        assert_eq!(model.line_cost(0, 0, 9, 9), -1.0);
        assert!(model.line_cost(0, 1, 0, 9) >= 0.0);
    }

    #[test]
    fn test_footprint_cost_free_space() {
        let map = GridCostmap::new(20, 20, 0.1, 0.0, 0.0);
        let model = CostmapModel::new(&map);
        let cost = model.footprint_cost(
            Pose::new(1.0, 1.0, 0.3),
            &square_footprint(0.2),
            0.2,
            0.28,
        );
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn test_footprint_cost_hits_obstacle() {
        let mut map = GridCostmap::new(20, 20, 0.1, 0.0, 0.0);
        map.set_cost(10, 10, costs::LETHAL);
        let model = CostmapModel::new(&map);
        let cost = model.footprint_cost(
            Pose::new(1.05, 0.85, 0.0),
            &square_footprint(0.2),
            0.2,
            0.28,
        );
        assert!(cost < 0.0);
    }

    #[test]
    fn test_footprint_cost_off_map() {
        let map = GridCostmap::new(10, 10, 0.1, 0.0, 0.0);
        let model = CostmapModel::new(&map);
        let cost = model.footprint_cost(Pose::new(5.0, 5.0, 0.0), &square_footprint(0.2), 0.2, 0.28);
        assert!(cost < 0.0);
    }

    #[test]
    fn test_point_robot_cell_check() {
        let mut map = GridCostmap::new(10, 10, 1.0, 0.0, 0.0);
        map.set_cost(2, 0, costs::LETHAL);
        let model = CostmapModel::new(&map);

        assert_eq!(model.footprint_cost(Pose::new(0.5, 0.5, 0.0), &[], 0.0, 0.0), 0.0);
        assert!(model.footprint_cost(Pose::new(2.5, 0.5, 0.0), &[], 0.0, 0.0) < 0.0);
    }
}
