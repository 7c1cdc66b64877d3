//! Distance fields over the costmap.
//!
//! Two grids back the trajectory scorer: a path map holding the distance
//! in cells from every free cell to the nearest cell of the global plan,
//! and a goal map holding the distance to the local goal cell. Both are
//! rebuilt each control tick with a 4-connected breadth-first fill seeded
//! from the plan.

use log::{debug, warn};

use crate::core::Pose;
use crate::costmap::{costs, Costmap};

/// One cell of a distance field.
#[derive(Clone, Copy, Debug)]
pub struct MapCell {
    /// Distance to the nearest target cell, in cells. Two values above the
    /// reachable range are reserved: [`MapGrid::obstacle_cost`] and
    /// [`MapGrid::unreachable_cost`].
    pub target_dist: u32,
    /// The cell lay under the robot footprint when the field was built.
    /// Only meaningful in the path map.
    pub within_robot: bool,
}

/// Dense distance field with the costmap's dimensions.
#[derive(Clone, Debug)]
pub struct MapGrid {
    size_x: u32,
    size_y: u32,
    cells: Vec<MapCell>,
    /// World coordinates of the local goal cell chosen by
    /// [`MapGrid::set_local_goal`].
    goal: (f64, f64),
}

impl MapGrid {
    /// Create a grid with every cell unreachable.
    pub fn new(size_x: u32, size_y: u32) -> Self {
        let unreachable = size_x * size_y + 1;
        Self {
            size_x,
            size_y,
            cells: vec![
                MapCell {
                    target_dist: unreachable,
                    within_robot: false,
                };
                (size_x * size_y) as usize
            ],
            goal: (0.0, 0.0),
        }
    }

    /// Grid width in cells.
    pub fn size_x(&self) -> u32 {
        self.size_x
    }

    /// Grid height in cells.
    pub fn size_y(&self) -> u32 {
        self.size_y
    }

    /// Sentinel distance marking a cell blocked by an obstacle.
    #[inline]
    pub fn obstacle_cost(&self) -> u32 {
        self.size_x * self.size_y
    }

    /// Sentinel distance for cells the fill never reached.
    #[inline]
    pub fn unreachable_cost(&self) -> u32 {
        self.size_x * self.size_y + 1
    }

    /// World coordinates of the local goal recorded by the last
    /// [`MapGrid::set_local_goal`].
    pub fn local_goal(&self) -> (f64, f64) {
        self.goal
    }

    #[inline]
    fn index(&self, cx: u32, cy: u32) -> usize {
        (cy * self.size_x + cx) as usize
    }

    /// Read a cell.
    #[inline]
    pub fn cell(&self, cx: u32, cy: u32) -> MapCell {
        self.cells[self.index(cx, cy)]
    }

    /// Mutable access to a cell.
    #[inline]
    pub fn cell_mut(&mut self, cx: u32, cy: u32) -> &mut MapCell {
        let idx = self.index(cx, cy);
        &mut self.cells[idx]
    }

    /// Reset every cell to unreachable with `within_robot` cleared.
    pub fn reset(&mut self) {
        let unreachable = self.unreachable_cost();
        for cell in &mut self.cells {
            cell.target_dist = unreachable;
            cell.within_robot = false;
        }
    }

    /// Match the grid dimensions to the costmap, discarding contents on
    /// resize.
    pub fn ensure_size(&mut self, costmap: &dyn Costmap) {
        if self.size_x != costmap.size_x() || self.size_y != costmap.size_y() {
            *self = MapGrid::new(costmap.size_x(), costmap.size_y());
        }
    }

    /// Seed the field with every plan cell and fill distances from there.
    ///
    /// The plan is first densified to the costmap resolution so consecutive
    /// poses always land in adjacent or identical cells. Seeding stops at
    /// the first pose that leaves the map or enters unknown space after the
    /// plan has entered it.
    pub fn set_target_cells(&mut self, costmap: &dyn Costmap, plan: &[Pose]) {
        self.ensure_size(costmap);

        let adjusted = adjust_plan_resolution(plan, costmap.resolution());
        if adjusted.len() != plan.len() {
            debug!(
                "densified global plan from {} to {} points",
                plan.len(),
                adjusted.len()
            );
        }

        let mut queue = Vec::new();
        let mut started_path = false;
        for pose in &adjusted {
            match costmap.world_to_map(pose.x, pose.y) {
                Some((cx, cy)) if costmap.get_cost(cx, cy) != costs::NO_INFORMATION => {
                    self.cell_mut(cx, cy).target_dist = 0;
                    queue.push((cx, cy));
                    started_path = true;
                }
                _ => {
                    if started_path {
                        break;
                    }
                }
            }
        }

        if !started_path {
            warn!(
                "none of the {} points of the global plan fall on the local costmap",
                adjusted.len()
            );
            return;
        }

        self.fill_distances(costmap, queue);
    }

    /// Choose the local goal (the last plan pose still on the map) and fill
    /// distances from it. Records the goal's world coordinates for
    /// [`MapGrid::local_goal`].
    pub fn set_local_goal(&mut self, costmap: &dyn Costmap, plan: &[Pose]) {
        self.ensure_size(costmap);

        let adjusted = adjust_plan_resolution(plan, costmap.resolution());

        let mut local_goal: Option<(u32, u32)> = None;
        let mut started_path = false;
        for pose in &adjusted {
            match costmap.world_to_map(pose.x, pose.y) {
                Some((cx, cy)) if costmap.get_cost(cx, cy) != costs::NO_INFORMATION => {
                    local_goal = Some((cx, cy));
                    started_path = true;
                }
                _ => {
                    if started_path {
                        break;
                    }
                }
            }
        }

        let Some((gx, gy)) = local_goal else {
            warn!("the global plan passes over no valid local goal cell");
            return;
        };

        self.goal = costmap.map_to_world(gx, gy);
        self.cell_mut(gx, gy).target_dist = 0;
        self.fill_distances(costmap, vec![(gx, gy)]);
    }

    /// 4-connected breadth-first fill from the seeded cells.
    ///
    /// Lethal, inscribed and unknown cells take the obstacle sentinel and
    /// do not propagate, unless they were marked `within_robot` when the
    /// field was built.
    fn fill_distances(&mut self, costmap: &dyn Costmap, seeds: Vec<(u32, u32)>) {
        let obstacle = self.obstacle_cost();
        let mut queue = std::collections::VecDeque::from(seeds);

        while let Some((cx, cy)) = queue.pop_front() {
            let current_dist = self.cell(cx, cy).target_dist;

            let mut neighbors = [(0u32, 0u32); 4];
            let mut count = 0;
            if cx > 0 {
                neighbors[count] = (cx - 1, cy);
                count += 1;
            }
            if cx < self.size_x - 1 {
                neighbors[count] = (cx + 1, cy);
                count += 1;
            }
            if cy > 0 {
                neighbors[count] = (cx, cy - 1);
                count += 1;
            }
            if cy < self.size_y - 1 {
                neighbors[count] = (cx, cy + 1);
                count += 1;
            }

            for &(nx, ny) in &neighbors[..count] {
                let cell = self.cell(nx, ny);
                let cost = costmap.get_cost(nx, ny);
                if !cell.within_robot
                    && (cost == costs::LETHAL
                        || cost == costs::INSCRIBED_INFLATED
                        || cost == costs::NO_INFORMATION)
                {
                    self.cell_mut(nx, ny).target_dist = obstacle;
                    continue;
                }

                let new_dist = current_dist + 1;
                if new_dist < cell.target_dist {
                    self.cell_mut(nx, ny).target_dist = new_dist;
                    queue.push_back((nx, ny));
                }
            }
        }
    }
}

/// Densify a plan so consecutive poses are at most one cell apart.
///
/// Interpolates positions linearly; inserted poses reuse the heading of the
/// segment's end pose.
pub fn adjust_plan_resolution(plan: &[Pose], resolution: f64) -> Vec<Pose> {
    let Some(first) = plan.first() else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(plan.len());
    out.push(*first);

    let min_sq_resolution = resolution * resolution;
    let mut last = *first;

    for pose in &plan[1..] {
        let dx = pose.x - last.x;
        let dy = pose.y - last.y;
        let sq_dist = dx * dx + dy * dy;
        if sq_dist > min_sq_resolution {
            let steps = (sq_dist.sqrt() / resolution).ceil() as usize;
            for j in 1..steps {
                out.push(Pose::new(
                    last.x + j as f64 * dx / steps as f64,
                    last.y + j as f64 * dy / steps as f64,
                    pose.theta,
                ));
            }
        }
        out.push(*pose);
        last = *pose;
    }

    out
}
