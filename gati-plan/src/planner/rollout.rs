//! Forward simulation and scoring of one velocity sample.

use crate::core::{shortest_angular_distance, sq, step_pose, step_velocity, Pose, Velocity};
use crate::costmap::Costmap;
use crate::trajectory::{sentinel, Trajectory};
use crate::world_model::WorldModel;

use super::{ActiveConfig, TrajectoryPlanner};

/// Plan poses to look past the nearest one when extracting the target
/// heading.
const LOOK_AHEAD_SAMPLES: usize = 1;

impl<'a, C: Costmap, W: WorldModel> TrajectoryPlanner<'a, C, W> {
    /// Simulate `sample` from the given state and score it into `traj`.
    ///
    /// The step count spans the horizon at the configured granularity:
    /// driven by the sample magnitudes normally, fixed when heading
    /// scoring needs a predictable final step. At least one step always
    /// runs so the current position is scored.
    pub(crate) fn rollout(
        &self,
        pose: Pose,
        vel: Velocity,
        sample: Velocity,
        impossible_cost: f64,
        cfg: &ActiveConfig,
        traj: &mut Trajectory,
    ) {
        let c = &cfg.cfg;
        let accel = c.accel_limits();

        let mut p = pose;
        let mut v = vel;

        let vmag = sample.linear_magnitude();
        let num_steps = if !c.heading_scoring {
            ((vmag * c.sim_time / c.sim_granularity)
                .max(sample.vtheta.abs() / c.angular_sim_granularity)
                + 0.5) as u32
        } else {
            (c.sim_time / c.sim_granularity + 0.5) as u32
        }
        .max(1);
        let dt = c.sim_time / f64::from(num_steps);

        traj.reset_points();
        traj.vx = sample.vx;
        traj.vy = sample.vy;
        traj.vtheta = sample.vtheta;
        traj.cost = sentinel::UNSCORED;
        traj.path_dist = -2.0;

        let mut path_dist = 0.0;
        let mut goal_dist = 0.0;
        let mut occ_cost: f64 = 0.0;
        let mut heading_diff = 0.0;

        for i in 0..num_steps {
            let Some((cell_x, cell_y)) = self.costmap.world_to_map(p.x, p.y) else {
                traj.cost = sentinel::OFF_MAP;
                return;
            };

            let footprint_cost = self.footprint_cost(p);
            if footprint_cost < 0.0 {
                traj.cost = sentinel::FOOTPRINT_HIT;
                return;
            }

            occ_cost = occ_cost
                .max(footprint_cost)
                .max(f64::from(self.costmap.get_cost(cell_x, cell_y)));

            if c.simple_attractor {
                // blind pull toward the plan end, no field lookups
                if let Some(end) = self.global_plan.last() {
                    goal_dist = sq(p.x - end.x) + sq(p.y - end.y);
                }
            } else {
                let scoring_step = if c.heading_scoring {
                    // heading is judged where the trajectory ends up
                    i == num_steps - 1
                } else {
                    true
                };

                if scoring_step {
                    if c.heading_scoring {
                        heading_diff = self.heading_diff(p, &mut goal_dist, &mut path_dist);
                    } else {
                        path_dist = f64::from(self.path_map.cell(cell_x, cell_y).target_dist);
                        goal_dist = f64::from(self.goal_map.cell(cell_x, cell_y).target_dist);
                    }

                    // a point with no clear path to the goal or the plan
                    // invalidates the whole candidate
                    if impossible_cost <= goal_dist || impossible_cost <= path_dist {
                        traj.cost = sentinel::NO_PATH;
                        return;
                    }

                    traj.path_dist = path_dist;
                    if c.path_distance_max > 0.0 && path_dist <= c.path_distance_max {
                        // close enough to the reference path; stop pulling
                        path_dist = 0.0;
                    }

                    if heading_diff.abs() < 0.2 {
                        heading_diff = 0.0;
                    }
                }
            }

            traj.add_point(p);

            v.vx = step_velocity(sample.vx, v.vx, accel.ax, dt);
            v.vy = step_velocity(sample.vy, v.vy, accel.ay, dt);
            v.vtheta = step_velocity(sample.vtheta, v.vtheta, accel.atheta, dt);
            p = step_pose(p, v, dt);
        }

        let cost = if !c.heading_scoring {
            c.pdist_scale * path_dist + c.gdist_scale * goal_dist + c.occdist_scale * occ_cost
        } else {
            c.occdist_scale * occ_cost
                + c.pdist_scale * path_dist
                + c.hdiff_scale * heading_diff
                + c.gdist_scale * goal_dist
        };

        traj.cost = cost;
        traj.goal_cost = c.gdist_scale * goal_dist;
    }

    /// Heading difference between the robot and the plan near its current
    /// position.
    ///
    /// Finds the plan pose closest to `p`, looks a step further along the
    /// plan and compares headings. As side effects writes the distance to
    /// the plan into `path_dist` and the remaining along-plan distance into
    /// `goal_dist`; the latter carries a small index-based bias so that of
    /// two equally distant positions the one further along the plan wins.
    pub(crate) fn heading_diff(&self, p: Pose, goal_dist: &mut f64, path_dist: &mut f64) -> f64 {
        let plan = &self.global_plan;
        if plan.is_empty() {
            // no plan to head along; poison the distances so the caller
            // discards the candidate
            *goal_dist = f64::MAX;
            *path_dist = f64::MAX;
            return 0.0;
        }
        let last = plan.len() - 1;

        let mut dist_to_path_min = 1e3;
        let mut i_closest = 0;
        for (i, pose) in plan[..last].iter().enumerate() {
            let dist_to_path = (pose.x - p.x).hypot(pose.y - p.y);
            if dist_to_path < dist_to_path_min {
                dist_to_path_min = dist_to_path;
                i_closest = i;
            }
        }

        let index_plan = (i_closest + LOOK_AHEAD_SAMPLES).min(last);

        let mut dist_to_goal = 0.0;
        for i in index_plan..last {
            dist_to_goal += (plan[i].x - plan[i + 1].x).hypot(plan[i].y - plan[i + 1].y);
        }

        *goal_dist = dist_to_goal + (last - index_plan) as f64 / plan.len() as f64;
        if *goal_dist == 0.0 {
            *goal_dist = (plan[last].x - p.x).hypot(plan[last].y - p.y);
        }
        *path_dist = dist_to_path_min;

        shortest_angular_distance(p.theta, plan[index_plan].theta).abs()
    }
}
