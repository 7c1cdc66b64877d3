//! Sampling-based local trajectory planner.
//!
//! Each control tick the planner rebuilds two distance fields from the
//! global plan, rolls out candidate velocity samples over a short horizon,
//! scores them against the fields and the costmap, and converts the best
//! candidate into a drive command. Stateful oscillation and escape records
//! keep the search from dithering between directions.

mod oscillation;
mod rollout;

pub use oscillation::{EscapeState, OscillationState};

use std::mem;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::config::PlannerConfig;
use crate::core::{Point, Pose, Velocity};
use crate::costmap::{costs, Costmap};
use crate::footprint::{footprint_cells, min_max_radii};
use crate::map_grid::MapGrid;
use crate::trajectory::{sentinel, Trajectory};
use crate::world_model::WorldModel;

/// Configuration snapshot as the planner uses it: sample counts coerced,
/// scoring weights resolution-scaled, the strafe velocity list parsed.
#[derive(Clone, Debug)]
pub(crate) struct ActiveConfig {
    pub(crate) cfg: PlannerConfig,
    pub(crate) y_vels: Vec<f64>,
}

impl ActiveConfig {
    fn new(mut cfg: PlannerConfig, resolution: f64) -> Self {
        if cfg.vx_samples == 0 {
            warn!("vx_samples must be positive, sampling one forward velocity instead");
            cfg.vx_samples = 1;
        }
        if cfg.vtheta_samples == 0 {
            warn!("vtheta_samples must be positive, sampling one angular velocity instead");
            cfg.vtheta_samples = 1;
        }
        if cfg.vy_samples == 0 {
            cfg.vy_samples = 1;
        }

        if cfg.meter_scoring {
            // express the distance weights in meters rather than cells
            cfg.pdist_scale *= resolution;
            cfg.gdist_scale *= resolution;
            cfg.occdist_scale *= resolution;
        }

        let y_vels = cfg.parse_y_vels();
        Self { cfg, y_vels }
    }

    /// Upper bound on rollout steps under the current limits, used to
    /// preallocate trajectory point buffers.
    fn max_rollout_steps(&self) -> usize {
        let c = &self.cfg;
        let vmag = c.max_vel_x.abs().max(c.min_vel_x.abs()).hypot(c.max_vel_y.abs());
        let translational = vmag * c.sim_time / c.sim_granularity;
        let angular =
            c.max_vel_theta.abs().max(c.min_vel_theta.abs()) / c.angular_sim_granularity;
        let fixed = c.sim_time / c.sim_granularity;
        (translational.max(angular).max(fixed) + 1.5) as usize
    }
}

/// Admissible velocity ranges for one search tick.
#[derive(Clone, Copy, Debug, PartialEq)]
struct VelocityWindow {
    min_vx: f64,
    max_vx: f64,
    min_vy: f64,
    max_vy: f64,
    min_vtheta: f64,
    max_vtheta: f64,
}

/// Compute the admissible velocity envelope around the current velocity.
///
/// With a final goal in view both translational maxima shrink so the robot
/// can stop at the goal within one horizon. With the dynamic window on,
/// each axis is further intersected with the band reachable within one
/// control period; otherwise only the upper bounds shrink over the full
/// horizon. The lateral window is centered on the forward velocity.
fn velocity_window(c: &PlannerConfig, vel: Velocity, final_goal_dist: Option<f64>) -> VelocityWindow {
    let mut max_vx = c.max_vel_x;
    let mut max_vy = c.max_vel_y;
    if let Some(dist) = final_goal_dist {
        max_vx = max_vx.min(dist / c.sim_time);
        max_vy = max_vy.min(dist / c.sim_time);
    }
    let mut min_vx = c.min_vel_x.min(max_vx);
    let mut min_vy = -max_vy;

    let (min_vtheta, max_vtheta);
    if c.dwa {
        max_vx = max_vx.min(vel.vx + c.acc_lim_x * c.sim_period).max(c.min_vel_x);
        min_vx = min_vx.max(vel.vx - c.acc_lim_x * c.sim_period);

        max_vy = max_vy.min(vel.vx + c.acc_lim_y * c.sim_period);
        min_vy = min_vy.max(vel.vx - c.acc_lim_y * c.sim_period);

        max_vtheta = c.max_vel_theta.min(vel.vtheta + c.acc_lim_theta * c.sim_period);
        min_vtheta = c.min_vel_theta.max(vel.vtheta - c.acc_lim_theta * c.sim_period);
    } else {
        max_vx = max_vx.min(vel.vx + c.acc_lim_x * c.sim_time).max(c.min_vel_x);

        max_vtheta = c.max_vel_theta.min(vel.vtheta + c.acc_lim_theta * c.sim_time);
        min_vtheta = c.min_vel_theta.max(vel.vtheta - c.acc_lim_theta * c.sim_time);
    }

    VelocityWindow {
        min_vx,
        max_vx,
        min_vy,
        max_vy,
        min_vtheta,
        max_vtheta,
    }
}

/// Per-cell cost breakdown returned by
/// [`TrajectoryPlanner::get_cell_costs`].
#[derive(Clone, Copy, Debug)]
pub struct CellCosts {
    pub path_cost: f64,
    pub goal_cost: f64,
    pub occ_cost: f64,
    pub total_cost: f64,
}

/// The local planner.
///
/// Owns the distance fields and the oscillation/escape state; reads the
/// costmap and the world model through injected references. All planning
/// happens synchronously inside [`TrajectoryPlanner::find_best_path`];
/// only [`TrajectoryPlanner::reconfigure`] may be called from another
/// thread.
pub struct TrajectoryPlanner<'a, C: Costmap, W: WorldModel> {
    costmap: &'a C,
    world_model: &'a W,
    footprint: Vec<Point>,
    inscribed_radius: f64,
    circumscribed_radius: f64,

    config: Mutex<ActiveConfig>,

    pub(crate) path_map: MapGrid,
    pub(crate) goal_map: MapGrid,
    pub(crate) global_plan: Vec<Pose>,
    final_goal: Option<Point>,

    oscillation: OscillationState,
    escape: EscapeState,

    // Reusable rollout buffers; the sampler swaps them instead of copying
    // point lists.
    best_buf: Trajectory,
    scratch_buf: Trajectory,
}

impl<'a, C: Costmap, W: WorldModel> TrajectoryPlanner<'a, C, W> {
    /// Create a planner over a costmap and world model.
    ///
    /// `footprint` is the robot polygon in the body frame; an empty or
    /// degenerate polygon describes a point robot.
    pub fn new(
        costmap: &'a C,
        world_model: &'a W,
        footprint: Vec<Point>,
        config: PlannerConfig,
    ) -> Self {
        let (inscribed_radius, circumscribed_radius) = min_max_radii(&footprint);
        let active = ActiveConfig::new(config, costmap.resolution());
        let capacity = active.max_rollout_steps();

        Self {
            costmap,
            world_model,
            footprint,
            inscribed_radius,
            circumscribed_radius,
            config: Mutex::new(active),
            path_map: MapGrid::new(costmap.size_x(), costmap.size_y()),
            goal_map: MapGrid::new(costmap.size_x(), costmap.size_y()),
            global_plan: Vec::new(),
            final_goal: None,
            oscillation: OscillationState::default(),
            escape: EscapeState::default(),
            best_buf: Trajectory::with_capacity(capacity),
            scratch_buf: Trajectory::with_capacity(capacity),
        }
    }

    /// Atomically replace the configuration.
    ///
    /// Safe to call from a parameter-update thread; a tick in progress
    /// keeps the snapshot it started with.
    pub fn reconfigure(&self, config: PlannerConfig) {
        let mut guard = self.config.lock();
        *guard = ActiveConfig::new(config, self.costmap.resolution());
    }

    /// Replace the global plan.
    ///
    /// With `recompute` both distance fields are rebuilt immediately;
    /// otherwise they refresh on the next [`TrajectoryPlanner::find_best_path`].
    pub fn update_plan(&mut self, plan: &[Pose], recompute: bool) {
        self.global_plan.clear();
        self.global_plan.extend_from_slice(plan);
        self.final_goal = plan.last().map(|p| p.position());

        if recompute {
            self.path_map.reset();
            self.goal_map.reset();
            self.path_map.set_target_cells(self.costmap, &self.global_plan);
            self.goal_map.set_local_goal(self.costmap, &self.global_plan);
            debug!("path and goal distance fields recomputed");
        }
    }

    /// Score one velocity sample from the given state. Negative results
    /// are the failure values of [`sentinel`](crate::trajectory::sentinel).
    pub fn score_trajectory(&self, pose: Pose, vel: Velocity, sample: Velocity) -> f64 {
        let cfg = self.config.lock();
        let mut traj = Trajectory::with_capacity(cfg.max_rollout_steps());
        let impossible_cost = f64::from(self.path_map.obstacle_cost());
        self.rollout(pose, vel, sample, impossible_cost, &cfg, &mut traj);
        traj.cost
    }

    /// Whether one velocity sample yields a legal trajectory.
    pub fn check_trajectory(&self, pose: Pose, vel: Velocity, sample: Velocity) -> bool {
        let cost = self.score_trajectory(pose, vel, sample);
        if cost >= 0.0 {
            return true;
        }
        warn!(
            "illegal trajectory ({:.2}, {:.2}, {:.2}), cost {:.2}",
            sample.vx, sample.vy, sample.vtheta, cost
        );
        false
    }

    /// Run one planning tick: rebuild the distance fields, search the
    /// velocity space and return the best trajectory with its drive
    /// command. An illegal best trajectory yields a zero command.
    pub fn find_best_path(&mut self, pose: Pose, vel: Velocity) -> (Trajectory, Velocity) {
        self.path_map.ensure_size(self.costmap);
        self.goal_map.ensure_size(self.costmap);
        self.path_map.reset();
        self.goal_map.reset();

        // Cells currently under the robot must not read as obstacles, or
        // the fill would wall the robot in at its own position.
        for (cx, cy) in footprint_cells(pose, &self.footprint, self.costmap, true) {
            self.path_map.cell_mut(cx, cy).within_robot = true;
        }

        self.path_map.set_target_cells(self.costmap, &self.global_plan);
        self.goal_map.set_local_goal(self.costmap, &self.global_plan);
        debug!("path and goal distance fields rebuilt");

        let cfg = self.config.lock().clone();
        let best = self.search_velocity_space(pose, vel, &cfg);

        let command = if best.cost < 0.0 {
            Velocity::ZERO
        } else {
            Velocity::new(best.vx, best.vy, best.vtheta)
        };
        (best, command)
    }

    /// World coordinates of the local goal selected by the goal field.
    pub fn get_local_goal(&self) -> (f64, f64) {
        self.goal_map.local_goal()
    }

    /// Cost breakdown of one cell, or `None` when the cell lies under the
    /// robot, is blocked or unreachable, or carries inscribed-or-worse
    /// occupancy.
    pub fn get_cell_costs(&self, cx: u32, cy: u32) -> Option<CellCosts> {
        let cell = self.path_map.cell(cx, cy);
        if cell.within_robot {
            return None;
        }
        let occ_cost = f64::from(self.costmap.get_cost(cx, cy));
        if cell.target_dist == self.path_map.obstacle_cost()
            || cell.target_dist == self.path_map.unreachable_cost()
            || occ_cost >= f64::from(costs::INSCRIBED_INFLATED)
        {
            return None;
        }

        let path_cost = f64::from(cell.target_dist);
        let goal_cost = f64::from(self.goal_map.cell(cx, cy).target_dist);
        let guard = self.config.lock();
        let c = &guard.cfg;
        Some(CellCosts {
            path_cost,
            goal_cost,
            occ_cost,
            total_cost: c.pdist_scale * path_cost + c.gdist_scale * goal_cost
                + c.occdist_scale * occ_cost,
        })
    }

    /// Current oscillation flags (advisory).
    pub fn oscillation(&self) -> &OscillationState {
        &self.oscillation
    }

    /// Whether the planner is in a reverse escape.
    pub fn is_escaping(&self) -> bool {
        self.escape.escaping
    }

    pub(crate) fn footprint_cost(&self, pose: Pose) -> f64 {
        self.world_model.footprint_cost(
            pose,
            &self.footprint,
            self.inscribed_radius,
            self.circumscribed_radius,
        )
    }

    /// Search the velocity space and return the best candidate.
    fn search_velocity_space(&mut self, pose: Pose, vel: Velocity, cfg: &ActiveConfig) -> Trajectory {
        let c = &cfg.cfg;

        let final_goal_dist = self
            .final_goal
            .map(|g| (g.x - pose.x).hypot(g.y - pose.y));
        let w = velocity_window(c, vel, final_goal_dist);

        let dvx = (w.max_vx - w.min_vx) / (c.vx_samples - 1) as f64;
        let dvy = (w.max_vy - w.min_vy) / (c.vy_samples - 1) as f64;
        let dvtheta = (w.max_vtheta - w.min_vtheta) / (c.vtheta_samples - 1) as f64;

        let impossible_cost = f64::from(self.path_map.obstacle_cost());

        let mut best = mem::take(&mut self.best_buf);
        let mut comp = mem::take(&mut self.scratch_buf);
        best.cost = -1.0;
        comp.cost = -1.0;

        // Stationary baseline: candidates must make goal-ward progress
        // relative to simply staying put.
        let mut reference = Trajectory::with_capacity(cfg.max_rollout_steps());
        self.rollout(pose, vel, Velocity::ZERO, impossible_cost, cfg, &mut reference);

        // While escaping, no forward or lateral sampling: the robot keeps
        // backing up until the escape anchor releases it.
        if !self.escape.escaping {
            let mut vx_samp = w.min_vx;
            for _ in 0..c.vx_samples {
                self.rollout(
                    pose,
                    vel,
                    Velocity::new(vx_samp, 0.0, 0.0),
                    impossible_cost,
                    cfg,
                    &mut comp,
                );
                if comp.cost >= 0.0
                    && (comp.cost < best.cost || best.cost < 0.0)
                    && comp.goal_cost < reference.goal_cost
                {
                    mem::swap(&mut best, &mut comp);
                }

                let mut vtheta_samp = w.min_vtheta;
                for _ in 0..c.vtheta_samples.saturating_sub(1) {
                    self.rollout(
                        pose,
                        vel,
                        Velocity::new(vx_samp, 0.0, vtheta_samp),
                        impossible_cost,
                        cfg,
                        &mut comp,
                    );
                    if comp.cost >= 0.0
                        && (comp.cost < best.cost || best.cost < 0.0)
                        && comp.goal_cost < reference.goal_cost
                    {
                        mem::swap(&mut best, &mut comp);
                    }
                    vtheta_samp += dvtheta;
                }
                vx_samp += dvx;
            }

            if c.holonomic_robot {
                // Pure strafes
                let mut vy_samp = w.min_vy;
                for _ in 0..c.vy_samples.saturating_sub(1) {
                    if vy_samp.abs() < 0.01 {
                        vy_samp += dvy;
                        continue;
                    }
                    self.rollout(
                        pose,
                        vel,
                        Velocity::new(0.0, vy_samp, 0.0),
                        impossible_cost,
                        cfg,
                        &mut comp,
                    );
                    if comp.cost >= 0.0
                        && (comp.cost < best.cost || best.cost < 0.0)
                        && comp.goal_cost < reference.goal_cost
                    {
                        mem::swap(&mut best, &mut comp);
                    }
                    vy_samp += dvy;
                }

                // Strafes combined with gentle forward motion
                let mut vx_samp = w.min_vx / 2.0;
                for _ in 0..(c.vx_samples / 2) {
                    let mut vy_samp = w.min_vy;
                    for _ in 0..c.vy_samples.saturating_sub(1) {
                        if vy_samp.abs() < 0.01 {
                            vy_samp += dvy;
                            continue;
                        }
                        self.rollout(
                            pose,
                            vel,
                            Velocity::new(vx_samp, vy_samp, 0.0),
                            impossible_cost,
                            cfg,
                            &mut comp,
                        );
                        if comp.cost >= 0.0
                            && (comp.cost < best.cost || best.cost < 0.0)
                            && comp.goal_cost < reference.goal_cost
                        {
                            mem::swap(&mut best, &mut comp);
                        }
                        vy_samp += dvy;
                    }
                    vx_samp += dvx;
                }
            }
        }

        // In-place rotations. Position never changes here, so the baseline
        // gate admits ties: a rotation cannot improve the goal sub-score,
        // it only must not regress it.
        let mut vtheta_samp = w.min_vtheta;
        for _ in 0..c.vtheta_samples {
            // the base cannot execute arbitrarily slow in-place rotations
            let vtheta_limited = if vtheta_samp > 0.0 {
                vtheta_samp.max(c.min_in_place_vel_theta)
            } else {
                vtheta_samp.min(-c.min_in_place_vel_theta)
            };

            self.rollout(
                pose,
                vel,
                Velocity::new(0.0, 0.0, vtheta_limited),
                impossible_cost,
                cfg,
                &mut comp,
            );

            let improves_both = comp.cost < best.cost && comp.goal_cost < best.goal_cost;
            if comp.cost >= 0.0
                && (improves_both || best.cost < 0.0)
                && (vtheta_samp > dvtheta || vtheta_samp < -dvtheta)
                && comp.goal_cost <= reference.goal_cost
            {
                mem::swap(&mut best, &mut comp);
            }
            vtheta_samp += dvtheta;
        }

        if best.cost >= 0.0 {
            self.settle_state(&best, pose, c);
            return self.conclude(best, comp);
        }

        // Nothing legal so far: for holonomic bases, try the configured
        // strafe velocities, skipping directions already tried without
        // progress, and prefer the one whose lookahead point sits closest
        // to the goal.
        if c.holonomic_robot {
            let mut heading_dist = f64::MAX;
            for &vy_samp in &cfg.y_vels {
                self.rollout(
                    pose,
                    vel,
                    Velocity::new(0.0, vy_samp, 0.0),
                    impossible_cost,
                    cfg,
                    &mut comp,
                );
                if comp.cost >= 0.0 && (comp.cost <= best.cost || best.cost < 0.0) {
                    if let Some(end) = comp.end_point() {
                        let ahead_x = end.x + c.heading_lookahead * end.theta.cos();
                        let ahead_y = end.y + c.heading_lookahead * end.theta.sin();
                        if let Some((cx, cy)) = self.costmap.world_to_map(ahead_x, ahead_y) {
                            let ahead_gdist = f64::from(self.goal_map.cell(cx, cy).target_dist);
                            if ahead_gdist < heading_dist {
                                if vy_samp > 0.0 && !self.oscillation.stuck_left_strafe {
                                    mem::swap(&mut best, &mut comp);
                                    heading_dist = ahead_gdist;
                                } else if vy_samp < 0.0 && !self.oscillation.stuck_right_strafe {
                                    mem::swap(&mut best, &mut comp);
                                    heading_dist = ahead_gdist;
                                }
                            }
                        }
                    }
                }
            }

            if best.cost >= 0.0 {
                self.settle_state(&best, pose, c);
                return self.conclude(best, comp);
            }
        }

        // Last resort: back up slowly. The candidate is emitted whether or
        // not it scored, so the robot always has a way out.
        self.rollout(
            pose,
            vel,
            Velocity::new(c.backup_vel, 0.0, 0.0),
            impossible_cost,
            cfg,
            &mut comp,
        );
        mem::swap(&mut best, &mut comp);

        self.oscillation.maybe_reset(pose, c.oscillation_reset_dist);

        // Only enter escape mode when the candidate reached the goal field
        if !self.escape.escaping && best.cost > sentinel::NO_PATH {
            self.escape.begin(pose);
        }
        self.escape.maybe_reset(pose, c.escape_reset_dist, c.escape_reset_theta);

        // A blocked footprint must not pin the robot in place; back up
        // anyway.
        if best.cost == sentinel::FOOTPRINT_HIT {
            best.cost = 1.0;
        }

        if self.oscillation.any_stuck() {
            debug!("all rotation and strafe directions exhausted, backing up");
        }

        self.conclude(best, comp)
    }

    /// Classify the selection and run the reset checks.
    fn settle_state(&mut self, best: &Trajectory, pose: Pose, c: &PlannerConfig) {
        self.oscillation.note_selection(best, pose);
        self.oscillation.maybe_reset(pose, c.oscillation_reset_dist);
        self.escape
            .maybe_reset(pose, c.escape_reset_dist, c.escape_reset_theta);
    }

    /// Return the selected trajectory and park the buffers for the next
    /// tick.
    fn conclude(&mut self, best: Trajectory, comp: Trajectory) -> Trajectory {
        let result = best.clone();
        self.best_buf = best;
        self.scratch_buf = comp;
        result
    }
}
