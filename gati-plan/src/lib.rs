//! # Gati-Plan: Sampling-Based Local Trajectory Planner
//!
//! A local planner for indoor mobile robots: given the robot's pose and
//! velocity, a global reference path and an occupancy costmap, it selects
//! a short-horizon velocity command that makes progress along the path
//! while avoiding obstacles.
//!
//! Each control tick the planner:
//!
//! 1. Rebuilds two distance fields over the costmap — cell distance to the
//!    global plan and to the local goal
//! 2. Rolls out candidate `(vx, vy, vtheta)` samples over the horizon,
//!    integrating the nonholonomic model under acceleration limits
//! 3. Scores each rollout against the fields, the costmap and the robot
//!    footprint, and keeps the cheapest candidate that makes goal-ward
//!    progress
//! 4. Falls back to in-place rotation, configured strafes and finally a
//!    slow reverse escape when nothing legal moves forward
//!
//! Oscillation flags and an escape anchor persist across ticks so the
//! planner cannot dither between opposing rotation or strafe directions
//! while standing still.
//!
//! ## Coordinate Frame
//!
//! All coordinates follow the ROS REP-103 convention: X-forward, Y-left,
//! counter-clockwise positive rotation. Distance-field values are in
//! cells; the `meter_scoring` option rescales the scoring weights to
//! meters.
//!
//! ## Quick Start
//!
//! ```rust
//! use gati_plan::{
//!     CostmapModel, GridCostmap, PlannerConfig, Pose, TrajectoryPlanner, Velocity,
//! };
//!
//! let costmap = GridCostmap::new(100, 100, 0.05, 0.0, 0.0);
//! let world_model = CostmapModel::new(&costmap);
//! let mut planner =
//!     TrajectoryPlanner::new(&costmap, &world_model, Vec::new(), PlannerConfig::default());
//!
//! let plan: Vec<Pose> = (0..20).map(|i| Pose::new(0.25 + 0.2 * i as f64, 0.25, 0.0)).collect();
//! planner.update_plan(&plan, false);
//!
//! let (trajectory, command) = planner.find_best_path(Pose::new(0.25, 0.25, 0.0), Velocity::ZERO);
//! if trajectory.is_legal() {
//!     println!("drive at ({:.2}, {:.2}, {:.2})", command.vx, command.vy, command.vtheta);
//! }
//! ```
//!
//! ## Collaborators
//!
//! The costmap and the footprint collision oracle are consumed through the
//! [`Costmap`] and [`WorldModel`] traits; [`GridCostmap`] and
//! [`CostmapModel`] are ready-made implementations for embedders without
//! their own.

pub mod config;
pub mod core;
pub mod costmap;
pub mod error;
pub mod footprint;
pub mod map_grid;
pub mod planner;
pub mod trajectory;
pub mod world_model;

// Re-export main types at crate root
pub use config::PlannerConfig;
pub use self::core::{AccelLimits, Point, Pose, Velocity};
pub use costmap::{Costmap, GridCostmap};
pub use error::{GatiError, Result};
pub use map_grid::{MapCell, MapGrid};
pub use planner::{CellCosts, TrajectoryPlanner};
pub use trajectory::Trajectory;
pub use world_model::{CostmapModel, WorldModel};
