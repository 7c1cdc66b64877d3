//! Configuration for the trajectory planner.

use crate::core::AccelLimits;
use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

/// Tuning parameters for [`TrajectoryPlanner`](crate::TrajectoryPlanner).
///
/// Every field has a sensible default for a small differential-drive base,
/// so partial TOML files work. Distances are meters, angles radians,
/// velocities m/s and rad/s.
#[derive(Clone, Debug, Deserialize)]
pub struct PlannerConfig {
    // --- Acceleration limits ---
    /// Forward acceleration limit in m/s² (default: 2.5)
    #[serde(default = "default_acc_lim_x")]
    pub acc_lim_x: f64,

    /// Lateral acceleration limit in m/s² (default: 2.5)
    #[serde(default = "default_acc_lim_y")]
    pub acc_lim_y: f64,

    /// Angular acceleration limit in rad/s² (default: 3.2)
    #[serde(default = "default_acc_lim_theta")]
    pub acc_lim_theta: f64,

    // --- Velocity limits ---
    /// Maximum forward velocity in m/s (default: 0.5)
    #[serde(default = "default_max_vel_x")]
    pub max_vel_x: f64,

    /// Minimum forward velocity in m/s (default: 0.1)
    #[serde(default = "default_min_vel_x")]
    pub min_vel_x: f64,

    /// Maximum lateral velocity in m/s (default: 0.1)
    #[serde(default = "default_max_vel_y")]
    pub max_vel_y: f64,

    /// Minimum lateral velocity in m/s (default: -0.1)
    #[serde(default = "default_min_vel_y")]
    pub min_vel_y: f64,

    /// Maximum angular velocity in rad/s (default: 1.0)
    #[serde(default = "default_max_vel_theta")]
    pub max_vel_theta: f64,

    /// Minimum angular velocity in rad/s (default: -1.0)
    #[serde(default = "default_min_vel_theta")]
    pub min_vel_theta: f64,

    /// Smallest angular speed the base can execute when rotating in place
    /// (default: 0.4)
    #[serde(default = "default_min_in_place_vel_theta")]
    pub min_in_place_vel_theta: f64,

    // --- Rollout ---
    /// Horizon over which trajectories are simulated in seconds (default: 1.0)
    #[serde(default = "default_sim_time")]
    pub sim_time: f64,

    /// Control period used as the dynamic-window step in seconds (default: 0.1)
    #[serde(default = "default_sim_period")]
    pub sim_period: f64,

    /// Translational step between simulated points in meters (default: 0.025)
    #[serde(default = "default_sim_granularity")]
    pub sim_granularity: f64,

    /// Angular step between simulated points in radians (default: 0.025)
    #[serde(default = "default_angular_sim_granularity")]
    pub angular_sim_granularity: f64,

    /// Number of forward-velocity samples (default: 3)
    #[serde(default = "default_vx_samples")]
    pub vx_samples: u32,

    /// Number of lateral-velocity samples (default: 5)
    #[serde(default = "default_vy_samples")]
    pub vy_samples: u32,

    /// Number of angular-velocity samples (default: 20)
    #[serde(default = "default_vtheta_samples")]
    pub vtheta_samples: u32,

    /// Extra lateral velocities for the strafe fallback, as a
    /// comma/space separated list (default: "-0.3,-0.1,0.1,0.3")
    #[serde(default = "default_y_vels")]
    pub y_vels: String,

    // --- Scoring ---
    /// Weight of the distance to the reference path (default: 0.6)
    #[serde(default = "default_pdist_scale")]
    pub pdist_scale: f64,

    /// Weight of the distance to the local goal (default: 0.8)
    #[serde(default = "default_gdist_scale")]
    pub gdist_scale: f64,

    /// Weight of the worst occupancy cost along the trajectory (default: 0.01)
    #[serde(default = "default_occdist_scale")]
    pub occdist_scale: f64,

    /// Weight of the heading difference term (default: 1.0)
    #[serde(default = "default_hdiff_scale")]
    pub hdiff_scale: f64,

    /// Path distances at or below this value score as zero; 0 disables
    /// (default: 0.0)
    #[serde(default = "default_path_distance_max")]
    pub path_distance_max: f64,

    /// Scale the distance weights by the costmap resolution so they are
    /// expressed in meters rather than cells (default: false)
    #[serde(default = "default_meter_scoring")]
    pub meter_scoring: bool,

    /// Score the heading difference to the plan on the final rollout step
    /// (default: false)
    #[serde(default = "default_heading_scoring")]
    pub heading_scoring: bool,

    /// Simulation time at which heading would be scored, kept for
    /// compatibility; heading is scored on the final step (default: 0.8)
    #[serde(default = "default_heading_scoring_timestep")]
    pub heading_scoring_timestep: f64,

    /// Score goal distance as plain squared Euclidean distance to the plan
    /// end instead of using the distance fields (default: false)
    #[serde(default = "default_simple_attractor")]
    pub simple_attractor: bool,

    /// Projection distance ahead of a trajectory endpoint when evaluating
    /// strafe candidates in meters (default: 0.325)
    #[serde(default = "default_heading_lookahead")]
    pub heading_lookahead: f64,

    // --- Behavior ---
    /// The base can translate sideways (default: false)
    #[serde(default = "default_holonomic_robot")]
    pub holonomic_robot: bool,

    /// Restrict sampling to the velocities reachable within one control
    /// period, the dynamic window (default: true)
    #[serde(default = "default_dwa")]
    pub dwa: bool,

    /// Reverse velocity used while escaping in m/s, negative (default: -0.1)
    #[serde(default = "default_backup_vel")]
    pub backup_vel: f64,

    /// Translation that clears the oscillation flags in meters (default: 0.05)
    #[serde(default = "default_oscillation_reset_dist")]
    pub oscillation_reset_dist: f64,

    /// Translation that ends an escape in meters (default: 0.10)
    #[serde(default = "default_escape_reset_dist")]
    pub escape_reset_dist: f64,

    /// Rotation that ends an escape in radians (default: π/4)
    #[serde(default = "default_escape_reset_theta")]
    pub escape_reset_theta: f64,
}

// Default value functions
fn default_acc_lim_x() -> f64 {
    2.5
}
fn default_acc_lim_y() -> f64 {
    2.5
}
fn default_acc_lim_theta() -> f64 {
    3.2
}
fn default_max_vel_x() -> f64 {
    0.5
}
fn default_min_vel_x() -> f64 {
    0.1
}
fn default_max_vel_y() -> f64 {
    0.1
}
fn default_min_vel_y() -> f64 {
    -0.1
}
fn default_max_vel_theta() -> f64 {
    1.0
}
fn default_min_vel_theta() -> f64 {
    -1.0
}
fn default_min_in_place_vel_theta() -> f64 {
    0.4
}
fn default_sim_time() -> f64 {
    1.0
}
fn default_sim_period() -> f64 {
    0.1
}
fn default_sim_granularity() -> f64 {
    0.025
}
fn default_angular_sim_granularity() -> f64 {
    0.025
}
fn default_vx_samples() -> u32 {
    3
}
fn default_vy_samples() -> u32 {
    5
}
fn default_vtheta_samples() -> u32 {
    20
}
fn default_y_vels() -> String {
    "-0.3,-0.1,0.1,0.3".to_string()
}
fn default_pdist_scale() -> f64 {
    0.6
}
fn default_gdist_scale() -> f64 {
    0.8
}
fn default_occdist_scale() -> f64 {
    0.01
}
fn default_hdiff_scale() -> f64 {
    1.0
}
fn default_path_distance_max() -> f64 {
    0.0
}
fn default_meter_scoring() -> bool {
    false
}
fn default_heading_scoring() -> bool {
    false
}
fn default_heading_scoring_timestep() -> f64 {
    0.8
}
fn default_simple_attractor() -> bool {
    false
}
fn default_heading_lookahead() -> f64 {
    0.325
}
fn default_holonomic_robot() -> bool {
    false
}
fn default_dwa() -> bool {
    true
}
fn default_backup_vel() -> f64 {
    -0.1
}
fn default_oscillation_reset_dist() -> f64 {
    0.05
}
fn default_escape_reset_dist() -> f64 {
    0.10
}
fn default_escape_reset_theta() -> f64 {
    std::f64::consts::FRAC_PI_4
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            acc_lim_x: default_acc_lim_x(),
            acc_lim_y: default_acc_lim_y(),
            acc_lim_theta: default_acc_lim_theta(),
            max_vel_x: default_max_vel_x(),
            min_vel_x: default_min_vel_x(),
            max_vel_y: default_max_vel_y(),
            min_vel_y: default_min_vel_y(),
            max_vel_theta: default_max_vel_theta(),
            min_vel_theta: default_min_vel_theta(),
            min_in_place_vel_theta: default_min_in_place_vel_theta(),
            sim_time: default_sim_time(),
            sim_period: default_sim_period(),
            sim_granularity: default_sim_granularity(),
            angular_sim_granularity: default_angular_sim_granularity(),
            vx_samples: default_vx_samples(),
            vy_samples: default_vy_samples(),
            vtheta_samples: default_vtheta_samples(),
            y_vels: default_y_vels(),
            pdist_scale: default_pdist_scale(),
            gdist_scale: default_gdist_scale(),
            occdist_scale: default_occdist_scale(),
            hdiff_scale: default_hdiff_scale(),
            path_distance_max: default_path_distance_max(),
            meter_scoring: default_meter_scoring(),
            heading_scoring: default_heading_scoring(),
            heading_scoring_timestep: default_heading_scoring_timestep(),
            simple_attractor: default_simple_attractor(),
            heading_lookahead: default_heading_lookahead(),
            holonomic_robot: default_holonomic_robot(),
            dwa: default_dwa(),
            backup_vel: default_backup_vel(),
            oscillation_reset_dist: default_oscillation_reset_dist(),
            escape_reset_dist: default_escape_reset_dist(),
            escape_reset_theta: default_escape_reset_theta(),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PlannerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// The three per-axis acceleration limits as one record.
    pub fn accel_limits(&self) -> AccelLimits {
        AccelLimits::new(self.acc_lim_x, self.acc_lim_y, self.acc_lim_theta)
    }

    /// Parse the `y_vels` list. Entries that are not numbers are skipped.
    pub fn parse_y_vels(&self) -> Vec<f64> {
        self.y_vels
            .split([',', ' '])
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<f64>().ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_consistent() {
        let cfg = PlannerConfig::default();
        assert!(cfg.acc_lim_x > 0.0 && cfg.acc_lim_y > 0.0 && cfg.acc_lim_theta > 0.0);
        assert!(cfg.min_vel_x <= cfg.max_vel_x);
        assert!(cfg.min_vel_theta <= cfg.max_vel_theta);
        assert!(cfg.sim_time > 0.0 && cfg.sim_granularity > 0.0);
        assert!(cfg.backup_vel < 0.0);
    }

    #[test]
    fn test_parse_y_vels() {
        let cfg = PlannerConfig::default();
        assert_eq!(cfg.parse_y_vels(), vec![-0.3, -0.1, 0.1, 0.3]);

        let mixed = PlannerConfig {
            y_vels: "-0.2, 0.2  0.4".to_string(),
            ..Default::default()
        };
        assert_eq!(mixed.parse_y_vels(), vec![-0.2, 0.2, 0.4]);

        let junk = PlannerConfig {
            y_vels: "0.1, nope, 0.3".to_string(),
            ..Default::default()
        };
        assert_eq!(junk.parse_y_vels(), vec![0.1, 0.3]);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let cfg: PlannerConfig = toml::from_str(
            r#"
            max_vel_x = 1.2
            dwa = false
            y_vels = "0.05 -0.05"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.max_vel_x, 1.2);
        assert!(!cfg.dwa);
        assert_eq!(cfg.parse_y_vels(), vec![0.05, -0.05]);
        // Untouched fields keep their defaults
        assert_eq!(cfg.vtheta_samples, 20);
    }

    #[test]
    fn test_accel_limits_record() {
        let cfg = PlannerConfig::default();
        let accel = cfg.accel_limits();
        assert_eq!(accel.ax, cfg.acc_lim_x);
        assert_eq!(accel.ay, cfg.acc_lim_y);
        assert_eq!(accel.atheta, cfg.acc_lim_theta);
    }
}
