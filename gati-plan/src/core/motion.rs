//! Kinematic integration for the nonholonomic body model.
//!
//! Velocities ramp toward their commanded targets under per-axis
//! acceleration limits; poses advance with the body→world rotation.
//! Theta is deliberately not normalized here; comparison sites use
//! [`shortest_angular_distance`](crate::core::math::shortest_angular_distance).

use super::pose::{Pose, Velocity};

/// Step one velocity component toward `target` under an acceleration limit.
///
/// `accel` and `dt` must be positive. The result never overshoots `target`.
#[inline]
pub fn step_velocity(target: f64, current: f64, accel: f64, dt: f64) -> f64 {
    if current < target {
        (current + accel * dt).min(target)
    } else if current > target {
        (current - accel * dt).max(target)
    } else {
        target
    }
}

/// Advance a pose by one timestep of body-frame velocities.
#[inline]
pub fn step_pose(pose: Pose, vel: Velocity, dt: f64) -> Pose {
    let cos_t = pose.theta.cos();
    let sin_t = pose.theta.sin();

    Pose::new(
        pose.x + (vel.vx * cos_t - vel.vy * sin_t) * dt,
        pose.y + (vel.vx * sin_t + vel.vy * cos_t) * dt,
        pose.theta + vel.vtheta * dt,
    )
}
