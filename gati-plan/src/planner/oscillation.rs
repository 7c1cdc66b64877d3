//! Anti-oscillation and escape bookkeeping.
//!
//! Flat records of flags plus anchor poses. The sampler classifies every
//! non-forward selection; the flags clear once the robot has actually
//! translated, so the planner cannot dither between a rotation or strafe
//! direction and its opposite while standing still.

use crate::core::{shortest_angular_distance, Pose};
use crate::trajectory::Trajectory;

/// Rotation and strafe memory between control ticks.
#[derive(Clone, Copy, Debug, Default)]
pub struct OscillationState {
    /// The last non-forward selection rotated counter-clockwise.
    pub rotating_left: bool,
    /// The last non-forward selection rotated clockwise.
    pub rotating_right: bool,
    /// A strafe in the flagged direction has been selected without
    /// translating since.
    pub strafe_left: bool,
    pub strafe_right: bool,
    /// A rotation direction was selected twice without translating.
    pub stuck_left: bool,
    pub stuck_right: bool,
    /// A strafe direction was selected twice without translating.
    pub stuck_left_strafe: bool,
    pub stuck_right_strafe: bool,
    /// Position the robot must leave before the flags clear.
    prev_x: f64,
    prev_y: f64,
}

impl OscillationState {
    /// Classify a chosen trajectory. Selections without forward progress
    /// latch their rotation or strafe direction; a repeated direction sets
    /// the matching stuck flag. The anchor moves to the current position.
    pub fn note_selection(&mut self, best: &Trajectory, pose: Pose) {
        if best.vx > 0.0 {
            return;
        }

        if best.vtheta < 0.0 {
            if self.rotating_right {
                self.stuck_right = true;
            }
            self.rotating_right = true;
        } else if best.vtheta > 0.0 {
            if self.rotating_left {
                self.stuck_left = true;
            }
            self.rotating_left = true;
        } else if best.vy > 0.0 {
            if self.strafe_right {
                self.stuck_right_strafe = true;
            }
            self.strafe_right = true;
        } else if best.vy < 0.0 {
            if self.strafe_left {
                self.stuck_left_strafe = true;
            }
            self.strafe_left = true;
        }

        self.prev_x = pose.x;
        self.prev_y = pose.y;
    }

    /// Clear all flags once the robot has translated far enough from the
    /// anchor.
    pub fn maybe_reset(&mut self, pose: Pose, oscillation_reset_dist: f64) {
        let dist = (pose.x - self.prev_x).hypot(pose.y - self.prev_y);
        if dist > oscillation_reset_dist {
            self.rotating_left = false;
            self.rotating_right = false;
            self.strafe_left = false;
            self.strafe_right = false;
            self.stuck_left = false;
            self.stuck_right = false;
            self.stuck_left_strafe = false;
            self.stuck_right_strafe = false;
        }
    }

    /// Any stuck flag set.
    pub fn any_stuck(&self) -> bool {
        self.stuck_left || self.stuck_right || self.stuck_left_strafe || self.stuck_right_strafe
    }
}

/// Reverse-escape memory between control ticks.
#[derive(Clone, Copy, Debug, Default)]
pub struct EscapeState {
    /// The planner is currently backing up; forward sampling is disabled.
    pub escaping: bool,
    escape_x: f64,
    escape_y: f64,
    escape_theta: f64,
}

impl EscapeState {
    /// Record the escape anchor and start escaping.
    pub fn begin(&mut self, pose: Pose) {
        self.escape_x = pose.x;
        self.escape_y = pose.y;
        self.escape_theta = pose.theta;
        self.escaping = true;
    }

    /// End the escape once the robot has moved or rotated far enough from
    /// the anchor.
    pub fn maybe_reset(&mut self, pose: Pose, escape_reset_dist: f64, escape_reset_theta: f64) {
        let dist = (pose.x - self.escape_x).hypot(pose.y - self.escape_y);
        if dist > escape_reset_dist
            || shortest_angular_distance(self.escape_theta, pose.theta).abs() > escape_reset_theta
        {
            self.escaping = false;
        }
    }
}
