use nalgebra::Vector2;

use super::pose::Pose;

/// A floor-plan location a particle set can be seeded from.
pub type Location = Vector2<f64>;

/// One weighted hypothesis of the agent's state.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct State {
    pub pose: Pose,

    /// Speed actually applied during the last prediction, in m/s.
    pub velocity: f64,

    /// Walking speed the particle believes in, in m/s.
    pub normal_velocity: f64,

    /// Offset between the measured yaw and the particle's true heading.
    pub orientation_bias: f64,

    /// Device-specific offset added to the expected RSSI of every beacon.
    pub rssi_bias: f64,

    pub weight: f64,

    /// Weakened negative log-likelihood from the most recent correction.
    /// Lower is better.
    pub negative_log_likelihood: f64,
}

impl State {
    pub fn new(pose: Pose, normal_velocity: f64, orientation_bias: f64, rssi_bias: f64) -> Self {
        Self {
            pose,
            velocity: 0.0,
            normal_velocity,
            orientation_bias,
            rssi_bias,
            weight: 1.0,
            negative_log_likelihood: 0.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn x(&self) -> f64 {
        self.pose.position.x
    }

    pub fn y(&self) -> f64 {
        self.pose.position.y
    }

    pub fn orientation(&self) -> f64 {
        self.pose.orientation
    }

    pub fn location(&self) -> Location {
        self.pose.position
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new(Pose::default(), 0.0, 0.0, 0.0)
    }
}
