//! Kinematic propagators that advance one particle per call.
//!
//! Two strategies share the [`MotionModel`] trait:
//! - [`OdometryArcWalker`]: damps speed while turning and moves the particle
//!   along the arc described by the left/right wheel velocities.
//! - [`DeadReckoningWalker`]: projects the particle's own walking speed along
//!   its heading.
pub mod dead_reckoning;
pub mod odometry_arc;

use alloc::vec::Vec;
use core::f64::consts::PI;

use bon::Builder;

pub use dead_reckoning::DeadReckoningWalker;
pub use odometry_arc::OdometryArcWalker;

use crate::{
    error::FilterError,
    sensors::EncoderInfo,
    state::State,
    utils::samplers::RandomGenerator,
};

/// Evidence shared by every particle of one prediction.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct MotionInput {
    pub timestamp: i64,
    pub previous_timestamp: i64,
    pub n_steps: f64,
    pub yaw: f64,
}

impl MotionInput {
    /// Elapsed time in seconds.
    pub fn dt(&self) -> f64 {
        (self.timestamp - self.previous_timestamp) as f64 / 1000.0
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Builder)]
pub struct PoseProperty {
    #[builder(default = 0.1)]
    pub min_velocity: f64,

    #[builder(default = 1.5)]
    pub max_velocity: f64,

    /// Standard deviation growth of the walking speed, per second.
    #[builder(default = 0.1)]
    pub diffusion_velocity: f64,

    /// Prior walking speed used when particles are created.
    #[builder(default = 1.0)]
    pub mean_velocity: f64,

    #[builder(default = 0.3)]
    pub std_velocity: f64,
}

impl Default for PoseProperty {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Builder)]
pub struct StateProperty {
    /// Standard deviation growth of the orientation bias, in rad/s.
    #[builder(default = 10.0 * PI / 180.0)]
    pub diffusion_orientation_bias: f64,

    /// Standard deviation growth of the RSSI bias, in dB/s.
    #[builder(default = 0.2)]
    pub diffusion_rssi_bias: f64,

    #[builder(default = -10.0)]
    pub min_rssi_bias: f64,

    #[builder(default = 10.0)]
    pub max_rssi_bias: f64,
}

impl Default for StateProperty {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// How the rotation angle of an arc segment is obtained.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ArcRotation {
    /// `(vR - vL) * dt / axle_length`, the differential-drive angular rate.
    #[default]
    WheelSpeeds,
    /// Heading change of the particle divided by the axle length.
    HeadingChange,
}

#[derive(Clone, Copy, PartialEq, Debug, Builder)]
pub struct WalkerProperty {
    /// Scale applied to the particle's walking speed.
    #[builder(default = 1.0)]
    pub velocity_rate: f64,

    /// Heading change per prediction at which forward speed drops to zero.
    #[builder(default = 30.0 * PI / 180.0)]
    pub angular_velocity_limit: f64,

    /// Keep diffusing biases and speed while no steps are detected.
    #[builder(default = false)]
    pub update_when_stopping: bool,

    /// Distance between the wheels, in meters.
    #[builder(default = 0.0125)]
    pub axle_length: f64,

    #[builder(default)]
    pub arc_rotation: ArcRotation,
}

impl Default for WalkerProperty {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Advances a particle given the evidence of one prediction cycle.
pub trait MotionModel {
    /// Returns the predicted particle. The prior is left untouched.
    fn predict(
        &mut self,
        state: &State,
        input: &MotionInput,
        encoder: &EncoderInfo,
    ) -> Result<State, FilterError>;

    fn predict_all(
        &mut self,
        states: &[State],
        input: &MotionInput,
        encoder: &EncoderInfo,
    ) -> Result<Vec<State>, FilterError> {
        states
            .iter()
            .map(|state| self.predict(state, input, encoder))
            .collect()
    }

    /// Replaces the step count with an externally controlled movement level.
    /// `None` goes back to the live step count.
    fn control_movement(&mut self, movement: Option<f64>);

    /// Movement level driving perturbation and propagation.
    fn moving_level(&self, input: &MotionInput) -> f64;
}

/// Movement override shared by the walkers.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub(crate) struct MovementControl {
    movement: Option<f64>,
}

impl MovementControl {
    pub(crate) fn set(&mut self, movement: Option<f64>) {
        self.movement = movement;
    }

    pub(crate) fn level(&self, input: &MotionInput) -> f64 {
        self.movement.unwrap_or(input.n_steps)
    }
}

/// Random walk of the orientation and RSSI biases.
pub(crate) fn perturb_biases(
    random: &mut RandomGenerator,
    property: &StateProperty,
    state: &mut State,
    dt: f64,
) -> Result<(), FilterError> {
    state.orientation_bias += property.diffusion_orientation_bias * random.next_gaussian() * dt;
    state.rssi_bias = random.next_truncated_gaussian(
        state.rssi_bias,
        property.diffusion_rssi_bias * dt,
        property.min_rssi_bias,
        property.max_rssi_bias,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dt_is_in_seconds() {
        let input = MotionInput {
            timestamp: 2500,
            previous_timestamp: 1000,
            ..Default::default()
        };
        assert_eq!(input.dt(), 1.5);
    }

    #[test]
    fn movement_override_replaces_step_count() {
        let input = MotionInput {
            n_steps: 0.1,
            ..Default::default()
        };
        let mut control = MovementControl::default();
        assert_eq!(control.level(&input), 0.1);
        control.set(Some(0.0));
        assert_eq!(control.level(&input), 0.0);
        control.set(None);
        assert_eq!(control.level(&input), 0.1);
    }

    #[test]
    fn bias_perturbation_respects_rssi_range() {
        let mut random = RandomGenerator::new(9);
        let property = StateProperty::builder().diffusion_rssi_bias(20.0).build();
        let mut state = State::default();
        for _ in 0..1000 {
            perturb_biases(&mut random, &property, &mut state, 1.0).unwrap();
            assert!((-10.0..=10.0).contains(&state.rssi_bias));
        }
    }

    #[test]
    fn property_defaults() {
        let walker = WalkerProperty::default();
        assert_eq!(walker.velocity_rate, 1.0);
        assert_eq!(walker.axle_length, 0.0125);
        assert_eq!(walker.arc_rotation, ArcRotation::WheelSpeeds);
        assert!(!walker.update_when_stopping);
        assert!(PoseProperty::default().min_velocity < PoseProperty::default().max_velocity);
    }
}
