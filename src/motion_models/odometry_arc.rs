use nalgebra::{Rotation2, Vector2};
use num_traits::Float;

use super::{
    perturb_biases, ArcRotation, MotionInput, MotionModel, MovementControl, PoseProperty,
    StateProperty, WalkerProperty,
};
use crate::{
    error::FilterError,
    sensors::EncoderInfo,
    state::State,
    utils::{
        math::{normalize_orientation, orientation_difference, turning_velocity_rate},
        samplers::RandomGenerator,
    },
};

/// Differential-drive walker.
///
/// Speed is damped by how sharply the heading changed since the previous
/// prediction and the position follows one of three closed-form cases picked
/// from the wheel velocities: straight line, rotation in place, or an arc
/// around the instantaneous center of curvature.
#[derive(Clone, Debug)]
pub struct OdometryArcWalker {
    pose_property: PoseProperty,
    state_property: StateProperty,
    walker_property: WalkerProperty,
    random: RandomGenerator,
    control: MovementControl,
}

impl OdometryArcWalker {
    pub fn new(
        pose_property: PoseProperty,
        state_property: StateProperty,
        walker_property: WalkerProperty,
        random: RandomGenerator,
    ) -> Self {
        Self {
            pose_property,
            state_property,
            walker_property,
            random,
            control: MovementControl::default(),
        }
    }
}

impl Default for OdometryArcWalker {
    fn default() -> Self {
        Self::new(
            PoseProperty::default(),
            StateProperty::default(),
            WalkerProperty::default(),
            RandomGenerator::default(),
        )
    }
}

impl MotionModel for OdometryArcWalker {
    fn predict(
        &mut self,
        state: &State,
        input: &MotionInput,
        encoder: &EncoderInfo,
    ) -> Result<State, FilterError> {
        let dt = input.dt();
        let moving_level = self.moving_level(input);
        let perturbs = moving_level > 0.0 || self.walker_property.update_when_stopping;

        let mut predicted = *state;
        if perturbs {
            perturb_biases(&mut self.random, &self.state_property, &mut predicted, dt)?;
        }

        let previous_orientation = state.pose.orientation;
        let orientation = normalize_orientation(input.yaw - predicted.orientation_bias);
        let turn_rate = turning_velocity_rate(
            orientation_difference(previous_orientation, orientation),
            self.walker_property.angular_velocity_limit,
        );

        if perturbs {
            let (min, max) = (self.pose_property.min_velocity, self.pose_property.max_velocity);
            predicted.normal_velocity = self.random.next_truncated_gaussian_around(
                encoder.velocity_l,
                self.pose_property.diffusion_velocity * dt,
                min,
                max,
            )?;
        }

        predicted.velocity = if moving_level > 0.0 {
            predicted.normal_velocity * self.walker_property.velocity_rate * turn_rate
        } else {
            0.0
        };

        predicted.pose.position = propagate(
            state.pose.position,
            previous_orientation,
            orientation,
            encoder.velocity_l,
            encoder.velocity_r,
            dt,
            &self.walker_property,
        );
        predicted.pose.orientation = orientation;
        Ok(predicted)
    }

    fn control_movement(&mut self, movement: Option<f64>) {
        self.control.set(movement);
    }

    fn moving_level(&self, input: &MotionInput) -> f64 {
        self.control.level(input)
    }
}

/// Moves `position` for `dt` seconds given the wheel velocities.
///
/// `orientation` is the heading after the step and is the one the motion is
/// projected on.
pub fn propagate(
    position: Vector2<f64>,
    previous_orientation: f64,
    orientation: f64,
    velocity_l: f64,
    velocity_r: f64,
    dt: f64,
    property: &WalkerProperty,
) -> Vector2<f64> {
    if velocity_l == velocity_r {
        return Vector2::new(
            position.x + velocity_r * orientation.cos() * dt,
            position.y + velocity_l * orientation.sin() * dt,
        );
    }
    if velocity_l == -velocity_r {
        return position;
    }

    let axle_length = property.axle_length;
    let radius = axle_length / 2.0 * (velocity_l + velocity_r) / (velocity_r - velocity_l);
    let rotation = match property.arc_rotation {
        ArcRotation::WheelSpeeds => (velocity_r - velocity_l) * dt / axle_length,
        ArcRotation::HeadingChange => {
            orientation_difference(previous_orientation, orientation) / axle_length
        }
    };
    let icc = Vector2::new(
        position.x - radius * orientation.sin(),
        position.y + radius * orientation.cos(),
    );
    Rotation2::new(rotation) * (position - icc) + icc
}
