use num_traits::Float;

use super::{
    perturb_biases, MotionInput, MotionModel, MovementControl, PoseProperty, StateProperty,
    WalkerProperty,
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

/// Pedestrian walker that ignores wheel odometry.
///
/// Each particle keeps its own walking speed, which drifts as a bounded random
/// walk while steps are detected. The particle then moves along its heading.
#[derive(Clone, Debug)]
pub struct DeadReckoningWalker {
    pose_property: PoseProperty,
    state_property: StateProperty,
    walker_property: WalkerProperty,
    random: RandomGenerator,
    control: MovementControl,
}

impl DeadReckoningWalker {
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

impl Default for DeadReckoningWalker {
    fn default() -> Self {
        Self::new(
            PoseProperty::default(),
            StateProperty::default(),
            WalkerProperty::default(),
            RandomGenerator::default(),
        )
    }
}

impl MotionModel for DeadReckoningWalker {
    fn predict(
        &mut self,
        state: &State,
        input: &MotionInput,
        _encoder: &EncoderInfo,
    ) -> Result<State, FilterError> {
        let dt = input.dt();
        let moving_level = self.moving_level(input);
        let perturbs = moving_level > 0.0 || self.walker_property.update_when_stopping;

        let mut predicted = *state;
        if perturbs {
            perturb_biases(&mut self.random, &self.state_property, &mut predicted, dt)?;
            let (min, max) = (self.pose_property.min_velocity, self.pose_property.max_velocity);
            predicted.normal_velocity = self.random.next_truncated_gaussian_around(
                state.normal_velocity,
                self.pose_property.diffusion_velocity * dt,
                min,
                max,
            )?;
        }

        let orientation = normalize_orientation(input.yaw - predicted.orientation_bias);
        let turn_rate = turning_velocity_rate(
            orientation_difference(state.pose.orientation, orientation),
            self.walker_property.angular_velocity_limit,
        );
        predicted.velocity = if moving_level > 0.0 {
            predicted.normal_velocity * self.walker_property.velocity_rate * turn_rate
        } else {
            0.0
        };

        predicted.pose.position.x += predicted.velocity * orientation.cos() * dt;
        predicted.pose.position.y += predicted.velocity * orientation.sin() * dt;
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
