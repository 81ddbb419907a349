use alloc::collections::VecDeque;

use bon::Builder;
use log::{trace, warn};
use num_traits::Float;

use super::{Acceleration, EncoderInfo, Pedometer};

/// Standard gravity in m/s^2.
pub const GRAVITY: f64 = 9.80665;

#[derive(Clone, Copy, PartialEq, Debug, Builder)]
pub struct WalkingStateParameters {
    /// Seconds between two updates of the step channel.
    #[builder(default = 0.1)]
    pub update_period: f64,

    /// Number of acceleration samples the deviation is computed over.
    #[builder(default = 20)]
    pub window_size: usize,

    /// Fewer samples than this always report standing still.
    #[builder(default = 10)]
    pub min_window_size: usize,

    /// Standard deviation of the acceleration magnitude, in m/s^2, above which
    /// the agent is considered walking.
    #[builder(default = 0.6)]
    pub walk_detect_sigma_threshold: f64,

    /// Step count reported while walking.
    #[builder(default = 0.1)]
    pub steps_when_walking: f64,
}

impl Default for WalkingStateParameters {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Walking detector based on the spread of the acceleration magnitude.
///
/// The detector does not count individual steps. It reports a constant step
/// count while the magnitude fluctuates enough to look like walking and zero
/// otherwise.
#[derive(Clone, Debug)]
pub struct WalkingStatePedometer {
    parameters: WalkingStateParameters,
    amplitudes: VecDeque<f64>,
    previous_update_time: Option<i64>,
    n_steps: f64,
    updated: bool,
}

impl WalkingStatePedometer {
    pub fn new(parameters: WalkingStateParameters) -> Self {
        Self {
            amplitudes: VecDeque::with_capacity(parameters.window_size),
            parameters,
            previous_update_time: None,
            n_steps: 0.0,
            updated: false,
        }
    }

    pub fn parameters(&self) -> &WalkingStateParameters {
        &self.parameters
    }

    fn amplitude_deviation(&self) -> f64 {
        let n = self.amplitudes.len() as f64;
        let mean = self.amplitudes.iter().sum::<f64>() / n;
        let variance = self
            .amplitudes
            .iter()
            .map(|a| (a - mean) * (a - mean))
            .sum::<f64>()
            / n;
        variance.sqrt()
    }
}

impl Default for WalkingStatePedometer {
    fn default() -> Self {
        Self::new(WalkingStateParameters::default())
    }
}

impl Pedometer for WalkingStatePedometer {
    fn put_acceleration(&mut self, acceleration: &Acceleration) {
        let timestamp = acceleration.timestamp;
        let previous = match self.previous_update_time {
            Some(previous) if timestamp < previous => {
                warn!("Inconsistent timestamp. Pedometer status was reset.");
                self.reset();
                timestamp
            }
            Some(previous) => previous,
            None => timestamp,
        };
        self.previous_update_time = Some(previous);

        self.amplitudes
            .push_back(GRAVITY * acceleration.magnitude() - GRAVITY);
        if self.amplitudes.len() > self.parameters.window_size {
            self.amplitudes.pop_front();
        }

        self.n_steps = if self.amplitudes.len() < self.parameters.min_window_size.max(1) {
            0.0
        } else if self.amplitude_deviation() > self.parameters.walk_detect_sigma_threshold {
            self.parameters.steps_when_walking
        } else {
            0.0
        };

        let dt = (timestamp - previous) as f64 / 1000.0;
        if dt >= self.parameters.update_period {
            self.previous_update_time = Some(timestamp);
            self.updated = true;
        } else {
            self.updated = false;
        }
    }

    fn is_updated(&self) -> bool {
        self.updated
    }

    fn n_steps(&self) -> f64 {
        self.n_steps
    }

    fn reset(&mut self) {
        self.previous_update_time = None;
        self.updated = false;
        self.n_steps = 0.0;
        self.amplitudes.clear();
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Builder)]
pub struct EncoderWalkingParameters {
    /// Seconds between two updates of the step channel.
    #[builder(default = 0.1)]
    pub update_period: f64,

    /// Mean wheel speed, in m/s, above which the platform is considered moving.
    #[builder(default = 0.1)]
    pub velocity_threshold: f64,

    /// Step count reported while moving.
    #[builder(default = 0.1)]
    pub steps_when_moving: f64,
}

impl Default for EncoderWalkingParameters {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Moving detector for wheeled platforms, driven by encoder readings instead
/// of accelerations.
#[derive(Clone, Debug, Default)]
pub struct EncoderWalkingPedometer {
    parameters: EncoderWalkingParameters,
    previous_update_time: Option<i64>,
    n_steps: f64,
    updated: bool,
}

impl EncoderWalkingPedometer {
    pub fn new(parameters: EncoderWalkingParameters) -> Self {
        Self {
            parameters,
            ..Self::default()
        }
    }

    pub fn parameters(&self) -> &EncoderWalkingParameters {
        &self.parameters
    }
}

impl Pedometer for EncoderWalkingPedometer {
    fn put_acceleration(&mut self, acceleration: &Acceleration) {
        trace!(
            "Acceleration at t={} ignored by the encoder pedometer.",
            acceleration.timestamp
        );
        self.updated = false;
    }

    fn put_encoder_info(&mut self, info: &EncoderInfo) {
        let timestamp = info.timestamp;
        let previous = match self.previous_update_time {
            Some(previous) if timestamp < previous => {
                warn!("Inconsistent timestamp. Pedometer status was reset.");
                self.reset();
                timestamp
            }
            Some(previous) => previous,
            None => timestamp,
        };
        self.previous_update_time = Some(previous);

        let speed = (info.velocity_l + info.velocity_r) / 2.0;
        self.n_steps = if speed > self.parameters.velocity_threshold {
            self.parameters.steps_when_moving
        } else {
            0.0
        };

        let dt = (timestamp - previous) as f64 / 1000.0;
        self.updated = dt >= self.parameters.update_period;
        if self.updated {
            self.previous_update_time = Some(timestamp);
        }
    }

    fn is_updated(&self) -> bool {
        self.updated
    }

    fn n_steps(&self) -> f64 {
        self.n_steps
    }

    fn reset(&mut self) {
        self.previous_update_time = None;
        self.updated = false;
        self.n_steps = 0.0;
    }
}
