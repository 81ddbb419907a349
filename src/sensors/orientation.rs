use bon::Builder;
use log::warn;
use num_traits::Float;

use super::{Attitude, OrientationMeter};
use crate::utils::math::normalize_orientation;

#[derive(Clone, Copy, PartialEq, Debug, Builder)]
pub struct OrientationMeterParameters {
    /// Seconds of attitude samples averaged into one yaw.
    #[builder(default = 0.1)]
    pub interval: f64,

    /// Added to every attitude yaw to move it into the map frame.
    #[builder(default)]
    pub yaw_offset: f64,
}

impl Default for OrientationMeterParameters {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Averages attitude yaw over fixed intervals.
///
/// The first sample after construction or reset produces a yaw right away.
/// Later samples are accumulated and a new circular mean is published each
/// time an interval closes.
#[derive(Clone, Debug)]
pub struct AveragingOrientationMeter {
    parameters: OrientationMeterParameters,
    previous_timestamp: Option<i64>,
    sin_sum: f64,
    cos_sum: f64,
    yaw: f64,
    updated: bool,
}

impl AveragingOrientationMeter {
    pub fn new(parameters: OrientationMeterParameters) -> Self {
        Self {
            parameters,
            previous_timestamp: None,
            sin_sum: 0.0,
            cos_sum: 0.0,
            yaw: 0.0,
            updated: false,
        }
    }

    fn transform_orientation(&self, attitude: &Attitude) -> f64 {
        normalize_orientation(attitude.yaw + self.parameters.yaw_offset)
    }

    fn publish(&mut self, timestamp: i64) {
        self.yaw = normalize_orientation(self.sin_sum.atan2(self.cos_sum));
        self.sin_sum = 0.0;
        self.cos_sum = 0.0;
        self.previous_timestamp = Some(timestamp);
        self.updated = true;
    }
}

impl Default for AveragingOrientationMeter {
    fn default() -> Self {
        Self::new(OrientationMeterParameters::default())
    }
}

impl OrientationMeter for AveragingOrientationMeter {
    fn put_attitude(&mut self, attitude: &Attitude) {
        let yaw = self.transform_orientation(attitude);
        self.sin_sum += yaw.sin();
        self.cos_sum += yaw.cos();

        let previous = match self.previous_timestamp {
            None => {
                self.publish(attitude.timestamp);
                return;
            }
            Some(previous) if attitude.timestamp < previous => {
                warn!("Inconsistent timestamp. Orientation meter was reset.");
                self.reset();
                self.sin_sum = yaw.sin();
                self.cos_sum = yaw.cos();
                self.publish(attitude.timestamp);
                return;
            }
            Some(previous) => previous,
        };

        let dt = (attitude.timestamp - previous) as f64 / 1000.0;
        if dt >= self.parameters.interval {
            self.publish(attitude.timestamp);
        } else {
            self.updated = false;
        }
    }

    fn is_updated(&self) -> bool {
        self.updated
    }

    fn yaw(&self) -> f64 {
        self.yaw
    }

    fn reset(&mut self) {
        self.previous_timestamp = None;
        self.sin_sum = 0.0;
        self.cos_sum = 0.0;
        self.updated = false;
    }
}
