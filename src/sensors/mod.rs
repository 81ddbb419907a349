//! Sensor events and the push-style adapters that turn them into the
//! evidence a prediction step consumes.
pub mod beacon;
pub mod encoder;
pub mod orientation;
pub mod pedometer;

use bon::Builder;

pub use beacon::{Beacon, BeaconFilter, BeaconId, Beacons};
pub use encoder::LatestEncoder;
pub use orientation::{AveragingOrientationMeter, OrientationMeterParameters};
pub use pedometer::{
    EncoderWalkingParameters, EncoderWalkingPedometer, WalkingStateParameters,
    WalkingStatePedometer,
};

/// Accelerometer sample in units of g. Timestamps are milliseconds.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Acceleration {
    pub timestamp: i64,
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
}

impl Acceleration {
    pub fn new(timestamp: i64, ax: f64, ay: f64, az: f64) -> Self {
        Self {
            timestamp,
            ax,
            ay,
            az,
        }
    }

    pub fn magnitude(&self) -> f64 {
        nalgebra::Vector3::new(self.ax, self.ay, self.az).norm()
    }
}

/// Device attitude in radians.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Attitude {
    pub timestamp: i64,
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

impl Attitude {
    pub fn new(timestamp: i64, pitch: f64, roll: f64, yaw: f64) -> Self {
        Self {
            timestamp,
            pitch,
            roll,
            yaw,
        }
    }
}

/// Wheel odometry reading of a differential-drive platform.
///
/// Velocities are in m/s and default to 1 until a real reading arrives.
#[derive(Clone, Copy, PartialEq, Debug, Builder)]
pub struct EncoderInfo {
    #[builder(default)]
    pub timestamp: i64,

    #[builder(default)]
    pub position: f64,

    #[builder(default = 1.0)]
    pub velocity_l: f64,

    #[builder(default = 1.0)]
    pub velocity_r: f64,
}

impl Default for EncoderInfo {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Step detector fed with accelerometer samples.
pub trait Pedometer {
    fn put_acceleration(&mut self, acceleration: &Acceleration);

    /// Wheel odometry reading. Detectors that only look at accelerations
    /// ignore it.
    fn put_encoder_info(&mut self, _info: &EncoderInfo) {}

    /// Whether the last sample closed an update period.
    fn is_updated(&self) -> bool;

    fn n_steps(&self) -> f64;

    fn reset(&mut self);
}

/// Heading estimator fed with attitude samples.
pub trait OrientationMeter {
    fn put_attitude(&mut self, attitude: &Attitude);

    /// Whether the last sample produced a fresh yaw.
    fn is_updated(&self) -> bool;

    fn yaw(&self) -> f64;

    fn reset(&mut self);
}

/// Wheel odometry source.
pub trait Encoder {
    fn put_encoder_info(&mut self, info: &EncoderInfo);

    fn is_updated(&self) -> bool;

    fn encoder_info(&self) -> EncoderInfo;

    fn velocity_l(&self) -> f64 {
        self.encoder_info().velocity_l
    }

    fn velocity_r(&self) -> f64 {
        self.encoder_info().velocity_r
    }

    fn reset(&mut self);
}
