//! Streaming particle filter driven by asynchronous sensor events.
//!
//! Acceleration and attitude events feed the step and orientation channels.
//! Once both have produced fresh data the particle set is predicted forward.
//! Beacon scans correct and resample it. Every published status is handed to
//! the registered [`StatusListener`].
pub mod config;
pub mod initializer;
pub mod listener;
pub mod observation;
pub mod resampler;
pub mod reset;

use alloc::{boxed::Box, vec::Vec};

use bon::bon;
use log::{debug, info, trace};

pub use config::FilterConfig;
pub use initializer::{InitializerConfig, PriorStatusInitializer, StatusInitializer};
pub use listener::StatusListener;
pub use observation::ObservationModel;
pub use resampler::{Resampler, SystematicResampler};
pub use reset::{PendingReset, PendingResetPolicy, PendingResets};

use self::observation::{compute_weights_from_log_likelihood, weaken_log_likelihoods};
use crate::{
    error::FilterError,
    motion_models::{MotionInput, MotionModel, OdometryArcWalker},
    sensors::{
        beacon::{CleansingBeaconFilter, CleansingParameters},
        Acceleration, AveragingOrientationMeter, Attitude, BeaconFilter, Beacons, Encoder,
        EncoderInfo, LatestEncoder, OrientationMeter, Pedometer, WalkingStatePedometer,
    },
    state::{Location, Pose, State, Status, UpdateKind},
};

pub struct StreamParticleFilter {
    config: FilterConfig,
    pedometer: Box<dyn Pedometer>,
    orientation_meter: Box<dyn OrientationMeter>,
    encoder: Box<dyn Encoder>,
    motion_model: Box<dyn MotionModel>,
    observation_model: Box<dyn ObservationModel>,
    resampler: Box<dyn Resampler>,
    status_initializer: Box<dyn StatusInitializer>,
    beacon_filter: Option<Box<dyn BeaconFilter>>,
    listener: Option<Box<dyn StatusListener>>,
    cleansing_filter: CleansingBeaconFilter,
    status: Status,
    pending_resets: PendingResets,
    acceleration_is_updated: bool,
    attitude_is_updated: bool,
    previous_timestamp: Option<i64>,
}

#[bon]
impl StreamParticleFilter {
    /// Only the observation model is required. Every other collaborator falls
    /// back to the crate's own implementation with default parameters.
    #[builder]
    pub fn new(
        observation_model: Box<dyn ObservationModel>,
        pedometer: Option<Box<dyn Pedometer>>,
        orientation_meter: Option<Box<dyn OrientationMeter>>,
        encoder: Option<Box<dyn Encoder>>,
        motion_model: Option<Box<dyn MotionModel>>,
        resampler: Option<Box<dyn Resampler>>,
        status_initializer: Option<Box<dyn StatusInitializer>>,
        beacon_filter: Option<Box<dyn BeaconFilter>>,
        listener: Option<Box<dyn StatusListener>>,
        config: Option<FilterConfig>,
        cleansing: Option<CleansingParameters>,
    ) -> Self {
        Self {
            config: config.unwrap_or_default(),
            pedometer: pedometer.unwrap_or_else(|| Box::new(WalkingStatePedometer::default())),
            orientation_meter: orientation_meter
                .unwrap_or_else(|| Box::new(AveragingOrientationMeter::default())),
            encoder: encoder.unwrap_or_else(|| Box::new(LatestEncoder::default())),
            motion_model: motion_model.unwrap_or_else(|| Box::new(OdometryArcWalker::default())),
            observation_model,
            resampler: resampler.unwrap_or_else(|| Box::new(SystematicResampler::default())),
            status_initializer: status_initializer
                .unwrap_or_else(|| Box::new(PriorStatusInitializer::default())),
            beacon_filter,
            listener,
            cleansing_filter: CleansingBeaconFilter::new(cleansing.unwrap_or_default()),
            status: Status::default(),
            pending_resets: PendingResets::new(),
            acceleration_is_updated: false,
            attitude_is_updated: false,
            previous_timestamp: None,
        }
    }
}

impl StreamParticleFilter {
    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Number of resets waiting for an orientation.
    pub fn pending_resets(&self) -> usize {
        self.pending_resets.len()
    }

    pub fn put_acceleration(&mut self, acceleration: &Acceleration) -> Result<(), FilterError> {
        self.initialize_status_if_empty()?;
        self.pedometer.put_acceleration(acceleration);
        self.acceleration_is_updated |= self.pedometer.is_updated();

        if self.acceleration_is_updated && self.attitude_is_updated {
            self.predict(acceleration.timestamp)?;
        }
        Ok(())
    }

    pub fn put_attitude(&mut self, attitude: &Attitude) -> Result<(), FilterError> {
        self.initialize_status_if_empty()?;
        self.orientation_meter.put_attitude(attitude);
        self.attitude_is_updated |= self.orientation_meter.is_updated();
        self.process_pending_resets()
    }

    /// Stores the wheel reading for the motion model and hands it to the
    /// pedometer, which may close the step channel with it.
    pub fn put_encoder(&mut self, info: &EncoderInfo) -> Result<(), FilterError> {
        self.initialize_status_if_empty()?;
        self.encoder.put_encoder_info(info);
        self.pedometer.put_encoder_info(info);
        self.acceleration_is_updated |= self.pedometer.is_updated();

        if self.acceleration_is_updated && self.attitude_is_updated {
            self.predict(info.timestamp)?;
        }
        Ok(())
    }

    /// Cleanses and filters `beacons`, then corrects the particle set with
    /// them. The listener is notified even when no beacon survives filtering.
    pub fn put_beacons(&mut self, beacons: &Beacons) -> Result<(), FilterError> {
        self.initialize_status_if_empty()?;
        let filtered = self.filter_beacons(beacons);
        if filtered.is_empty() {
            debug!("No beacons left after filtering. Correction skipped.");
        } else {
            self.correct(&filtered, UpdateKind::Corrected)?;
        }
        self.notify();
        Ok(())
    }

    /// Reinitializes from the uninformed prior.
    ///
    /// Returns `Ok(false)` and stores the request when no orientation is
    /// available yet.
    pub fn reset_status(&mut self) -> Result<bool, FilterError> {
        self.request_reset(PendingReset::Uniform)
    }

    pub fn reset_status_to_pose(&mut self, pose: Pose) -> Result<bool, FilterError> {
        self.request_reset(PendingReset::ToPose(pose))
    }

    pub fn reset_status_with_spread(
        &mut self,
        mean: Pose,
        stdev: Pose,
    ) -> Result<bool, FilterError> {
        self.request_reset(PendingReset::ToPoseWithSpread { mean, stdev })
    }

    /// Reinitializes around the beacons heard in `beacons`. Does not depend on
    /// orientation and is applied right away.
    pub fn reset_status_from_beacons(&mut self, beacons: &Beacons) -> Result<(), FilterError> {
        let filtered = self.filter_beacons(beacons);
        let states = self
            .status_initializer
            .reset_states_from_beacons(self.config.num_states, &filtered)?;
        self.status = Status::new(states, UpdateKind::Reset, Some(beacons.timestamp));
        self.notify();
        Ok(())
    }

    /// Corrects with `beacons` and reseeds one fresh particle on every
    /// resulting location.
    ///
    /// Always returns `Ok(false)`: refinement never settles on a final answer.
    pub fn refine_status(&mut self, beacons: &Beacons) -> Result<bool, FilterError> {
        self.initialize_status_if_empty()?;
        let filtered = self.filter_beacons(beacons);
        if !filtered.is_empty() {
            self.correct(&filtered, UpdateKind::Corrected)?;
        }
        let locations: Vec<Location> = self.status.states().iter().map(State::location).collect();
        let states = self
            .status_initializer
            .initialize_states_from_locations(&locations)?;
        self.status = Status::new(states, UpdateKind::Refined, Some(beacons.timestamp));
        self.notify();
        Ok(false)
    }

    pub fn set_num_states(&mut self, num_states: usize) {
        self.config.num_states = num_states;
    }

    pub fn set_alpha_weaken(&mut self, alpha_weaken: f64) {
        self.config.alpha_weaken = alpha_weaken;
    }

    pub fn set_pending_reset_policy(&mut self, policy: PendingResetPolicy) {
        self.config.pending_reset_policy = policy;
    }

    pub fn set_pedometer(&mut self, pedometer: Box<dyn Pedometer>) {
        self.pedometer = pedometer;
    }

    pub fn set_orientation_meter(&mut self, orientation_meter: Box<dyn OrientationMeter>) {
        self.orientation_meter = orientation_meter;
    }

    pub fn set_encoder(&mut self, encoder: Box<dyn Encoder>) {
        self.encoder = encoder;
    }

    pub fn set_motion_model(&mut self, motion_model: Box<dyn MotionModel>) {
        self.motion_model = motion_model;
    }

    pub fn set_observation_model(&mut self, observation_model: Box<dyn ObservationModel>) {
        self.observation_model = observation_model;
    }

    pub fn set_resampler(&mut self, resampler: Box<dyn Resampler>) {
        self.resampler = resampler;
    }

    pub fn set_status_initializer(&mut self, status_initializer: Box<dyn StatusInitializer>) {
        self.status_initializer = status_initializer;
    }

    pub fn set_beacon_filter(&mut self, beacon_filter: Option<Box<dyn BeaconFilter>>) {
        self.beacon_filter = beacon_filter;
    }

    pub fn set_listener(&mut self, listener: Option<Box<dyn StatusListener>>) {
        self.listener = listener;
    }

    /// Overrides the movement level of the motion model. `None` goes back to
    /// the pedometer's step count.
    pub fn control_movement(&mut self, movement: Option<f64>) {
        self.motion_model.control_movement(movement);
    }

    fn initialize_status_if_empty(&mut self) -> Result<(), FilterError> {
        if self.status.is_empty() {
            self.initialize_status()?;
        }
        Ok(())
    }

    fn initialize_status(&mut self) -> Result<(), FilterError> {
        self.pedometer.reset();
        self.orientation_meter.reset();
        let states = self
            .status_initializer
            .initialize_states(self.config.num_states)?;
        self.status = Status::new(states, UpdateKind::Initialized, None);
        Ok(())
    }

    fn predict(&mut self, timestamp: i64) -> Result<(), FilterError> {
        let input = MotionInput {
            timestamp,
            previous_timestamp: self.previous_timestamp.unwrap_or(timestamp),
            n_steps: self.pedometer.n_steps(),
            yaw: self.orientation_meter.yaw(),
        };
        let encoder = self.encoder.encoder_info();
        let states = self
            .motion_model
            .predict_all(self.status.states(), &input, &encoder)?;
        self.status = Status::new(states, UpdateKind::Predicted, Some(timestamp));
        self.previous_timestamp = Some(timestamp);
        self.acceleration_is_updated = false;
        self.attitude_is_updated = false;
        trace!("Prediction at t={}", timestamp);

        self.notify();
        Ok(())
    }

    fn correct(&mut self, beacons: &Beacons, kind: UpdateKind) -> Result<(), FilterError> {
        let states = self.status.states();
        let n = states.len();
        if n == 0 {
            return Ok(());
        }

        let log_likelihoods = self.observation_model.compute_log_likelihood(states, beacons);
        if log_likelihoods.len() != n {
            return Err(FilterError::LikelihoodCountMismatch {
                expected: n,
                actual: log_likelihoods.len(),
            });
        }
        let weakened = weaken_log_likelihoods(&log_likelihoods, self.config.alpha_weaken);

        let mut weights = compute_weights_from_log_likelihood(&weakened);
        for (weight, state) in weights.iter_mut().zip(states) {
            *weight *= state.weight;
        }
        let sum: f64 = weights.iter().sum();
        if !(sum > 0.0) {
            return Err(FilterError::WeightDepletion { sum });
        }
        weights.iter_mut().for_each(|w| *w /= sum);

        let weighted: Vec<State> = states
            .iter()
            .zip(weakened.iter().zip(&weights))
            .map(|(state, (ll, weight))| State {
                weight: *weight,
                negative_log_likelihood: -ll,
                ..*state
            })
            .collect();
        if weighted.iter().map(|s| s.negative_log_likelihood).sum::<f64>() == 0.0 {
            return Err(FilterError::DegenerateLikelihood);
        }

        let mut resampled = self.resampler.resample(&weighted, &weights);
        if resampled.len() != n {
            return Err(FilterError::ResampledCountMismatch {
                expected: n,
                actual: resampled.len(),
            });
        }
        let weight = 1.0 / n as f64;
        resampled.iter_mut().for_each(|s| s.weight = weight);
        trace!("Resampling at t={}", beacons.timestamp);

        self.status = Status::new(resampled, kind, Some(beacons.timestamp));
        Ok(())
    }

    fn filter_beacons(&self, beacons: &Beacons) -> Beacons {
        let before = beacons.len();
        let cleansed = self.cleansing_filter.filter(beacons);
        let filtered = match &self.beacon_filter {
            Some(filter) => filter.filter(&cleansed),
            None => cleansed,
        };
        if filtered.len() != before {
            debug!("BeaconFilter #beacons {} >> {}", before, filtered.len());
        }
        filtered
    }

    fn request_reset(&mut self, reset: PendingReset) -> Result<bool, FilterError> {
        if self.orientation_meter.is_updated() {
            self.apply_reset(reset)?;
            self.pending_resets.clear();
            Ok(true)
        } else {
            info!("Orientation has not been updated. Reset input is cached to be processed later.");
            self.pending_resets.push(reset);
            Ok(false)
        }
    }

    fn process_pending_resets(&mut self) -> Result<(), FilterError> {
        if self.pending_resets.is_empty() || !self.orientation_meter.is_updated() {
            return Ok(());
        }
        let policy = self.config.pending_reset_policy;
        if let Some(reset) = self.pending_resets.next(policy) {
            self.apply_reset(reset)?;
            self.pending_resets.consume(policy);
            info!("Stored reset request was processed.");
        }
        Ok(())
    }

    fn apply_reset(&mut self, reset: PendingReset) -> Result<(), FilterError> {
        let n = self.config.num_states;
        let yaw = self.orientation_meter.yaw();
        let states = match reset {
            PendingReset::Uniform => self.status_initializer.initialize_states(n)?,
            PendingReset::ToPose(pose) => self.status_initializer.reset_states(n, pose, yaw)?,
            PendingReset::ToPoseWithSpread { mean, stdev } => self
                .status_initializer
                .reset_states_with_spread(n, mean, stdev, yaw)?,
        };
        self.status = Status::new(states, UpdateKind::Reset, self.status.timestamp());
        self.notify();
        Ok(())
    }

    fn notify(&mut self) {
        if let Some(listener) = self.listener.as_mut() {
            listener.on_status_updated(&self.status);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::sensors::{Beacon, EncoderWalkingPedometer};

    #[derive(Clone, Copy)]
    struct FlatModel;

    impl ObservationModel for FlatModel {
        fn compute_log_likelihood(&mut self, states: &[State], _: &Beacons) -> Vec<f64> {
            vec![-1.0; states.len()]
        }
    }

    fn filter(num_states: usize) -> StreamParticleFilter {
        StreamParticleFilter::builder()
            .observation_model(Box::new(FlatModel))
            .config(FilterConfig::builder().num_states(num_states).build())
            .build()
    }

    fn scan(timestamp: i64) -> Beacons {
        Beacons::new(timestamp, vec![Beacon::new(1, 1, -70.0)])
    }

    #[test]
    fn first_event_initializes_the_particle_set() {
        let mut filter = filter(100);
        assert!(filter.status().is_empty());
        filter
            .put_acceleration(&Acceleration::new(0, 0.0, 0.0, 1.0))
            .unwrap();
        assert_eq!(filter.status().len(), 100);
        assert_eq!(filter.status().last_update(), Some(UpdateKind::Initialized));
    }

    #[test]
    fn encoder_event_initializes_the_particle_set() {
        let mut filter = filter(30);
        filter.put_encoder(&EncoderInfo::default()).unwrap();
        assert_eq!(filter.status().len(), 30);
        assert_eq!(filter.status().last_update(), Some(UpdateKind::Initialized));
    }

    #[test]
    fn encoder_pedometer_drives_prediction() {
        let mut filter = StreamParticleFilter::builder()
            .observation_model(Box::new(FlatModel))
            .pedometer(Box::new(EncoderWalkingPedometer::default()))
            .config(FilterConfig::builder().num_states(20).build())
            .build();
        filter
            .put_attitude(&Attitude::new(0, 0.0, 0.0, 0.0))
            .unwrap();
        let reading = |timestamp| {
            EncoderInfo::builder()
                .timestamp(timestamp)
                .velocity_l(0.8)
                .velocity_r(0.8)
                .build()
        };
        filter.put_encoder(&reading(0)).unwrap();
        assert_eq!(filter.status().last_update(), Some(UpdateKind::Initialized));
        filter.put_encoder(&reading(100)).unwrap();
        assert_eq!(filter.status().last_update(), Some(UpdateKind::Predicted));
        assert_eq!(filter.status().timestamp(), Some(100));
    }

    #[test]
    fn acceleration_pedometer_ignores_encoder_events() {
        let mut filter = filter(10);
        filter
            .put_attitude(&Attitude::new(0, 0.0, 0.0, 0.0))
            .unwrap();
        for t in (0..=500).step_by(100) {
            filter
                .put_encoder(&EncoderInfo::builder().timestamp(t).build())
                .unwrap();
        }
        assert_eq!(filter.status().last_update(), Some(UpdateKind::Initialized));
    }

    #[test]
    fn correction_resets_weights_and_records_likelihood() {
        let mut filter = filter(50);
        filter.put_beacons(&scan(10)).unwrap();
        let status = filter.status();
        assert_eq!(status.last_update(), Some(UpdateKind::Corrected));
        assert_eq!(status.timestamp(), Some(10));
        for state in status.states() {
            assert_eq!(state.weight, 1.0 / 50.0);
            assert_eq!(state.negative_log_likelihood, 1.0);
        }
    }

    #[test]
    fn alpha_weakens_likelihood() {
        let mut filter = filter(10);
        filter.set_alpha_weaken(0.25);
        filter.put_beacons(&scan(10)).unwrap();
        assert!(filter
            .status()
            .states()
            .iter()
            .all(|s| s.negative_log_likelihood == 0.25));
    }

    #[test]
    fn empty_scan_skips_correction() {
        let mut filter = filter(10);
        filter
            .put_beacons(&Beacons::new(5, vec![Beacon::new(1, 1, 0.0)]))
            .unwrap();
        assert_eq!(filter.status().last_update(), Some(UpdateKind::Initialized));
    }

    #[test]
    fn reset_waits_for_orientation() {
        let mut filter = filter(10);
        assert_eq!(filter.reset_status(), Ok(false));
        assert_eq!(filter.pending_resets(), 1);
        filter
            .put_attitude(&Attitude::new(0, 0.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(filter.pending_resets(), 0);
        assert_eq!(filter.status().last_update(), Some(UpdateKind::Reset));
        assert_eq!(filter.reset_status(), Ok(true));
    }

    /// Fails every pose reset and delegates the rest.
    struct PoseResetFailure(PriorStatusInitializer);

    impl StatusInitializer for PoseResetFailure {
        fn initialize_states(&mut self, n: usize) -> Result<Vec<State>, FilterError> {
            self.0.initialize_states(n)
        }

        fn reset_states(&mut self, n: usize, _: Pose, _: f64) -> Result<Vec<State>, FilterError> {
            Err(FilterError::EmptyRandomSet { n, k: 0 })
        }

        fn reset_states_with_spread(
            &mut self,
            n: usize,
            mean: Pose,
            stdev: Pose,
            measured_orientation: f64,
        ) -> Result<Vec<State>, FilterError> {
            self.0
                .reset_states_with_spread(n, mean, stdev, measured_orientation)
        }

        fn reset_states_from_beacons(
            &mut self,
            n: usize,
            beacons: &Beacons,
        ) -> Result<Vec<State>, FilterError> {
            self.0.reset_states_from_beacons(n, beacons)
        }

        fn initialize_states_from_locations(
            &mut self,
            locations: &[Location],
        ) -> Result<Vec<State>, FilterError> {
            self.0.initialize_states_from_locations(locations)
        }
    }

    #[test]
    fn failed_stored_reset_stays_queued() {
        let mut filter = StreamParticleFilter::builder()
            .observation_model(Box::new(FlatModel))
            .status_initializer(Box::new(PoseResetFailure(PriorStatusInitializer::default())))
            .config(FilterConfig::builder().num_states(10).build())
            .build();
        assert_eq!(filter.reset_status_to_pose(Pose::new(1, 1, 0)), Ok(false));

        let result = filter.put_attitude(&Attitude::new(0, 0.0, 0.0, 0.0));
        assert_eq!(result, Err(FilterError::EmptyRandomSet { n: 10, k: 0 }));
        assert_eq!(filter.pending_resets(), 1);
        assert_eq!(filter.status().last_update(), Some(UpdateKind::Initialized));
    }

    #[test]
    fn refine_reseeds_and_reports_false() {
        let mut filter = filter(20);
        assert_eq!(filter.refine_status(&scan(3)), Ok(false));
        assert_eq!(filter.status().len(), 20);
        assert_eq!(filter.status().last_update(), Some(UpdateKind::Refined));
    }
}
