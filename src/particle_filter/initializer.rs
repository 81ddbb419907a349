use alloc::vec::Vec;
use core::f64::consts::PI;

use bon::Builder;
use num_traits::Float;

use crate::{
    error::FilterError,
    motion_models::{PoseProperty, StateProperty},
    sensors::{beacon::BeaconMap, Beacons},
    state::{Location, Pose, State},
    utils::{math::normalize_orientation, samplers::RandomGenerator},
};

/// Builds particle sets from priors.
///
/// `measured_orientation` is the yaw the orientation meter reports at reset
/// time. Particles store the offset between it and their heading as
/// orientation bias.
pub trait StatusInitializer {
    /// Uninformed prior.
    fn initialize_states(&mut self, n: usize) -> Result<Vec<State>, FilterError>;

    /// Every particle at `pose`.
    fn reset_states(
        &mut self,
        n: usize,
        pose: Pose,
        measured_orientation: f64,
    ) -> Result<Vec<State>, FilterError>;

    /// Gaussian prior with per-axis standard deviation `stdev`.
    fn reset_states_with_spread(
        &mut self,
        n: usize,
        mean: Pose,
        stdev: Pose,
        measured_orientation: f64,
    ) -> Result<Vec<State>, FilterError>;

    /// Prior anchored on the beacons heard in `beacons`.
    fn reset_states_from_beacons(
        &mut self,
        n: usize,
        beacons: &Beacons,
    ) -> Result<Vec<State>, FilterError>;

    /// One particle per location.
    fn initialize_states_from_locations(
        &mut self,
        locations: &[Location],
    ) -> Result<Vec<State>, FilterError>;
}

#[derive(Clone, PartialEq, Debug, Builder)]
pub struct InitializerConfig {
    /// Lower corner of the area the uninformed prior covers.
    #[builder(default = Location::zeros())]
    pub area_min: Location,

    #[builder(default = Location::new(10.0, 10.0))]
    pub area_max: Location,

    /// Standard deviation in meters around the beacon-weighted centroid.
    #[builder(default = 2.0)]
    pub beacon_spread: f64,

    /// Strongest known beacons averaged into the centroid.
    #[builder(default = 3)]
    pub max_anchor_beacons: usize,

    /// Standard deviation of the initial RSSI bias, in dB.
    #[builder(default = 2.0)]
    pub std_rssi_bias: f64,

    #[builder(default)]
    pub pose_property: PoseProperty,

    #[builder(default)]
    pub state_property: StateProperty,

    #[builder(default)]
    pub beacon_map: BeaconMap,
}

impl Default for InitializerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Samples particles from rectangular, pose-anchored, Gaussian and
/// beacon-anchored priors.
#[derive(Clone, Debug, Default)]
pub struct PriorStatusInitializer {
    config: InitializerConfig,
    random: RandomGenerator,
}

impl PriorStatusInitializer {
    pub fn new(config: InitializerConfig, random: RandomGenerator) -> Self {
        Self { config, random }
    }

    pub fn config(&self) -> &InitializerConfig {
        &self.config
    }

    fn random_orientation(&mut self) -> f64 {
        normalize_orientation(self.random.next_uniform(-PI, PI))
    }

    fn sample_state(
        &mut self,
        position: Location,
        orientation: f64,
        measured_orientation: f64,
        weight: f64,
    ) -> Result<State, FilterError> {
        let pose_property = self.config.pose_property;
        let state_property = self.config.state_property;
        let (min, max) = (pose_property.min_velocity, pose_property.max_velocity);
        let normal_velocity = self.random.next_truncated_gaussian_around(
            pose_property.mean_velocity,
            pose_property.std_velocity,
            min,
            max,
        )?;
        let rssi_bias = self.random.next_truncated_gaussian_around(
            0.0,
            self.config.std_rssi_bias,
            state_property.min_rssi_bias,
            state_property.max_rssi_bias,
        )?;
        let orientation = normalize_orientation(orientation);
        let pose = Pose {
            position,
            orientation,
        };
        let orientation_bias = normalize_orientation(measured_orientation - orientation);
        Ok(State::new(pose, normal_velocity, orientation_bias, rssi_bias).with_weight(weight))
    }

    fn spread_around(
        &mut self,
        n: usize,
        center: Location,
        stdev: Location,
    ) -> Result<Vec<State>, FilterError> {
        let weight = 1.0 / n as f64;
        (0..n)
            .map(|_| {
                let position = Location::new(
                    center.x + stdev.x * self.random.next_gaussian(),
                    center.y + stdev.y * self.random.next_gaussian(),
                );
                let orientation = self.random_orientation();
                self.sample_state(position, orientation, 0.0, weight)
            })
            .collect()
    }

    /// RSSI-weighted centroid of the strongest beacons with a known location.
    fn beacon_centroid(&self, beacons: &Beacons) -> Option<Location> {
        let mut known: Vec<(f64, Location)> = beacons
            .iter()
            .filter(|b| b.rssi.is_finite())
            .filter_map(|b| self.config.beacon_map.location(&b.id).map(|l| (b.rssi, *l)))
            .collect();
        if known.is_empty() {
            return None;
        }
        known.sort_by(|a, b| b.0.total_cmp(&a.0));
        known.truncate(self.config.max_anchor_beacons.max(1));

        let strongest = known[0].0;
        let (sum, total) = known.iter().fold(
            (Location::zeros(), 0.0),
            |(sum, total), (rssi, location)| {
                // Relative received power, so the strongest beacon weighs 1.
                let w = 10.0_f64.powf((rssi - strongest) / 10.0);
                (sum + location * w, total + w)
            },
        );
        Some(sum / total)
    }
}

impl StatusInitializer for PriorStatusInitializer {
    fn initialize_states(&mut self, n: usize) -> Result<Vec<State>, FilterError> {
        let weight = 1.0 / n as f64;
        let (min, max) = (self.config.area_min, self.config.area_max);
        (0..n)
            .map(|_| {
                let position = Location::new(
                    self.random.next_uniform(min.x, max.x),
                    self.random.next_uniform(min.y, max.y),
                );
                let orientation = self.random_orientation();
                self.sample_state(position, orientation, 0.0, weight)
            })
            .collect()
    }

    fn reset_states(
        &mut self,
        n: usize,
        pose: Pose,
        measured_orientation: f64,
    ) -> Result<Vec<State>, FilterError> {
        let weight = 1.0 / n as f64;
        (0..n)
            .map(|_| self.sample_state(pose.position, pose.orientation, measured_orientation, weight))
            .collect()
    }

    fn reset_states_with_spread(
        &mut self,
        n: usize,
        mean: Pose,
        stdev: Pose,
        measured_orientation: f64,
    ) -> Result<Vec<State>, FilterError> {
        let weight = 1.0 / n as f64;
        (0..n)
            .map(|_| {
                let position = Location::new(
                    mean.x() + stdev.x() * self.random.next_gaussian(),
                    mean.y() + stdev.y() * self.random.next_gaussian(),
                );
                let orientation =
                    mean.orientation + stdev.orientation * self.random.next_gaussian();
                self.sample_state(position, orientation, measured_orientation, weight)
            })
            .collect()
    }

    fn reset_states_from_beacons(
        &mut self,
        n: usize,
        beacons: &Beacons,
    ) -> Result<Vec<State>, FilterError> {
        match self.beacon_centroid(beacons) {
            Some(center) => {
                let spread = self.config.beacon_spread;
                self.spread_around(n, center, Location::new(spread, spread))
            }
            None => self.initialize_states(n),
        }
    }

    fn initialize_states_from_locations(
        &mut self,
        locations: &[Location],
    ) -> Result<Vec<State>, FilterError> {
        let weight = 1.0 / locations.len() as f64;
        locations
            .iter()
            .map(|location| {
                let orientation = self.random_orientation();
                self.sample_state(*location, orientation, 0.0, weight)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use approx::assert_relative_eq;

    use super::*;
    use crate::sensors::{Beacon, BeaconId};

    fn initializer() -> PriorStatusInitializer {
        let beacon_map = [
            (BeaconId::new(1, 1), Location::new(0.0, 0.0)),
            (BeaconId::new(1, 2), Location::new(20.0, 0.0)),
        ]
        .into_iter()
        .collect();
        PriorStatusInitializer::new(
            InitializerConfig::builder().beacon_map(beacon_map).build(),
            RandomGenerator::new(21),
        )
    }

    #[test]
    fn uniform_prior_covers_the_area_with_equal_weights() {
        let states = initializer().initialize_states(500).unwrap();
        assert_eq!(states.len(), 500);
        for state in &states {
            assert!((0.0..10.0).contains(&state.x()));
            assert!((0.0..10.0).contains(&state.y()));
            assert!((-PI..PI).contains(&state.orientation()));
            assert!((0.1..=1.5).contains(&state.normal_velocity));
            assert!((-10.0..=10.0).contains(&state.rssi_bias));
            assert_eq!(state.weight, 1.0 / 500.0);
        }
    }

    #[test]
    fn pose_reset_stores_heading_offset_as_bias() {
        let pose = Pose::new(3.0, 4.0, 0.5);
        let states = initializer().reset_states(10, pose, 0.2).unwrap();
        for state in &states {
            assert_eq!(state.location(), pose.position);
            assert_eq!(state.orientation(), 0.5);
            assert_relative_eq!(state.orientation_bias, -0.3, epsilon = 1e-12);
            // The motion model recovers the pose heading from the measured yaw.
            assert_relative_eq!(
                normalize_orientation(0.2 - state.orientation_bias),
                0.5,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn spread_reset_is_centered_on_the_mean() {
        let mean = Pose::new(5.0, -2.0, 1.0);
        let stdev = Pose::new(0.5, 0.5, 0.1);
        let states = initializer()
            .reset_states_with_spread(2000, mean, stdev, 1.0)
            .unwrap();
        let n = states.len() as f64;
        let mean_x = states.iter().map(|s| s.x()).sum::<f64>() / n;
        let mean_y = states.iter().map(|s| s.y()).sum::<f64>() / n;
        assert_relative_eq!(mean_x, 5.0, epsilon = 0.05);
        assert_relative_eq!(mean_y, -2.0, epsilon = 0.05);
    }

    #[test]
    fn beacon_reset_centers_on_strong_beacons() {
        let beacons = Beacons::new(
            0,
            vec![
                Beacon::new(1, 1, -60.0),
                Beacon::new(1, 2, -90.0),
                Beacon::new(7, 7, -40.0),
            ],
        );
        let mut initializer = initializer();
        let centroid = initializer.beacon_centroid(&beacons).unwrap();
        assert!(centroid.x < 0.1);

        let states = initializer.reset_states_from_beacons(1000, &beacons).unwrap();
        let mean_x = states.iter().map(|s| s.x()).sum::<f64>() / 1000.0;
        assert_relative_eq!(mean_x, centroid.x, epsilon = 0.3);
    }

    #[test]
    fn unknown_beacons_fall_back_to_uniform_prior() {
        let beacons = Beacons::new(0, vec![Beacon::new(9, 9, -50.0)]);
        let states = initializer().reset_states_from_beacons(50, &beacons).unwrap();
        assert!(states.iter().all(|s| (0.0..10.0).contains(&s.x())));
    }

    #[test]
    fn locations_seed_one_particle_each() {
        let locations = [Location::new(1.0, 1.0), Location::new(2.0, 2.0)];
        let states = initializer()
            .initialize_states_from_locations(&locations)
            .unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[1].location(), locations[1]);
        assert_eq!(states[0].weight, 0.5);
    }
}
