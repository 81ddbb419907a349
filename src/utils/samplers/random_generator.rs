use alloc::vec::Vec;

use log::trace;
use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::FilterError;

/// Seed used by [`RandomGenerator::default`], so that two filters built the
/// same way replay the same noise.
pub const DEFAULT_SEED: u64 = 5489;

/// Rejection attempts before a truncated gaussian gives up.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Stateful pseudo-random source shared by the motion models, the resampler
/// and the status initializer.
#[derive(Clone, Debug)]
pub struct RandomGenerator {
    rng: SmallRng,
    max_iterations: usize,
}

impl RandomGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Overrides the rejection budget of [`Self::next_truncated_gaussian`].
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Uniform integer in `[0, n]`, both ends included.
    pub fn next_int(&mut self, n: usize) -> usize {
        self.rng.random_range(0..=n)
    }

    /// Uniform double in `[0, 1)`.
    pub fn next_double(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Uniform double in `[min, max)`.
    pub fn next_uniform(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_double()
    }

    /// Standard normal sample.
    pub fn next_gaussian(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    /// Gaussian sample restricted to `[min, max]` by rejection.
    ///
    /// When no draw lands inside the range within the retry budget, the last
    /// draw is returned as is, even though it lies outside the range.
    ///
    /// # Errors
    /// [`FilterError::TruncationOutOfRange`] when `mean` is not inside
    /// `[min, max]`.
    pub fn next_truncated_gaussian(
        &mut self,
        mean: f64,
        std: f64,
        min: f64,
        max: f64,
    ) -> Result<f64, FilterError> {
        if !(min <= mean && mean <= max) {
            return Err(FilterError::TruncationOutOfRange { mean, min, max });
        }
        let mut value = mean;
        for _ in 0..self.max_iterations {
            value = mean + std * self.next_gaussian();
            if min <= value && value <= max {
                return Ok(value);
            }
        }
        trace!(
            "truncated gaussian exhausted {} attempts (mean={mean}, std={std}, range=[{min}, {max}])",
            self.max_iterations
        );
        Ok(value)
    }

    /// Truncated gaussian whose mean is `center` pulled into `[min, max]`.
    ///
    /// # Errors
    /// [`FilterError::TruncationOutOfRange`] when `min > max` or `center` is
    /// NaN.
    pub fn next_truncated_gaussian_around(
        &mut self,
        center: f64,
        std: f64,
        min: f64,
        max: f64,
    ) -> Result<f64, FilterError> {
        if !(min <= max) {
            return Err(FilterError::TruncationOutOfRange {
                mean: center,
                min,
                max,
            });
        }
        self.next_truncated_gaussian(center.clamp(min, max), std, min, max)
    }

    /// Draws `k` indices out of `0..n`.
    ///
    /// The indices are shuffled once and then read cyclically, so every index
    /// appears before any index repeats.
    pub fn random_set(&mut self, n: usize, k: usize) -> Result<Vec<usize>, FilterError> {
        if n == 0 || k == 0 {
            return Err(FilterError::EmptyRandomSet { n, k });
        }
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut self.rng);
        Ok((0..k).map(|i| indices[i % n]).collect())
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_int_covers_closed_range() {
        let mut random = RandomGenerator::new(1);
        let mut seen = [false; 4];
        for _ in 0..1000 {
            let value = random.next_int(3);
            assert!(value <= 3);
            seen[value] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn next_double_is_unit_interval() {
        let mut random = RandomGenerator::new(2);
        for _ in 0..1000 {
            let value = random.next_double();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn gaussian_has_unit_moments() {
        let mut random = RandomGenerator::new(3);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| random.next_gaussian()).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.05, "variance {var}");
    }

    #[test]
    fn truncated_gaussian_stays_in_range() {
        let mut random = RandomGenerator::new(4);
        let outside = (0..10_000)
            .map(|_| random.next_truncated_gaussian(0.0, 1.0, -1.0, 1.0).unwrap())
            .filter(|value| !(-1.0..=1.0).contains(value))
            .count();
        assert!(outside <= 10, "{outside} draws exhausted the retry budget");
    }

    #[test]
    fn truncated_gaussian_returns_last_draw_when_budget_runs_out() {
        let mut random = RandomGenerator::new(5).with_max_iterations(1);
        // A window this narrow is practically never hit in one attempt.
        let value = random
            .next_truncated_gaussian(0.0, 10.0, -1e-12, 1e-12)
            .unwrap();
        assert!(value.abs() > 1e-12);
    }

    #[test]
    fn truncated_gaussian_with_zero_std_returns_mean() {
        let mut random = RandomGenerator::default();
        assert_eq!(random.next_truncated_gaussian(0.4, 0.0, 0.1, 1.5), Ok(0.4));
    }

    #[test]
    fn truncated_gaussian_rejects_mean_outside_range() {
        let mut random = RandomGenerator::default();
        assert_eq!(
            random.next_truncated_gaussian(2.0, 1.0, -1.0, 1.0),
            Err(FilterError::TruncationOutOfRange {
                mean: 2.0,
                min: -1.0,
                max: 1.0
            })
        );
    }

    #[test]
    fn centered_truncation_pulls_the_center_into_range() {
        let mut random = RandomGenerator::default();
        assert_eq!(
            random.next_truncated_gaussian_around(-3.0, 0.0, 0.1, 1.5),
            Ok(0.1)
        );
        assert_eq!(
            random.next_truncated_gaussian_around(9.0, 0.0, 0.1, 1.5),
            Ok(1.5)
        );
    }

    #[test]
    fn centered_truncation_rejects_swapped_bounds() {
        let mut random = RandomGenerator::default();
        assert_eq!(
            random.next_truncated_gaussian_around(1.0, 0.5, 1.5, 0.1),
            Err(FilterError::TruncationOutOfRange {
                mean: 1.0,
                min: 1.5,
                max: 0.1
            })
        );
        assert!(random
            .next_truncated_gaussian_around(f64::NAN, 0.5, 0.1, 1.5)
            .is_err());
    }

    #[test]
    fn random_set_wraps_after_a_full_permutation() {
        let mut random = RandomGenerator::new(6);
        let set = random.random_set(5, 12).unwrap();
        assert_eq!(set.len(), 12);
        let mut first: Vec<usize> = set[..5].to_vec();
        first.sort_unstable();
        assert_eq!(first, [0, 1, 2, 3, 4]);
        assert_eq!(set[..5], set[5..10]);
        assert_eq!(set[..2], set[10..]);
    }

    #[test]
    fn random_set_rejects_empty_requests() {
        let mut random = RandomGenerator::default();
        assert_eq!(
            random.random_set(0, 3),
            Err(FilterError::EmptyRandomSet { n: 0, k: 3 })
        );
    }

    #[test]
    fn same_seed_replays_same_sequence() {
        let mut a = RandomGenerator::new(42);
        let mut b = RandomGenerator::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_gaussian(), b.next_gaussian());
        }
    }
}
