use alloc::vec::Vec;

use log::trace;

use crate::{state::State, utils::samplers::RandomGenerator};

/// Draws a new particle set in proportion to the given weights.
pub trait Resampler {
    /// Returns as many particles as `states` holds. `weights` is normalized
    /// and aligned with `states`.
    fn resample(&mut self, states: &[State], weights: &[f64]) -> Vec<State>;
}

/// Low-variance resampling: one uniform offset, then `N` evenly spaced
/// pointers walked along the cumulative weights.
#[derive(Clone, Debug, Default)]
pub struct SystematicResampler {
    random: RandomGenerator,
}

impl SystematicResampler {
    pub fn new(random: RandomGenerator) -> Self {
        Self { random }
    }
}

impl Resampler for SystematicResampler {
    fn resample(&mut self, states: &[State], weights: &[f64]) -> Vec<State> {
        let n = states.len();
        if n == 0 {
            return Vec::new();
        }

        let mut partial_sums = Vec::with_capacity(n);
        let mut acc = 0.0;
        for weight in weights.iter().take(n) {
            acc += weight;
            partial_sums.push(acc);
        }

        let step = 1.0 / n as f64;
        let offset = self.random.next_uniform(0.0, step);
        let mut idx = 0;
        let resampled: Vec<State> = (0..n)
            .map(|i| {
                let target = offset + i as f64 * step;
                while idx < n - 1 && partial_sums.get(idx).is_some_and(|&s| s < target) {
                    idx += 1;
                }
                states[idx]
            })
            .collect();
        trace!("Resampled {} particles.", n);
        resampled
    }
}
