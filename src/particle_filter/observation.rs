use alloc::vec::Vec;

use num_traits::Float;

use crate::{sensors::Beacons, state::State};

/// Scores particles against a beacon scan.
pub trait ObservationModel {
    /// One log-likelihood per particle, in the order of `states`.
    fn compute_log_likelihood(&mut self, states: &[State], beacons: &Beacons) -> Vec<f64>;
}

/// Scales every log-likelihood by `alpha`, which raises every likelihood to
/// the power `alpha`.
pub fn weaken_log_likelihoods(log_likelihoods: &[f64], alpha: f64) -> Vec<f64> {
    log_likelihoods.iter().map(|ll| alpha * ll).collect()
}

/// Unnormalized weights `exp(ll - max(ll))`.
///
/// Shifting by the maximum keeps the best particle at weight 1 and avoids
/// underflow. If every entry is `-inf` the result is NaN.
pub fn compute_weights_from_log_likelihood(log_likelihoods: &[f64]) -> Vec<f64> {
    let max = log_likelihoods
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    log_likelihoods.iter().map(|ll| (ll - max).exp()).collect()
}
