use thiserror::Error;

/// Failures that leave the particle set unusable or that come from violating
/// a sampling precondition.
///
/// None of these are repaired inside the crate. An embedding application is
/// expected to log the error and tear the filter down or reinitialize it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// The prior-times-likelihood weights summed to zero or NaN.
    #[error("particle weights collapsed after likelihood weighting (sum = {sum})")]
    WeightDepletion { sum: f64 },

    /// Every particle scored exactly zero log-likelihood.
    #[error("negative log-likelihoods of the particle set sum to zero")]
    DegenerateLikelihood,

    #[error("observation model returned {actual} log-likelihoods for {expected} particles")]
    LikelihoodCountMismatch { expected: usize, actual: usize },

    #[error("resampler returned {actual} particles, expected {expected}")]
    ResampledCountMismatch { expected: usize, actual: usize },

    #[error("truncated gaussian mean {mean} lies outside [{min}, {max}]")]
    TruncationOutOfRange { mean: f64, min: f64, max: f64 },

    #[error("cannot draw {k} indices out of {n}")]
    EmptyRandomSet { n: usize, k: usize },
}
