use bon::Builder;

use super::reset::PendingResetPolicy;

/// Default size of the particle set.
pub const DEFAULT_NUM_STATES: usize = 1000;

#[derive(Clone, Copy, PartialEq, Debug, Builder)]
pub struct FilterConfig {
    #[builder(default = DEFAULT_NUM_STATES)]
    pub num_states: usize,

    /// Exponent applied to every likelihood. Values below 1 flatten the
    /// observation model.
    #[builder(default = 1.0)]
    pub alpha_weaken: f64,

    #[builder(default)]
    pub pending_reset_policy: PendingResetPolicy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
