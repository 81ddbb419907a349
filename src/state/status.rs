use alloc::vec::Vec;

use nalgebra::Vector2;

use super::{particle::State, pose::Pose};
use crate::utils::math::circular_mean;

/// Which step of the filter produced a status.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UpdateKind {
    Initialized,
    Predicted,
    Corrected,
    Reset,
    Refined,
}

/// The filter's belief: the particle set plus cross-cycle bookkeeping.
///
/// A status is never edited after it is published. Every cycle builds a new
/// one and swaps it in.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Status {
    states: Vec<State>,
    timestamp: Option<i64>,
    last_update: Option<UpdateKind>,
}

impl Status {
    pub fn new(states: Vec<State>, last_update: UpdateKind, timestamp: Option<i64>) -> Self {
        Self {
            states,
            timestamp,
            last_update: Some(last_update),
        }
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Timestamp in milliseconds of the event that produced this status, when
    /// it came from a sensor event.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn last_update(&self) -> Option<UpdateKind> {
        self.last_update
    }

    pub fn weight_sum(&self) -> f64 {
        self.states.iter().map(|s| s.weight).sum()
    }

    /// Weighted mean pose. The heading is a circular mean.
    ///
    /// Returns `None` for an empty or zero-weight set.
    pub fn mean_pose(&self) -> Option<Pose> {
        let total_weight = self.weight_sum();
        if self.states.is_empty() || total_weight <= 0.0 {
            return None;
        }
        let position = self
            .states
            .iter()
            .fold(Vector2::<f64>::zeros(), |acc, s| acc + s.pose.position * s.weight)
            / total_weight;
        let orientation = circular_mean(self.states.iter().map(|s| (s.orientation(), s.weight)))
            .unwrap_or(0.0);
        Some(Pose {
            position,
            orientation,
        })
    }

    /// `1 / sum(w_i^2)` over normalized weights.
    pub fn effective_sample_size(&self) -> f64 {
        let total_weight = self.weight_sum();
        if total_weight <= 0.0 {
            return 0.0;
        }
        let sum_sq: f64 = self
            .states
            .iter()
            .map(|s| {
                let w = s.weight / total_weight;
                w * w
            })
            .sum();
        1.0 / sum_sq
    }
}
