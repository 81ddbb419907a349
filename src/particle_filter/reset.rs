use alloc::collections::VecDeque;

use crate::state::Pose;

/// A reset that arrived before any orientation was available.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PendingReset {
    /// Reinitialize from the initializer's uninformed prior.
    Uniform,
    /// Reinitialize around a known pose.
    ToPose(Pose),
    /// Reinitialize from a Gaussian prior given as mean and per-axis spread.
    ToPoseWithSpread { mean: Pose, stdev: Pose },
}

/// How stored resets are drained once orientation becomes available.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PendingResetPolicy {
    /// Apply only the most recent request and drop the older ones.
    #[default]
    LatestWins,
    /// Apply one request per attitude event, oldest first.
    Fifo,
}

#[derive(Clone, Debug, Default)]
pub struct PendingResets {
    queue: VecDeque<PendingReset>,
}

impl PendingResets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reset: PendingReset) {
        self.queue.push_back(reset);
    }

    /// Next request to apply under `policy`, if any. The queue is left as is
    /// until [`Self::consume`] is called.
    pub fn next(&self, policy: PendingResetPolicy) -> Option<PendingReset> {
        match policy {
            PendingResetPolicy::LatestWins => self.queue.back().copied(),
            PendingResetPolicy::Fifo => self.queue.front().copied(),
        }
    }

    /// Drops what applying [`Self::next`] under `policy` used up.
    pub fn consume(&mut self, policy: PendingResetPolicy) {
        match policy {
            PendingResetPolicy::LatestWins => self.queue.clear(),
            PendingResetPolicy::Fifo => {
                self.queue.pop_front();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> PendingResets {
        let mut resets = PendingResets::new();
        resets.push(PendingReset::Uniform);
        resets.push(PendingReset::ToPose(Pose::new(1, 2, 0)));
        resets.push(PendingReset::ToPose(Pose::new(3, 4, 0)));
        resets
    }

    #[test]
    fn latest_wins_drops_older_requests() {
        let mut resets = filled();
        let policy = PendingResetPolicy::LatestWins;
        assert_eq!(resets.next(policy), Some(PendingReset::ToPose(Pose::new(3, 4, 0))));
        resets.consume(policy);
        assert!(resets.is_empty());
        assert_eq!(resets.next(policy), None);
    }

    #[test]
    fn fifo_yields_one_request_at_a_time() {
        let mut resets = filled();
        let policy = PendingResetPolicy::Fifo;
        assert_eq!(resets.next(policy), Some(PendingReset::Uniform));
        resets.consume(policy);
        assert_eq!(resets.len(), 2);
        assert_eq!(resets.next(policy), Some(PendingReset::ToPose(Pose::new(1, 2, 0))));
    }

    #[test]
    fn peeking_leaves_the_queue_untouched() {
        let resets = filled();
        for policy in [PendingResetPolicy::LatestWins, PendingResetPolicy::Fifo] {
            assert!(resets.next(policy).is_some());
            assert_eq!(resets.len(), 3);
        }
    }
}
