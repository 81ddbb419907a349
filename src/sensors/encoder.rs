use log::warn;

use super::{Encoder, EncoderInfo};

/// Keeps the most recent wheel odometry reading.
///
/// Readings older than the one held are ignored.
#[derive(Clone, Debug, Default)]
pub struct LatestEncoder {
    info: EncoderInfo,
    updated: bool,
}

impl LatestEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Encoder for LatestEncoder {
    fn put_encoder_info(&mut self, info: &EncoderInfo) {
        if self.updated && info.timestamp < self.info.timestamp {
            warn!(
                "Encoder reading at t={} is older than t={}, ignored.",
                info.timestamp, self.info.timestamp
            );
            return;
        }
        self.info = *info;
        self.updated = true;
    }

    fn is_updated(&self) -> bool {
        self.updated
    }

    fn encoder_info(&self) -> EncoderInfo {
        self.info
    }

    fn reset(&mut self) {
        self.info = EncoderInfo::default();
        self.updated = false;
    }
}
