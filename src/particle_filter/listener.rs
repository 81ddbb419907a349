use crate::state::Status;

/// Receives every status the filter publishes.
///
/// The status is only borrowed for the duration of the call.
pub trait StatusListener {
    fn on_status_updated(&mut self, status: &Status);
}

impl<F: FnMut(&Status)> StatusListener for F {
    fn on_status_updated(&mut self, status: &Status) {
        self(status)
    }
}
