//! Outcome delivery to observers.
//!
//! Conversions publish into an [`EventQueue`]; a [`Dispatcher`] thread
//! forwards each outcome to the registered [`NotificationSink`]s. How an
//! outcome is rendered is up to the sink.

mod dispatcher;
mod log_file;
mod queue;

pub use dispatcher::Dispatcher;
pub use log_file::LogFileSink;
pub use queue::{EventQueue, OutcomePublisher};

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::convert::ConversionOutcome;

/// Receives each outcome once, in FIFO order.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, outcome: &ConversionOutcome);
}

/// Forward outcomes into a channel for subscribe-style consumers.
impl NotificationSink for Sender<ConversionOutcome> {
    fn deliver(&self, outcome: &ConversionOutcome) {
        let _ = self.send(outcome.clone());
    }
}

/// Keeps every outcome in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    outcomes: Mutex<Vec<ConversionOutcome>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<ConversionOutcome> {
        self.outcomes.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.outcomes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.lock().is_empty()
    }
}

impl NotificationSink for MemorySink {
    fn deliver(&self, outcome: &ConversionOutcome) {
        self.outcomes.lock().push(outcome.clone());
    }
}
