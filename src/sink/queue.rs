//! Outcome channel between conversion producers and the notification consumer.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::convert::ConversionOutcome;

/// Unbounded FIFO of outcomes. Publishing never blocks.
#[derive(Debug)]
pub struct EventQueue {
    sender: Sender<ConversionOutcome>,
    receiver: Receiver<ConversionOutcome>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// A producer handle. Clone it freely across threads.
    pub fn publisher(&self) -> OutcomePublisher {
        OutcomePublisher {
            sender: self.sender.clone(),
        }
    }

    /// Take everything queued right now, in FIFO order.
    pub fn drain(&self) -> Vec<ConversionOutcome> {
        self.receiver.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Give up the queue's own sender and keep only the consumer side.
    ///
    /// The receiver disconnects once every publisher has been dropped.
    pub fn into_receiver(self) -> Receiver<ConversionOutcome> {
        self.receiver
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer side of an [`EventQueue`].
#[derive(Debug, Clone)]
pub struct OutcomePublisher {
    sender: Sender<ConversionOutcome>,
}

impl OutcomePublisher {
    pub fn publish(&self, outcome: ConversionOutcome) {
        if let Err(e) = self.sender.send(outcome) {
            crate::debug_event!("queue", "dropped", "no consumer for {}", e.0);
        }
    }
}
