//! Thread that hands queued outcomes to notification sinks.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;

use crate::convert::ConversionOutcome;
use crate::watcher::WatchError;

use super::NotificationSink;

/// Delivers every outcome to every sink, in FIFO order.
///
/// Blocks on the channel rather than polling, and exits once all
/// publishers are gone and the queue is empty.
pub struct Dispatcher {
    thread: Option<JoinHandle<usize>>,
}

impl Dispatcher {
    pub fn spawn(
        receiver: Receiver<ConversionOutcome>,
        sinks: Vec<Arc<dyn NotificationSink>>,
    ) -> Result<Self, WatchError> {
        let thread = thread::Builder::new()
            .name("jxrwatch-notify".to_string())
            .spawn(move || {
                let mut delivered = 0;
                for outcome in receiver.iter() {
                    for sink in &sinks {
                        sink.deliver(&outcome);
                    }
                    delivered += 1;
                }
                delivered
            })
            .map_err(|e| WatchError::SpawnFailed {
                name: "notification",
                source: e,
            })?;

        Ok(Self {
            thread: Some(thread),
        })
    }

    /// Wait for the queue to drain. Returns the number of outcomes delivered.
    ///
    /// Only returns once every publisher has been dropped.
    pub fn join(mut self) -> usize {
        self.wait()
    }

    fn wait(&mut self) -> usize {
        match self.thread.take().map(JoinHandle::join) {
            Some(Ok(delivered)) => delivered,
            Some(Err(_)) => {
                tracing::error!("[notify] dispatcher thread panicked");
                0
            }
            None => 0,
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::OutcomeStatus;
    use crate::sink::{EventQueue, MemorySink};

    #[test]
    fn test_every_sink_sees_every_outcome_in_order() {
        let queue = EventQueue::new();
        let publisher = queue.publisher();
        let first = Arc::new(MemorySink::new());
        let second = Arc::new(MemorySink::new());
        let dispatcher = Dispatcher::spawn(
            queue.into_receiver(),
            vec![first.clone() as Arc<dyn NotificationSink>, second.clone()],
        )
        .unwrap();

        for i in 0..20 {
            publisher.publish(ConversionOutcome {
                source_name: format!("{i}.jxr"),
                destination_name: format!("{i}.jpg"),
                status: OutcomeStatus::Success,
            });
        }
        drop(publisher);

        assert_eq!(dispatcher.join(), 20);
        let expected: Vec<_> = (0..20).map(|i| format!("{i}.jxr")).collect();
        for sink in [first, second] {
            let names: Vec<_> = sink.snapshot().into_iter().map(|o| o.source_name).collect();
            assert_eq!(names, expected);
        }
    }
}
