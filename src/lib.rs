pub mod cli;
pub mod config;
pub mod convert;
pub mod logging;
pub mod session;
pub mod sink;
pub mod watcher;

pub use config::Settings;
pub use convert::{Codec, ConversionOutcome, ConversionService, ImageCodec, OutcomeStatus};
pub use session::{SessionRegistry, SessionState, StartStatus, StopStatus, WatchConfig, WatchSession};
pub use sink::{EventQueue, LogFileSink, MemorySink, NotificationSink};
pub use watcher::WatchError;
