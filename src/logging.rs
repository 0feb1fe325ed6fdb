//! Diagnostic logging.
//!
//! Compact timestamped output with per-module levels taken from the
//! `[logging]` settings table. `RUST_LOG` overrides the settings:
//!
//! ```bash
//! RUST_LOG=debug jxrwatch watch ./in ./out
//! RUST_LOG=jxrwatch::watcher=trace jxrwatch watch ./in ./out
//! ```
//!
//! The per-session conversion log is separate, see
//! [`LogFileSink`](crate::sink::LogFileSink).

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Build the filter directive string for a logging config.
fn directives(config: &LoggingConfig) -> String {
    let mut filter = config.default.clone();
    for (module, level) in &config.modules {
        filter.push_str(&format!(",{module}={level}"));
    }
    filter
}

/// Install the global subscriber. Only the first call takes effect.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(directives(config))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_timer(CompactTime)
            .with_level(true)
            .with_writer(std::io::stderr)
            .with_filter(filter);

        // A subscriber may already be installed by a test harness.
        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    });
}

/// Log a component event at info level.
///
/// ```ignore
/// log_event!("session", "watching", "{}", dir.display());
/// log_event!("watcher", "stopped");
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Log a component event at debug level.
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}
