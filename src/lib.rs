pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pricing;
pub mod tracker;
pub mod watch;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

pub use config::AppConfig;
pub use db::Database;
pub use errors::{AppError, AppResult};
pub use models::{Collection, Item, ItemForm, ItemUpdate, NewItem, SellWatchEntry, TriggeredAlert};
pub use pricing::{PriceSource, WebPriceSource};
pub use tracker::TrackerCore;
pub use watch::{LogNotifier, Notifier};

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Structured logs go to a daily-rolling file under the data dir; stdout
/// stays free for the interactive surface.
pub fn init_tracing(data_dir: &Path) -> Result<(), String> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "tracker.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
