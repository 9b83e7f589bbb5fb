use crate::domains::logger::{DomainLogger, DynLogger};
use chrono::Utc;
use once_cell::sync::OnceCell;
use std::sync::Arc;

static FAST_LOG_INIT: OnceCell<()> = OnceCell::new();

struct FastLogBridge;

impl DomainLogger for FastLogBridge {
    fn info(&self, msg: &str) {
        log::info!("{} - {}", Utc::now().to_rfc3339(), msg);
    }

    fn warn(&self, msg: &str) {
        log::warn!("{} - {}", Utc::now().to_rfc3339(), msg);
    }

    fn error(&self, msg: &str) {
        log::error!("{} - {}", Utc::now().to_rfc3339(), msg);
    }

    fn debug(&self, msg: &str) {
        log::debug!("{} - {}", Utc::now().to_rfc3339(), msg);
    }
}

/// File-backed logger using `fast_log`. The global `log` backend can only be
/// installed once per process; later calls reuse it regardless of `path`.
pub fn init_file_logger(path: &str) -> Result<DynLogger, String> {
    FAST_LOG_INIT.get_or_try_init(|| {
        fast_log::init(
            fast_log::config::Config::new()
                .file(path)
                .level(log::LevelFilter::Info),
        )
        .map(|_| ())
        .map_err(|e| format!("Failed to initialize fast_log at {}: {}", path, e))
    })?;
    Ok(Arc::new(FastLogBridge))
}
