use crate::domains::logger::{DomainLogger, DynLogger};
use std::sync::Arc;

/// Forwards domain messages to `tracing` under the `crowdpilot::agent` target.
struct TracingBridge;

impl DomainLogger for TracingBridge {
    fn info(&self, msg: &str) {
        tracing::info!(target: "crowdpilot::agent", "{}", msg);
    }

    fn warn(&self, msg: &str) {
        tracing::warn!(target: "crowdpilot::agent", "{}", msg);
    }

    fn error(&self, msg: &str) {
        tracing::error!(target: "crowdpilot::agent", "{}", msg);
    }

    fn debug(&self, msg: &str) {
        tracing::debug!(target: "crowdpilot::agent", "{}", msg);
    }
}

/// Console logger routed through whatever tracing subscriber is installed.
pub fn init_console_logger() -> DynLogger {
    Arc::new(TracingBridge)
}
