use std::sync::Arc;

/// Domain-level logging port. Non-fallible from the domain's point of view.
pub trait DomainLogger: Send + Sync + 'static {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
    fn debug(&self, _msg: &str) {}
}

pub type DynLogger = Arc<dyn DomainLogger>;

/// Tags every message with the agent it concerns, so many clients can share
/// one sink.
pub struct AgentLogger {
    agent_id: String,
    inner: DynLogger,
}

impl AgentLogger {
    pub fn new(agent_id: impl Into<String>, inner: DynLogger) -> Self {
        Self { agent_id: agent_id.into(), inner }
    }

    pub fn scoped(agent_id: impl Into<String>, inner: DynLogger) -> DynLogger {
        Arc::new(Self::new(agent_id, inner))
    }
}

impl DomainLogger for AgentLogger {
    fn info(&self, msg: &str) {
        self.inner.info(&format!("[{}] {}", self.agent_id, msg));
    }

    fn warn(&self, msg: &str) {
        self.inner.warn(&format!("[{}] {}", self.agent_id, msg));
    }

    fn error(&self, msg: &str) {
        self.inner.error(&format!("[{}] {}", self.agent_id, msg));
    }

    fn debug(&self, msg: &str) {
        self.inner.debug(&format!("[{}] {}", self.agent_id, msg));
    }
}
