use super::agent_client::{AgentOutcome, PedestrianClient};
use crate::common::ApplicationError;
use crate::domains::logger::DynLogger;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrowdReport {
    pub reached: Vec<String>,
    pub cancelled: Vec<String>,
    /// Agents whose task panicked or was aborted.
    pub failed: usize,
}

/// Runs many agent clients side by side. Each agent gets its own task, so
/// one agent's failure never stalls the others.
pub struct CrowdRunner {
    shutdown: CancellationToken,
    tasks: JoinSet<(String, AgentOutcome)>,
    logger: DynLogger,
}

impl CrowdRunner {
    pub fn new(logger: DynLogger) -> Self {
        Self { shutdown: CancellationToken::new(), tasks: JoinSet::new(), logger }
    }

    /// Parent of every agent token handed out by `agent_token`.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn agent_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub fn spawn(&mut self, client: PedestrianClient) {
        let id = client.agent_id().to_string();
        self.tasks.spawn(async move { (id, client.run().await) });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub async fn join_all(mut self) -> CrowdReport {
        let mut report = CrowdReport::default();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((id, AgentOutcome::GoalReached)) => report.reached.push(id),
                Ok((id, AgentOutcome::Cancelled)) => report.cancelled.push(id),
                Err(e) => {
                    let err = ApplicationError::AgentTask(e.to_string());
                    self.logger.error(&err.to_string());
                    report.failed += 1;
                }
            }
        }
        report.reached.sort();
        report.cancelled.sort();
        report
    }
}
