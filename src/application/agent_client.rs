use super::agent_state::AgentState;
use super::orchestrator::{OrchestratorPorts, TrajectoryOrchestrator};
use super::playback::PlaybackDriver;
use super::prefetch::{run_prefetch_loop, PrefetchPolicy, PrefetchScheduler};
use crate::config::Config;
use crate::domains::logger::{AgentLogger, DynLogger};
use crate::domains::motion::Vec3;
use crate::domains::trajectory::{AgentBody, AgentEvent, CollisionService};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentOutcome {
    GoalReached,
    Cancelled,
}

/// Streaming prediction client for one agent.
///
/// `run` multiplexes the playback driver and the prefetch scheduler on the
/// calling task; both stop as soon as the goal is reached or the client's
/// cancellation token fires.
pub struct PedestrianClient {
    agent_id: String,
    config: Arc<Config>,
    body: Arc<dyn AgentBody>,
    goal: Vec3,
    state: Arc<AgentState>,
    orchestrator: TrajectoryOrchestrator,
    playback: PlaybackDriver,
    logger: DynLogger,
}

impl PedestrianClient {
    pub fn new(
        agent_id: impl Into<String>,
        config: Arc<Config>,
        body: Arc<dyn AgentBody>,
        goal: Vec3,
        ports: OrchestratorPorts,
        logger: DynLogger,
    ) -> Self {
        Self::with_cancellation(
            agent_id,
            config,
            body,
            goal,
            ports,
            logger,
            CancellationToken::new(),
        )
    }

    /// Like `new`, but tied to an externally owned token (for example a
    /// child of a crowd-wide shutdown token).
    pub fn with_cancellation(
        agent_id: impl Into<String>,
        config: Arc<Config>,
        body: Arc<dyn AgentBody>,
        goal: Vec3,
        ports: OrchestratorPorts,
        logger: DynLogger,
        cancel: CancellationToken,
    ) -> Self {
        let agent_id = agent_id.into();
        let logger = AgentLogger::scoped(agent_id.clone(), logger);
        let state = Arc::new(AgentState::new(&config, cancel));
        let orchestrator = TrajectoryOrchestrator::new(
            agent_id.clone(),
            Arc::clone(&config),
            ports,
            Arc::clone(&logger),
        );
        let playback = PlaybackDriver::new(
            agent_id.clone(),
            config.playback.clone(),
            Arc::clone(&body),
            goal,
            Arc::clone(&logger),
        )
        .with_idle_tick(config.prefetch.tick());

        Self { agent_id, config, body, goal, state, orchestrator, playback, logger }
    }

    pub fn with_events(mut self, events: mpsc::Sender<AgentEvent>) -> Self {
        self.orchestrator = self.orchestrator.with_events(events.clone());
        self.playback = self.playback.with_events(events);
        self
    }

    pub fn with_collision_service(mut self, service: Arc<dyn CollisionService>) -> Self {
        self.playback = self.playback.with_collision_service(service);
        self
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Shared state, for inspection by the host.
    pub fn state(&self) -> Arc<AgentState> {
        Arc::clone(&self.state)
    }

    /// Cancelling this token stops the agent; used when its body is destroyed.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.state.cancellation().clone()
    }

    pub async fn run(self) -> AgentOutcome {
        let Self { config, body, goal, state, orchestrator, mut playback, logger, .. } = self;
        logger.info(&format!(
            "starting at ({:.2}, {:.2}), goal ({:.2}, {:.2})",
            body.pose().position.x,
            body.pose().position.z,
            goal.x,
            goal.z
        ));

        let scheduler = PrefetchScheduler::new(PrefetchPolicy::from_config(&config.prefetch));
        tokio::join!(
            playback.run(&state),
            run_prefetch_loop(
                scheduler,
                &config.prefetch,
                &orchestrator,
                &state,
                body.as_ref(),
                goal,
                &logger,
            ),
        );

        if state.goal_reached() {
            AgentOutcome::GoalReached
        } else {
            logger.info("stopped before reaching goal");
            AgentOutcome::Cancelled
        }
    }
}
