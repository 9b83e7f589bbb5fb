use super::agent_state::{AgentState, SchedulerSnapshot};
use super::orchestrator::{CycleOutcome, TrajectoryOrchestrator};
use crate::config::PrefetchConfig;
use crate::domains::logger::DynLogger;
use crate::domains::motion::Vec3;
use crate::domains::trajectory::AgentBody;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchReason {
    /// Nothing is playing; the agent would otherwise stand still.
    PlaybackGap,
    LeadWindow { lead_steps: usize, remaining_steps: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchDecision {
    BufferFull,
    Fetch(FetchReason),
    Wait { lead_steps: usize, remaining_steps: usize },
}

/// Buffer-refill policy: fetch once the steps left in the playing batch no
/// longer cover the expected round trip plus a safety margin.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefetchPolicy {
    pub min_lead_steps: usize,
    pub extra_lead_steps: usize,
    pub safety_margin_sec: f64,
}

impl PrefetchPolicy {
    pub fn from_config(config: &PrefetchConfig) -> Self {
        Self {
            min_lead_steps: config.min_lead_steps,
            extra_lead_steps: config.extra_lead_steps,
            safety_margin_sec: config.safety_margin_sec,
        }
    }

    pub fn lead_steps(&self, avg_rtt_sec: f64, step_dt: f64) -> usize {
        if !(step_dt > 0.0) {
            return self.min_lead_steps + self.extra_lead_steps;
        }
        let needed = ((avg_rtt_sec + self.safety_margin_sec) / step_dt).ceil().max(0.0) as usize;
        needed.max(self.min_lead_steps) + self.extra_lead_steps
    }

    pub fn decide(&self, snapshot: &SchedulerSnapshot) -> PrefetchDecision {
        if snapshot.queued >= snapshot.capacity {
            return PrefetchDecision::BufferFull;
        }
        let cursor = &snapshot.cursor;
        if !cursor.is_playing() {
            return PrefetchDecision::Fetch(FetchReason::PlaybackGap);
        }

        let step_dt = if cursor.step_dt > 0.0 { cursor.step_dt } else { snapshot.default_step_dt };
        let lead_steps = self.lead_steps(snapshot.avg_rtt_sec, step_dt);
        let remaining_steps = cursor.remaining_steps();
        if remaining_steps <= lead_steps {
            PrefetchDecision::Fetch(FetchReason::LeadWindow { lead_steps, remaining_steps })
        } else {
            PrefetchDecision::Wait { lead_steps, remaining_steps }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Fetching,
}

/// Two-state scheduler. `tick` is evaluated by the caller-owned loop; it only
/// ever reports a fetch while idle.
#[derive(Debug, Clone)]
pub struct PrefetchScheduler {
    policy: PrefetchPolicy,
    phase: SchedulerPhase,
}

impl PrefetchScheduler {
    pub fn new(policy: PrefetchPolicy) -> Self {
        Self { policy, phase: SchedulerPhase::Idle }
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    pub fn policy(&self) -> &PrefetchPolicy {
        &self.policy
    }

    pub fn tick(&mut self, snapshot: &SchedulerSnapshot) -> Option<FetchReason> {
        if self.phase == SchedulerPhase::Fetching {
            return None;
        }
        match self.policy.decide(snapshot) {
            PrefetchDecision::Fetch(reason) => {
                self.phase = SchedulerPhase::Fetching;
                Some(reason)
            }
            _ => None,
        }
    }

    pub fn fetch_finished(&mut self) {
        self.phase = SchedulerPhase::Idle;
    }
}

/// Drives the scheduler until the agent becomes terminal.
pub async fn run_prefetch_loop(
    mut scheduler: PrefetchScheduler,
    config: &PrefetchConfig,
    orchestrator: &TrajectoryOrchestrator,
    state: &AgentState,
    body: &dyn AgentBody,
    goal: Vec3,
    logger: &DynLogger,
) {
    let mut ticker = interval(config.tick());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let token = state.cancellation().clone();

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if state.is_terminal() {
            break;
        }

        let snapshot = state.snapshot();
        let reason = match scheduler.tick(&snapshot) {
            Some(reason) => reason,
            None => continue,
        };
        if !state.try_begin_request() {
            scheduler.fetch_finished();
            continue;
        }
        tracing::debug!(?reason, queued = snapshot.queued, "prefetch triggered");

        let outcome = orchestrator.run_cycle(state, body, goal).await;
        state.end_request();
        scheduler.fetch_finished();

        match outcome {
            Ok(CycleOutcome::Enqueued { .. }) => {}
            Ok(CycleOutcome::GaveUp { attempts }) => {
                logger.warn(&format!("giving up fetch cycle after {} blocked attempts", attempts));
            }
            Err(e) if !e.is_recoverable() => break,
            Err(e) => logger.warn(&format!("fetch cycle failed: {}", e)),
        }
    }
}
