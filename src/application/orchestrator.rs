use super::agent_state::AgentState;
use crate::common::{FetchError, TransportError};
use crate::config::Config;
use crate::domains::logger::DynLogger;
use crate::domains::motion::{Pose, Vec3};
use crate::domains::trajectory::{
    AgentBody, AgentEvent, CandidateEvaluator, DecodedPath, EndpointProbe, EvaluationContext,
    FrameDecoder, GroupPositionSource, ObservationSource, PredictionRequest, PredictionResponse,
    PredictionTransport, TrajectoryBatch,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use uuid::Uuid;

/// Collaborators the orchestrator talks to.
#[derive(Clone)]
pub struct OrchestratorPorts {
    pub transport: Arc<dyn PredictionTransport>,
    pub observation: Arc<dyn ObservationSource>,
    pub probe: Option<Arc<dyn EndpointProbe>>,
    pub group: Option<Arc<dyn GroupPositionSource>>,
}

struct Selected {
    batch: TrajectoryBatch,
    candidates: usize,
    chosen: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Enqueued { batch_id: Uuid, evicted: Option<Uuid> },
    /// Every attempt came back fully blocked; the scheduler will try again.
    GaveUp { attempts: u32 },
}

/// Owns the network round trip for one agent: builds the request, waits for
/// the response, decodes and filters candidates, and enqueues the result.
pub struct TrajectoryOrchestrator {
    agent_id: String,
    config: Arc<Config>,
    decoder: FrameDecoder,
    evaluator: CandidateEvaluator,
    ports: OrchestratorPorts,
    logger: DynLogger,
    events: Option<mpsc::Sender<AgentEvent>>,
}

impl TrajectoryOrchestrator {
    pub fn new(
        agent_id: impl Into<String>,
        config: Arc<Config>,
        ports: OrchestratorPorts,
        logger: DynLogger,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            decoder: FrameDecoder::new(config.decoder.clone()),
            evaluator: CandidateEvaluator::from_config(&config.selection),
            config,
            ports,
            logger,
            events: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::Sender<AgentEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.try_send(event);
        }
    }

    /// Goal relative to `pose`, in the axes the service expects.
    pub fn goal_offset(&self, pose: &Pose, goal: Vec3) -> [f64; 2] {
        let svc = &self.config.service;
        let mut rel = goal.sub(pose.position).flat();
        if svc.goal_in_local_frame {
            rel = pose.rotation.yaw_only().conjugate().rotate(rel);
        }
        let x = if svc.goal_flip_x { -rel.x } else { rel.x };
        let z = if svc.goal_flip_z { -rel.z } else { rel.z };
        [x, z]
    }

    pub fn build_request(
        &self,
        state: &AgentState,
        pose: &Pose,
        goal: Vec3,
    ) -> Result<PredictionRequest, FetchError> {
        let svc = &self.config.service;
        let image = self.ports.observation.capture(&self.agent_id)?;
        let group_rel_positions = match (&self.ports.group, svc.send_group_positions) {
            (Some(group), true) => group
                .others(&self.agent_id)
                .into_iter()
                .map(|p| {
                    let d = p.sub(pose.position);
                    [d.x, d.z]
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(PredictionRequest {
            request_id: Uuid::new_v4(),
            agent_id: self.agent_id.clone(),
            goal_offset: self.goal_offset(pose, goal),
            goal_format: svc.goal_format,
            remaining_time: state.remaining_time(),
            history: state.history_field(),
            group_field_name: svc.group_field_name.clone(),
            group_rel_positions,
            image,
        })
    }

    /// Picks the candidate to play, or `None` when all are blocked.
    pub fn choose_candidate(
        &self,
        paths: &[DecodedPath],
        pose: &Pose,
        goal: Vec3,
    ) -> Option<usize> {
        let probe = match (&self.ports.probe, self.config.selection.enabled) {
            (Some(probe), true) => probe,
            _ => return paths.iter().position(DecodedPath::has_usable_steps),
        };
        let ctx = EvaluationContext {
            agent_id: &self.agent_id,
            position: pose.position,
            forward: pose.rotation.forward(),
            goal,
        };
        let evaluation = self.evaluator.evaluate(paths, &ctx, probe.as_ref());
        for c in &evaluation.candidates {
            self.logger.debug(&format!(
                "candidate {}: heading={:.1} dist={:.2} len={:.2} blocked={} score={:.2}",
                c.index,
                c.heading_deviation_deg,
                c.end_distance,
                c.path_length,
                c.end_blocked,
                c.score
            ));
        }
        evaluation.chosen
    }

    /// One request/response round trip. Never mutates the queue.
    pub async fn fetch_once(
        &self,
        state: &AgentState,
        body: &dyn AgentBody,
        goal: Vec3,
    ) -> Result<TrajectoryBatch, FetchError> {
        if state.is_terminal() {
            return Err(FetchError::Cancelled);
        }
        let base = body.pose();
        let request = self.build_request(state, &base, goal)?;
        let request_id = request.request_id;
        let limit = self.config.service.request_timeout();

        let started = Instant::now();
        let result = tokio::select! {
            _ = state.cancellation().cancelled() => return Err(FetchError::Cancelled),
            r = timeout(limit, self.ports.transport.send(&request)) => r,
        };
        let rtt = started.elapsed().as_secs_f64();
        let avg = state.record_rtt(rtt);

        // The agent may have been torn down while the request was in flight.
        if state.is_terminal() {
            return Err(FetchError::Cancelled);
        }

        let outcome = match result {
            Err(_) => Err(FetchError::Transport(TransportError::Timeout(limit))),
            Ok(Err(e)) => Err(FetchError::Transport(e)),
            Ok(Ok(text)) => self.decode_response(&text, base, goal, rtt),
        };

        match &outcome {
            Ok(selected) => self.emit(AgentEvent::FetchSucceeded {
                agent_id: self.agent_id.clone(),
                request_id,
                rtt_sec: rtt,
                candidates: selected.candidates,
                chosen: selected.chosen,
                timestamp: Utc::now(),
            }),
            Err(FetchError::AllCandidatesBlocked { .. }) => {}
            Err(e) => self.emit(AgentEvent::FetchFailed {
                agent_id: self.agent_id.clone(),
                request_id,
                reason: e.to_string(),
                avg_rtt_sec: avg,
                timestamp: Utc::now(),
            }),
        }
        outcome.map(|selected| selected.batch)
    }

    fn decode_response(
        &self,
        text: &str,
        base: Pose,
        goal: Vec3,
        rtt: f64,
    ) -> Result<Selected, FetchError> {
        let response = PredictionResponse::parse(text)?;
        if response.is_empty() {
            return Err(FetchError::EmptyTrajectory);
        }

        let paths: Vec<DecodedPath> = response
            .candidates
            .iter()
            .map(|steps| self.decoder.decode(steps, base))
            .collect();
        if !paths.iter().any(DecodedPath::has_usable_steps) {
            return Err(FetchError::EmptyTrajectory);
        }

        let chosen = self
            .choose_candidate(&paths, &base, goal)
            .ok_or(FetchError::AllCandidatesBlocked { attempts: 1 })?;

        let steps = response.candidates[chosen].clone();
        let path = paths[chosen].clone();
        let batch = TrajectoryBatch::new(steps, base, path, self.config.playback.step_dt_sec, rtt)
            .map_err(|_| FetchError::EmptyTrajectory)?
            .with_server_meta(response.latency_sec, response.anchor_idx);

        self.logger.debug(&format!(
            "decoded candidate {} of {} ({} steps, start {})",
            chosen,
            paths.len(),
            batch.len(),
            batch.start_index()
        ));
        Ok(Selected { batch, candidates: paths.len(), chosen })
    }

    /// Sleeps for `delay` unless the agent is cancelled first.
    async fn pause(&self, state: &AgentState, delay: Duration) -> Result<(), FetchError> {
        tokio::select! {
            _ = state.cancellation().cancelled() => Err(FetchError::Cancelled),
            _ = sleep(delay) => Ok(()),
        }
    }

    /// Runs until one batch is enqueued, the blocked-retry budget is spent,
    /// the transport-retry budget is spent, or the agent is cancelled.
    pub async fn run_cycle(
        &self,
        state: &AgentState,
        body: &dyn AgentBody,
        goal: Vec3,
    ) -> Result<CycleOutcome, FetchError> {
        let result = self.cycle(state, body, goal).await;
        state.set_frozen(false);
        result
    }

    async fn cycle(
        &self,
        state: &AgentState,
        body: &dyn AgentBody,
        goal: Vec3,
    ) -> Result<CycleOutcome, FetchError> {
        let selection = &self.config.selection;
        let prefetch = &self.config.prefetch;
        let mut blocked_attempts = 0u32;
        let mut transport_failures = 0u32;

        loop {
            match self.fetch_once(state, body, goal).await {
                Ok(batch) => {
                    let batch_id = batch.id;
                    let steps = batch.len();
                    let evicted = state.push_batch(batch).map(|b| b.id);
                    if let Some(old) = evicted {
                        self.logger.info(&format!("queue full, evicted stale batch {}", old));
                    }
                    self.emit(AgentEvent::BatchEnqueued {
                        agent_id: self.agent_id.clone(),
                        batch_id,
                        steps,
                        evicted,
                        timestamp: Utc::now(),
                    });
                    return Ok(CycleOutcome::Enqueued { batch_id, evicted });
                }
                Err(FetchError::AllCandidatesBlocked { .. }) => {
                    blocked_attempts += 1;
                    state.set_frozen(true);
                    self.emit(AgentEvent::CandidatesBlocked {
                        agent_id: self.agent_id.clone(),
                        attempt: blocked_attempts,
                        max_attempts: selection.blocked_retry_attempts,
                        timestamp: Utc::now(),
                    });
                    self.logger.warn(&format!(
                        "all candidates blocked (attempt {}/{})",
                        blocked_attempts, selection.blocked_retry_attempts
                    ));
                    if blocked_attempts >= selection.blocked_retry_attempts.max(1) {
                        return Ok(CycleOutcome::GaveUp { attempts: blocked_attempts });
                    }
                    self.pause(state, selection.blocked_retry_delay()).await?;
                }
                Err(e) if !e.is_recoverable() => return Err(e),
                Err(e) => {
                    transport_failures += 1;
                    self.logger.warn(&format!(
                        "fetch failed ({}), retrying in {:?} (avg rtt {:.3}s)",
                        e,
                        prefetch.retry_delay(),
                        state.avg_rtt()
                    ));
                    if prefetch.max_transport_retries > 0
                        && transport_failures > prefetch.max_transport_retries
                    {
                        return Err(e);
                    }
                    self.pause(state, prefetch.retry_delay()).await?;
                }
            }
        }
    }
}
