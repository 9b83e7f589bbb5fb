use crate::common::DomainEvent;
use crate::domains::motion::Vec3;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    FetchSucceeded {
        agent_id: String,
        request_id: Uuid,
        rtt_sec: f64,
        candidates: usize,
        chosen: usize,
        timestamp: DateTime<Utc>,
    },
    FetchFailed {
        agent_id: String,
        request_id: Uuid,
        reason: String,
        avg_rtt_sec: f64,
        timestamp: DateTime<Utc>,
    },
    CandidatesBlocked {
        agent_id: String,
        attempt: u32,
        max_attempts: u32,
        timestamp: DateTime<Utc>,
    },
    BatchEnqueued {
        agent_id: String,
        batch_id: Uuid,
        steps: usize,
        evicted: Option<Uuid>,
        timestamp: DateTime<Utc>,
    },
    BatchStarted {
        agent_id: String,
        batch_id: Uuid,
        start_index: usize,
        anchor: Option<i64>,
        timestamp: DateTime<Utc>,
    },
    GoalReached {
        agent_id: String,
        position: Vec3,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent for AgentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AgentEvent::FetchSucceeded { .. } => "FetchSucceeded",
            AgentEvent::FetchFailed { .. } => "FetchFailed",
            AgentEvent::CandidatesBlocked { .. } => "CandidatesBlocked",
            AgentEvent::BatchEnqueued { .. } => "BatchEnqueued",
            AgentEvent::BatchStarted { .. } => "BatchStarted",
            AgentEvent::GoalReached { .. } => "GoalReached",
        }
    }

    fn agent_id(&self) -> &str {
        match self {
            AgentEvent::FetchSucceeded { agent_id, .. }
            | AgentEvent::FetchFailed { agent_id, .. }
            | AgentEvent::CandidatesBlocked { agent_id, .. }
            | AgentEvent::BatchEnqueued { agent_id, .. }
            | AgentEvent::BatchStarted { agent_id, .. }
            | AgentEvent::GoalReached { agent_id, .. } => agent_id,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AgentEvent::FetchSucceeded { timestamp, .. }
            | AgentEvent::FetchFailed { timestamp, .. }
            | AgentEvent::CandidatesBlocked { timestamp, .. }
            | AgentEvent::BatchEnqueued { timestamp, .. }
            | AgentEvent::BatchStarted { timestamp, .. }
            | AgentEvent::GoalReached { timestamp, .. } => *timestamp,
        }
    }
}
