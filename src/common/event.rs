use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub trait DomainEvent: Send + Sync + Clone {
    fn event_type(&self) -> &'static str;
    fn agent_id(&self) -> &str;
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Serialized form of a domain event, suitable for shipping to a log sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub agent_id: String,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub source: String,
    pub occurred_at: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn new<E: DomainEvent + Serialize>(
        event: &E,
        source: &str,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_id: Uuid::new_v4(),
            agent_id: event.agent_id().to_string(),
            event_type: event.event_type().to_string(),
            event_data: serde_json::to_value(event)?,
            source: source.to_string(),
            occurred_at: event.occurred_at(),
        })
    }
}
