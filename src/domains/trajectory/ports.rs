use super::wire::PredictionRequest;
use crate::common::{DomainResult, TransportError};
use crate::domains::motion::{Pose, Vec3};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Single request/response primitive to the prediction service.
/// Returns the raw response body.
#[async_trait]
pub trait PredictionTransport: Send + Sync {
    async fn send(&self, request: &PredictionRequest) -> Result<String, TransportError>;
}

/// Produces the opaque observation image attached to each request.
pub trait ObservationSource: Send + Sync {
    fn capture(&self, agent_id: &str) -> DomainResult<Vec<u8>>;
}

/// The rendered body an agent client moves around.
pub trait AgentBody: Send + Sync {
    fn pose(&self) -> Pose;
    fn set_pose(&self, pose: Pose);
    fn set_active(&self, active: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColliderClass {
    /// Other dynamic agents.
    Agent,
    /// Buildings, vehicles and other static geometry.
    Static,
}

/// Overlap query used to disqualify candidate endpoints.
pub trait EndpointProbe: Send + Sync {
    /// True when a sphere at `point` overlaps anything of `class`, ignoring
    /// `exclude_agent` and its children.
    fn overlaps(&self, point: Vec3, radius: f64, class: ColliderClass, exclude_agent: &str) -> bool;
}

/// Positions of other tracked actors, used for `group_rel_positions`.
pub trait GroupPositionSource: Send + Sync {
    fn others(&self, agent_id: &str) -> Vec<Vec3>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionResult {
    Clear,
    Collision,
    /// Nothing was published for the requested frame.
    Unknown,
}

impl CollisionResult {
    /// Unpublished frames fail closed.
    pub fn is_blocking(self) -> bool {
        !matches!(self, CollisionResult::Clear)
    }
}

/// Pull-based, frame-scoped collision predictions.
pub trait CollisionService: Send + Sync {
    fn query(&self, agent_id: &str, frame_id: u64) -> CollisionResult;
}
