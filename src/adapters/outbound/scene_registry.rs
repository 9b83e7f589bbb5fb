use crate::domains::motion::{Pose, Vec3};
use crate::domains::trajectory::{AgentBody, ColliderClass, EndpointProbe, GroupPositionSource};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug, Clone)]
struct Collider {
    class: ColliderClass,
    position: Vec3,
    radius: f64,
    /// Agent this collider belongs to, if any.
    owner: Option<String>,
}

/// In-memory scene: dynamic agents and static obstacles modelled as
/// ground-plane circles.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    colliders: RwLock<HashMap<String, Collider>>,
}

impl SceneRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_static(&self, id: impl Into<String>, position: Vec3, radius: f64) {
        self.insert(
            id.into(),
            Collider { class: ColliderClass::Static, position, radius, owner: None },
        );
    }

    pub fn upsert_agent(&self, id: &str, position: Vec3, radius: f64) {
        self.insert(
            id.to_string(),
            Collider { class: ColliderClass::Agent, position, radius, owner: Some(id.to_string()) },
        );
    }

    /// Collider attached to an agent (carried props and the like); ignored
    /// when that agent queries its own endpoints.
    pub fn attach_child(
        &self,
        id: impl Into<String>,
        owner: &str,
        class: ColliderClass,
        position: Vec3,
        radius: f64,
    ) {
        let owner = Some(owner.to_string());
        self.insert(id.into(), Collider { class, position, radius, owner });
    }

    pub fn remove(&self, id: &str) {
        if let Ok(mut colliders) = self.colliders.write() {
            colliders.remove(id);
        }
    }

    pub fn agent_count(&self) -> usize {
        self.colliders
            .read()
            .map(|c| c.values().filter(|c| c.class == ColliderClass::Agent).count())
            .unwrap_or(0)
    }

    /// Creates a body whose pose is mirrored into this registry.
    pub fn spawn_body(self: &Arc<Self>, id: &str, pose: Pose, radius: f64) -> Arc<RegisteredBody> {
        self.upsert_agent(id, pose.position, radius);
        Arc::new(RegisteredBody {
            id: id.to_string(),
            radius,
            registry: Arc::clone(self),
            state: Mutex::new(BodyState { pose, active: true, pose_updates: 0 }),
        })
    }

    fn insert(&self, id: String, collider: Collider) {
        if let Ok(mut colliders) = self.colliders.write() {
            colliders.insert(id, collider);
        }
    }
}

impl EndpointProbe for SceneRegistry {
    fn overlaps(
        &self,
        point: Vec3,
        radius: f64,
        class: ColliderClass,
        exclude_agent: &str,
    ) -> bool {
        let colliders = match self.colliders.read() {
            Ok(c) => c,
            // A poisoned scene cannot vouch for anything.
            Err(_) => return true,
        };
        colliders.iter().any(|(id, c)| {
            c.class == class
                && id != exclude_agent
                && c.owner.as_deref() != Some(exclude_agent)
                && c.position.ground_distance(point) < radius + c.radius
        })
    }
}

impl GroupPositionSource for SceneRegistry {
    fn others(&self, agent_id: &str) -> Vec<Vec3> {
        let colliders = match self.colliders.read() {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        let mut others: Vec<(&String, Vec3)> = colliders
            .iter()
            .filter(|(id, c)| {
                c.class == ColliderClass::Agent
                    && id.as_str() != agent_id
                    && c.owner.as_deref() != Some(agent_id)
            })
            .map(|(id, c)| (id, c.position))
            .collect();
        others.sort_by(|a, b| a.0.cmp(b.0));
        others.into_iter().map(|(_, p)| p).collect()
    }
}

#[derive(Debug)]
struct BodyState {
    pose: Pose,
    active: bool,
    pose_updates: u64,
}

/// Agent body backed by plain memory that keeps its registry entry in sync.
#[derive(Debug)]
pub struct RegisteredBody {
    id: String,
    radius: f64,
    registry: Arc<SceneRegistry>,
    state: Mutex<BodyState>,
}

impl RegisteredBody {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().map(|s| s.active).unwrap_or(false)
    }

    /// Number of `set_pose` calls applied so far.
    pub fn pose_updates(&self) -> u64 {
        self.state.lock().map(|s| s.pose_updates).unwrap_or(0)
    }
}

impl AgentBody for RegisteredBody {
    fn pose(&self) -> Pose {
        self.state.lock().map(|s| s.pose).unwrap_or_default()
    }

    fn set_pose(&self, pose: Pose) {
        let active = match self.state.lock() {
            Ok(mut s) => {
                s.pose = pose;
                s.pose_updates += 1;
                s.active
            }
            Err(_) => return,
        };
        if active {
            self.registry.upsert_agent(&self.id, pose.position, self.radius);
        }
    }

    fn set_active(&self, active: bool) {
        let pose = match self.state.lock() {
            Ok(mut s) => {
                s.active = active;
                s.pose
            }
            Err(_) => return,
        };
        if active {
            self.registry.upsert_agent(&self.id, pose.position, self.radius);
        } else {
            self.registry.remove(&self.id);
        }
    }
}
