#![allow(dead_code)]

use async_trait::async_trait;
use crowdpilot::common::TransportError;
use crowdpilot::domains::logger::DomainLogger;
use crowdpilot::domains::motion::{Pose, Vec3};
use crowdpilot::domains::trajectory::{
    AgentBody, ColliderClass, EndpointProbe, PredictionRequest, PredictionTransport,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays canned responses in order, then repeats `fallback` forever.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<String, TransportError>>>,
    fallback: Option<String>,
    delay: Duration,
    pub requests: Mutex<Vec<PredictionRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<String, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(body: impl Into<String>) -> Self {
        let mut t = Self::new(Vec::new());
        t.fallback = Some(body.into());
        t
    }

    pub fn with_fallback(mut self, body: impl Into<String>) -> Self {
        self.fallback = Some(body.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PredictionTransport for ScriptedTransport {
    async fn send(&self, request: &PredictionRequest) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(r) => r,
            None => self.fallback.clone().ok_or(TransportError::EmptyBody),
        }
    }
}

/// Agent body kept entirely in memory.
pub struct MemoryBody {
    pose: Mutex<Pose>,
    active: AtomicBool,
    updates: AtomicUsize,
}

impl MemoryBody {
    pub fn at(position: Vec3) -> Arc<Self> {
        Arc::new(Self {
            pose: Mutex::new(Pose::new(position, Default::default())),
            active: AtomicBool::new(true),
            updates: AtomicUsize::new(0),
        })
    }

    pub fn position(&self) -> Vec3 {
        self.pose.lock().unwrap().position
    }

    pub fn pose_now(&self) -> Pose {
        *self.pose.lock().unwrap()
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl AgentBody for MemoryBody {
    fn pose(&self) -> Pose {
        *self.pose.lock().unwrap()
    }

    fn set_pose(&self, pose: Pose) {
        *self.pose.lock().unwrap() = pose;
        self.updates.fetch_add(1, Ordering::SeqCst);
    }

    fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}

/// Probe that blocks any endpoint within a fixed distance of listed points.
pub struct Obstacles(pub Vec<Vec3>);

impl EndpointProbe for Obstacles {
    fn overlaps(&self, point: Vec3, radius: f64, class: ColliderClass, _exclude: &str) -> bool {
        class == ColliderClass::Static && self.0.iter().any(|o| o.ground_distance(point) < radius)
    }
}

pub struct CaptureLogger {
    pub messages: Mutex<Vec<String>>,
}

impl CaptureLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { messages: Mutex::new(Vec::new()) })
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().unwrap().iter().any(|m| m.contains(needle))
    }
}

impl DomainLogger for CaptureLogger {
    fn info(&self, msg: &str) {
        self.messages.lock().unwrap().push(format!("INFO:{}", msg));
    }
    fn warn(&self, msg: &str) {
        self.messages.lock().unwrap().push(format!("WARN:{}", msg));
    }
    fn error(&self, msg: &str) {
        self.messages.lock().unwrap().push(format!("ERR:{}", msg));
    }
}

/// `{"output": [[...]]}` body for a single cumulative trajectory.
pub fn single_output(steps: &[[f64; 2]]) -> String {
    serde_json::json!({ "output": [steps] }).to_string()
}

/// Straight cumulative walk along +X, with a leading origin marker.
pub fn straight_walk(steps: usize, stride: f64) -> Vec<[f64; 2]> {
    let mut v = vec![[0.0, 0.0]];
    v.extend((1..=steps).map(|i| [i as f64 * stride, 0.0]));
    v
}
