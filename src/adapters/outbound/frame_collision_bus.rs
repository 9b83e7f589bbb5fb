use crate::domains::trajectory::{CollisionResult, CollisionService};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Frame-scoped collision predictions published by an upstream detector and
/// pulled by agents. Lookups for frames that were never published (or were
/// pruned) report `Unknown`.
#[derive(Debug, Default)]
pub struct FrameCollisionBus {
    frames: RwLock<BTreeMap<u64, BTreeMap<String, CollisionResult>>>,
}

impl FrameCollisionBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame_id: u64, agent_id: &str, result: CollisionResult) {
        if let Ok(mut frames) = self.frames.write() {
            frames.entry(frame_id).or_default().insert(agent_id.to_string(), result);
        }
    }

    /// Drops every frame older than `frame_id`.
    pub fn prune_before(&self, frame_id: u64) {
        if let Ok(mut frames) = self.frames.write() {
            *frames = frames.split_off(&frame_id);
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.read().map(|f| f.len()).unwrap_or(0)
    }
}

impl CollisionService for FrameCollisionBus {
    fn query(&self, agent_id: &str, frame_id: u64) -> CollisionResult {
        self.frames
            .read()
            .ok()
            .and_then(|frames| frames.get(&frame_id).and_then(|f| f.get(agent_id).copied()))
            .unwrap_or(CollisionResult::Unknown)
    }
}
