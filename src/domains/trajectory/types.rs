use crate::common::{DomainError, DomainResult};
use crate::domains::motion::{Pose, Vec3};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One ground-plane step vector as returned by the service. `None` marks a
/// malformed entry (too short or non-numeric).
pub type RawStep = Option<[f64; 2]>;

/// Absolute waypoints decoded from a raw step array, index-aligned with it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecodedPath {
    pub waypoints: Vec<Vec3>,
    /// First non-degenerate step.
    pub start_index: usize,
}

impl DecodedPath {
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn usable_len(&self) -> usize {
        self.waypoints.len().saturating_sub(self.start_index)
    }

    pub fn has_usable_steps(&self) -> bool {
        self.usable_len() > 0
    }

    pub fn first_usable(&self) -> Option<Vec3> {
        self.waypoints.get(self.start_index).copied()
    }

    pub fn last(&self) -> Option<Vec3> {
        if self.has_usable_steps() {
            self.waypoints.last().copied()
        } else {
            None
        }
    }

    /// Ground-plane length from `origin` through every usable waypoint.
    pub fn path_length_from(&self, origin: Vec3) -> f64 {
        let mut prev = origin;
        let mut total = 0.0;
        for wp in self.waypoints.iter().skip(self.start_index) {
            total += prev.ground_distance(*wp);
            prev = *wp;
        }
        total
    }
}

/// One decoded server response, ready for playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryBatch {
    pub id: Uuid,
    pub steps: Vec<RawStep>,
    /// Agent pose captured when the request was issued.
    pub base: Pose,
    pub step_dt: f64,
    pub rtt_sec: f64,
    pub server_latency_sec: Option<f64>,
    pub anchor: Option<i64>,
    pub path: DecodedPath,
    pub received_at: DateTime<Utc>,
}

impl TrajectoryBatch {
    pub fn new(
        steps: Vec<RawStep>,
        base: Pose,
        path: DecodedPath,
        step_dt: f64,
        rtt_sec: f64,
    ) -> DomainResult<Self> {
        if steps.is_empty() || path.is_empty() {
            return Err(DomainError::InvalidBatch {
                reason: "trajectory batch must contain at least one step".to_string(),
            });
        }
        if path.len() != steps.len() {
            return Err(DomainError::InvalidBatch {
                reason: format!(
                    "decoded path has {} waypoints for {} steps",
                    path.len(),
                    steps.len()
                ),
            });
        }
        if path.start_index > path.len() {
            return Err(DomainError::InvalidBatch {
                reason: format!(
                    "start index {} exceeds batch length {}",
                    path.start_index,
                    path.len()
                ),
            });
        }
        if !(step_dt > 0.0) {
            return Err(DomainError::InvalidBatch {
                reason: format!("step interval must be positive, got {}", step_dt),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            steps,
            base,
            step_dt,
            rtt_sec,
            server_latency_sec: None,
            anchor: None,
            path,
            received_at: Utc::now(),
        })
    }

    pub fn with_server_meta(mut self, latency_sec: Option<f64>, anchor: Option<i64>) -> Self {
        self.server_latency_sec = latency_sec;
        self.anchor = anchor;
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn start_index(&self) -> usize {
        self.path.start_index
    }
}
