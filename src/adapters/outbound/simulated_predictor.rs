use crate::common::TransportError;
use crate::domains::trajectory::{PredictionRequest, PredictionTransport};
use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct SimulatedPredictorConfig {
    /// Steps per returned trajectory, excluding the origin marker.
    pub steps: usize,
    pub speed: f64,
    pub step_dt: f64,
    pub candidates: usize,
    /// Heading spread between alternative candidates, in degrees.
    pub spread_deg: f64,
    pub emit_origin: bool,
    /// Use `output1..3` instead of a single `output` array.
    pub named_outputs: bool,
    pub latency: Duration,
    pub jitter: Duration,
}

impl Default for SimulatedPredictorConfig {
    fn default() -> Self {
        Self {
            steps: 12,
            speed: 1.4,
            step_dt: 0.04,
            candidates: 3,
            spread_deg: 25.0,
            emit_origin: true,
            named_outputs: false,
            latency: Duration::from_millis(120),
            jitter: Duration::from_millis(60),
        }
    }
}

/// Stand-in prediction service: walks straight at the goal offset carried by
/// the request, with rotated alternatives. Offsets are cumulative and in
/// world axes.
pub struct SimulatedPredictor {
    config: SimulatedPredictorConfig,
    next_anchor: AtomicI64,
    requests: AtomicUsize,
}

impl SimulatedPredictor {
    pub fn new(config: SimulatedPredictorConfig) -> Self {
        Self { config, next_anchor: AtomicI64::new(0), requests: AtomicUsize::new(0) }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Cumulative offsets for one candidate heading `rotation_deg` away from
    /// the goal direction.
    pub fn trajectory(&self, goal_offset: [f64; 2], rotation_deg: f64) -> Vec<[f64; 2]> {
        let c = &self.config;
        let [gx, gz] = goal_offset;
        let dist = (gx * gx + gz * gz).sqrt();
        let mut steps = Vec::with_capacity(c.steps + 1);
        if c.emit_origin {
            steps.push([0.0, 0.0]);
        }
        if dist < 1e-9 {
            steps.extend(std::iter::repeat([0.0, 0.0]).take(c.steps.max(1)));
            return steps;
        }

        let (sin, cos) = rotation_deg.to_radians().sin_cos();
        let dir = [(gx * cos + gz * sin) / dist, (-gx * sin + gz * cos) / dist];
        let stride = c.speed * c.step_dt;
        for i in 1..=c.steps.max(1) {
            let travelled = (stride * i as f64).min(dist);
            steps.push([dir[0] * travelled, dir[1] * travelled]);
        }
        steps
    }

    fn response_body(&self, request: &PredictionRequest, latency: Duration) -> Value {
        let c = &self.config;
        let rotations = [0.0, c.spread_deg, -c.spread_deg];
        let trajectories: Vec<Vec<[f64; 2]>> = rotations
            .iter()
            .take(c.candidates.clamp(1, 3))
            .map(|r| self.trajectory(request.goal_offset, *r))
            .collect();
        let anchor = self.next_anchor.fetch_add(1, Ordering::SeqCst);

        let mut body = json!({
            "latency_sec": latency.as_secs_f64(),
            "anchor_idx": anchor,
        });
        if c.named_outputs {
            for (i, t) in trajectories.into_iter().enumerate() {
                body[format!("output{}", i + 1)] = json!(t);
            }
        } else {
            body["output"] = json!(trajectories);
        }
        body
    }
}

#[async_trait]
impl PredictionTransport for SimulatedPredictor {
    async fn send(&self, request: &PredictionRequest) -> Result<String, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let jitter_ms = self.config.jitter.as_millis() as u64;
        let extra = if jitter_ms > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        let latency = self.config.latency + extra;
        sleep(latency).await;
        Ok(self.response_body(request, latency).to_string())
    }
}
