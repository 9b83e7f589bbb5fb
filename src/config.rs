use crate::common::{DomainError, DomainResult};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub decoder: DecoderConfig,
    pub selection: SelectionConfig,
    pub prefetch: PrefetchConfig,
    pub playback: PlaybackConfig,
    pub history: HistoryConfig,
}

/// How the goal offset is rendered into the `goal_position` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalFormat {
    /// `"x,z"` with four decimals.
    Csv,
    /// `[x, z]` JSON array.
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Serve predictions in-process instead of posting to `endpoint`.
    pub simulate: bool,
    pub endpoint: String,
    pub request_timeout_ms: u64,
    pub goal_format: GoalFormat,
    pub goal_flip_x: bool,
    pub goal_flip_z: bool,
    /// Express the goal offset in the agent's local frame instead of world axes.
    pub goal_in_local_frame: bool,
    pub group_field_name: String,
    pub send_group_positions: bool,
    pub send_empty_history: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            simulate: true,
            endpoint: "http://127.0.0.1:8000/predict".to_string(),
            request_timeout_ms: 5_000,
            goal_format: GoalFormat::Csv,
            goal_flip_x: false,
            goal_flip_z: false,
            goal_in_local_frame: false,
            group_field_name: "group_rel_positions".to_string(),
            send_group_positions: false,
            send_empty_history: false,
        }
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Interpretation of the raw step vectors returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub flip_x: bool,
    pub flip_z: bool,
    pub scale: f64,
    /// Steps are offsets from the request origin rather than per-step deltas.
    pub cumulative: bool,
    /// Steps are expressed in the agent's local frame.
    pub local_frame: bool,
    /// Use only the heading of the base orientation when rotating local steps.
    pub yaw_only: bool,
    pub yaw_offset_deg: f64,
    pub origin_epsilon: f64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            flip_x: false,
            flip_z: false,
            scale: 1.0,
            cumulative: true,
            local_frame: false,
            yaw_only: true,
            yaw_offset_deg: 0.0,
            origin_epsilon: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub angle_weight: f64,
    pub goal_weight: f64,
    /// Carried for tuning experiments; not part of the score.
    pub path_len_weight: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self { angle_weight: 1.0, goal_weight: 1.0, path_len_weight: 0.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub enabled: bool,
    pub weights: ScoreWeights,
    pub agent_radius: f64,
    pub static_radius: f64,
    pub blocked_retry_attempts: u32,
    pub blocked_retry_delay_ms: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weights: ScoreWeights::default(),
            agent_radius: 0.3,
            static_radius: 0.5,
            blocked_retry_attempts: 5,
            blocked_retry_delay_ms: 200,
        }
    }
}

impl SelectionConfig {
    pub fn blocked_retry_delay(&self) -> Duration {
        Duration::from_millis(self.blocked_retry_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    pub max_buffered_trajs: usize,
    pub min_lead_steps: usize,
    pub extra_lead_steps: usize,
    pub safety_margin_sec: f64,
    pub initial_rtt_sec: f64,
    pub tick_ms: u64,
    pub retry_delay_ms: u64,
    /// Transport/parse failures tolerated per cycle; 0 retries until
    /// success or cancellation.
    pub max_transport_retries: u32,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            max_buffered_trajs: 2,
            min_lead_steps: 2,
            extra_lead_steps: 0,
            safety_margin_sec: 0.15,
            initial_rtt_sec: 0.5,
            tick_ms: 10,
            retry_delay_ms: 500,
            max_transport_retries: 0,
        }
    }
}

impl PrefetchConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub step_dt_sec: f64,
    pub stitch_smooth_steps: usize,
    pub stitch_blend: f64,
    pub start_from_nearest: bool,
    pub rotate_before_move: bool,
    pub rotation_speed_deg_per_sec: f64,
    pub rotation_complete_angle_deg: f64,
    pub max_rotation_time_sec: f64,
    pub rotation_tick_ms: u64,
    /// Hold translation entirely while rotating.
    pub freeze_translation_while_rotating: bool,
    /// Fraction of the remaining distance covered per rotation tick when
    /// translation is not frozen.
    pub rotation_move_blend: f64,
    pub rotation_skip_distance: f64,
    pub goal_threshold: f64,
    pub deactivate_on_goal: bool,
    pub time_budget_sec: f64,
    pub consult_collision_service: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            step_dt_sec: 0.04,
            stitch_smooth_steps: 3,
            stitch_blend: 0.5,
            start_from_nearest: true,
            rotate_before_move: false,
            rotation_speed_deg_per_sec: 360.0,
            rotation_complete_angle_deg: 5.0,
            max_rotation_time_sec: 0.5,
            rotation_tick_ms: 10,
            freeze_translation_while_rotating: true,
            rotation_move_blend: 0.1,
            rotation_skip_distance: 0.01,
            goal_threshold: 0.5,
            deactivate_on_goal: true,
            time_budget_sec: 60.0,
            consult_collision_service: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_history_length: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_history_length: 8 }
    }
}

impl PlaybackConfig {
    pub fn rotation_tick(&self) -> Duration {
        Duration::from_millis(self.rotation_tick_ms.max(1))
    }
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DomainResult<()> {
        let invalid = |reason: &str| {
            Err(DomainError::InvalidConfiguration { reason: reason.to_string() })
        };

        if !self.service.simulate && self.service.endpoint.trim().is_empty() {
            return invalid("service.endpoint must be set unless service.simulate is true");
        }
        if !(self.playback.step_dt_sec > 0.0) {
            return invalid("playback.step_dt_sec must be positive");
        }
        if self.prefetch.max_buffered_trajs == 0 {
            return invalid("prefetch.max_buffered_trajs must be at least 1");
        }
        if self.history.max_history_length == 0 {
            return invalid("history.max_history_length must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.playback.stitch_blend) {
            return invalid("playback.stitch_blend must lie in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.playback.rotation_move_blend) {
            return invalid("playback.rotation_move_blend must lie in [0, 1]");
        }
        let w = &self.selection.weights;
        if w.angle_weight < 0.0 || w.goal_weight < 0.0 || w.path_len_weight < 0.0 {
            return invalid("selection weights must be non-negative");
        }
        if self.selection.agent_radius < 0.0 || self.selection.static_radius < 0.0 {
            return invalid("selection radii must be non-negative");
        }
        if self.prefetch.safety_margin_sec < 0.0 || self.prefetch.initial_rtt_sec < 0.0 {
            return invalid("prefetch timings must be non-negative");
        }
        if self.decoder.scale == 0.0 || !self.decoder.scale.is_finite() {
            return invalid("decoder.scale must be finite and non-zero");
        }
        Ok(())
    }
}
