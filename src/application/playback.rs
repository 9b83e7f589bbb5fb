use super::agent_state::AgentState;
use crate::config::PlaybackConfig;
use crate::domains::logger::DynLogger;
use crate::domains::motion::{delta_angle_deg, rotate_towards_deg, Pose, Quat, Vec3};
use crate::domains::trajectory::{
    AgentBody, AgentEvent, CollisionService, DecodedPath, TrajectoryBatch,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Why a batch stopped playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEnd {
    Exhausted,
    GoalReached,
    Cancelled,
}

/// First waypoint to play. With `nearest` the hinted index is only a lower
/// bound and the closest ground-plane waypoint to `position` wins (earliest on
/// ties), which absorbs drift accumulated while the batch was in flight.
pub fn resolve_start_index(path: &DecodedPath, position: Vec3, nearest: bool) -> usize {
    let hint = path.start_index.min(path.len());
    if !nearest || hint >= path.len() {
        return hint;
    }
    let mut best = hint;
    let mut best_d = f64::INFINITY;
    for (i, wp) in path.waypoints.iter().enumerate().skip(hint) {
        let d = wp.ground_distance_sq(position);
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

/// One stitch step: move `blend` of the way toward the target pose.
pub fn stitch_pose(current: Pose, target: Pose, blend: f64) -> Pose {
    Pose {
        position: current.position.lerp(target.position, blend),
        rotation: current.rotation.nlerp(target.rotation, blend),
    }
}

/// Heading-only rotation tick, advanced by an explicit elapsed time.
pub fn rotation_tick(
    current: Quat,
    target_yaw_deg: f64,
    speed_deg_per_sec: f64,
    dt_sec: f64,
) -> Quat {
    let yaw = rotate_towards_deg(current.yaw_deg(), target_yaw_deg, speed_deg_per_sec * dt_sec);
    Quat::from_yaw_deg(yaw)
}

pub struct PlaybackDriver {
    agent_id: String,
    config: PlaybackConfig,
    body: Arc<dyn AgentBody>,
    goal: Vec3,
    logger: DynLogger,
    events: Option<mpsc::Sender<AgentEvent>>,
    collision: Option<Arc<dyn CollisionService>>,
    idle_tick: Duration,
    frame: u64,
}

impl PlaybackDriver {
    pub fn new(
        agent_id: impl Into<String>,
        config: PlaybackConfig,
        body: Arc<dyn AgentBody>,
        goal: Vec3,
        logger: DynLogger,
    ) -> Self {
        let idle_tick = config.rotation_tick();
        Self {
            agent_id: agent_id.into(),
            config,
            body,
            goal,
            logger,
            events: None,
            collision: None,
            idle_tick,
            frame: 0,
        }
    }

    pub fn with_events(mut self, events: mpsc::Sender<AgentEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_collision_service(mut self, service: Arc<dyn CollisionService>) -> Self {
        self.collision = Some(service);
        self
    }

    pub fn with_idle_tick(mut self, tick: Duration) -> Self {
        self.idle_tick = tick;
        self
    }

    /// Steps executed so far; also the frame id used for collision queries.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.try_send(event);
        }
    }

    /// Sleeps unless cancelled. Returns false on cancellation.
    async fn wait(&self, state: &AgentState, d: Duration) -> bool {
        if d.is_zero() {
            tokio::task::yield_now().await;
            return !state.is_terminal();
        }
        tokio::select! {
            _ = state.cancellation().cancelled() => false,
            _ = sleep(d) => !state.is_terminal(),
        }
    }

    /// Marks the goal reached if the agent is within the threshold.
    pub fn check_goal(&self, state: &AgentState) -> bool {
        if state.goal_reached() {
            return true;
        }
        let position = self.body.pose().position;
        if position.ground_distance(self.goal) >= self.config.goal_threshold {
            return false;
        }
        if state.mark_goal_reached() {
            if self.config.deactivate_on_goal {
                self.body.set_active(false);
            }
            self.logger.info(&format!(
                "goal reached at ({:.2}, {:.2})",
                position.x, position.z
            ));
            self.emit(AgentEvent::GoalReached {
                agent_id: self.agent_id.clone(),
                position,
                timestamp: Utc::now(),
            });
        }
        true
    }

    /// Plays queued batches until the goal is reached or the agent is cancelled.
    pub async fn run(&mut self, state: &AgentState) {
        loop {
            if state.is_terminal() || self.check_goal(state) {
                return;
            }
            let batch = match state.pop_batch() {
                Some(b) => b,
                None => {
                    if !self.wait(state, self.idle_tick).await {
                        return;
                    }
                    continue;
                }
            };
            match self.play_batch(state, batch).await {
                BatchEnd::Exhausted => {}
                BatchEnd::GoalReached | BatchEnd::Cancelled => return,
            }
        }
    }

    /// Holds position while a blocked fetch is retrying or the collision
    /// service reports anything but clear for this frame.
    async fn wait_until_clear(&self, state: &AgentState) -> bool {
        loop {
            let blocked_by_service = self.config.consult_collision_service
                && self
                    .collision
                    .as_ref()
                    .map_or(false, |c| c.query(&self.agent_id, self.frame).is_blocking());
            if !state.is_frozen() && !blocked_by_service {
                return true;
            }
            if !self.wait(state, self.idle_tick).await {
                return false;
            }
        }
    }

    pub async fn play_batch(&mut self, state: &AgentState, batch: TrajectoryBatch) -> BatchEnd {
        if let Some(anchor) = batch.anchor {
            state.record_anchor(anchor);
        }
        if self.check_goal(state) {
            return BatchEnd::GoalReached;
        }

        let start = resolve_start_index(
            &batch.path,
            self.body.pose().position,
            self.config.start_from_nearest,
        );
        let step_dt = batch.step_dt;
        state.update_cursor(|c| {
            c.batch_id = Some(batch.id);
            c.batch_len = batch.len();
            c.start_index = start;
            c.current_index = start;
            c.step_dt = step_dt;
            c.stitch_remaining = self.config.stitch_smooth_steps;
        });
        self.emit(AgentEvent::BatchStarted {
            agent_id: self.agent_id.clone(),
            batch_id: batch.id,
            start_index: start,
            anchor: batch.anchor,
            timestamp: Utc::now(),
        });
        self.logger.debug(&format!(
            "playing batch {} from step {} of {} (rtt {:.3}s)",
            batch.id,
            start,
            batch.len(),
            batch.rtt_sec
        ));

        let end = self.step_through(state, &batch, start).await;
        state.update_cursor(|c| *c = Default::default());
        end
    }

    async fn step_through(
        &mut self,
        state: &AgentState,
        batch: &TrajectoryBatch,
        start: usize,
    ) -> BatchEnd {
        let step_dt = batch.step_dt;
        let mut prev_target = self.body.pose().position;

        for i in start..batch.len() {
            if state.is_terminal() {
                return self.terminal_end(state);
            }
            if self.check_goal(state) {
                return BatchEnd::GoalReached;
            }
            if !self.wait_until_clear(state).await {
                return self.terminal_end(state);
            }

            let target = batch.path.waypoints[i];
            state.update_cursor(|c| c.current_index = i);

            let mut rotation_secs = 0.0;
            let needs_turn =
                target.ground_distance(prev_target) >= self.config.rotation_skip_distance;
            if self.config.rotate_before_move && needs_turn {
                match self.rotate_towards(state, target).await {
                    Some(elapsed) => rotation_secs = elapsed,
                    None => return self.terminal_end(state),
                }
            }
            if state.is_terminal() {
                return self.terminal_end(state);
            }

            self.translate(state, target);
            prev_target = target;
            self.frame += 1;
            state.consume_time(step_dt);
            state.update_cursor(|c| c.current_index = i + 1);

            if self.check_goal(state) {
                return BatchEnd::GoalReached;
            }
            let rest = (step_dt - rotation_secs).max(0.0);
            if !self.wait(state, Duration::from_secs_f64(rest)).await {
                return self.terminal_end(state);
            }
        }
        BatchEnd::Exhausted
    }

    fn terminal_end(&self, state: &AgentState) -> BatchEnd {
        if state.goal_reached() {
            BatchEnd::GoalReached
        } else {
            BatchEnd::Cancelled
        }
    }

    fn translate(&self, state: &AgentState, target: Vec3) {
        let current = self.body.pose();
        let moved_enough =
            current.position.ground_distance(target) >= self.config.rotation_skip_distance;
        let target_rotation = if moved_enough {
            Quat::look_along(target.sub(current.position)).unwrap_or(current.rotation)
        } else {
            current.rotation
        };
        let target_pose = Pose::new(target, target_rotation);

        let mut stitching = false;
        state.update_cursor(|c| {
            if c.stitch_remaining > 0 {
                c.stitch_remaining -= 1;
                stitching = true;
            }
        });

        let next = if stitching {
            stitch_pose(current, target_pose, self.config.stitch_blend)
        } else {
            target_pose
        };
        self.body.set_pose(next);
    }

    /// Turns in place toward `target`. Returns the time spent, or `None` if
    /// the agent became terminal meanwhile.
    async fn rotate_towards(&self, state: &AgentState, target: Vec3) -> Option<f64> {
        let tick = self.config.rotation_tick();
        let dt = tick.as_secs_f64();
        let mut elapsed = 0.0;

        loop {
            let pose = self.body.pose();
            let target_yaw = match Quat::look_along(target.sub(pose.position)) {
                Some(q) => q.yaw_deg(),
                None => return Some(elapsed),
            };
            let remaining = delta_angle_deg(pose.rotation.yaw_deg(), target_yaw).abs();
            if remaining <= self.config.rotation_complete_angle_deg
                || elapsed >= self.config.max_rotation_time_sec
            {
                return Some(elapsed);
            }

            let rotation = rotation_tick(
                pose.rotation,
                target_yaw,
                self.config.rotation_speed_deg_per_sec,
                dt,
            );
            let position = if self.config.freeze_translation_while_rotating {
                pose.position
            } else {
                pose.position.lerp(target, self.config.rotation_move_blend)
            };
            if state.is_terminal() {
                return None;
            }
            self.body.set_pose(Pose::new(position, rotation));

            if !self.wait(state, tick).await {
                return None;
            }
            elapsed += dt;
        }
    }
}
