use crate::config::Config;
use crate::domains::trajectory::{AnchorHistory, BatchQueue, RttEstimator, TrajectoryBatch};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Position of the playback driver inside the batch it is playing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackCursor {
    pub batch_id: Option<Uuid>,
    pub batch_len: usize,
    pub start_index: usize,
    pub current_index: usize,
    pub step_dt: f64,
    pub stitch_remaining: usize,
}

impl PlaybackCursor {
    pub fn is_playing(&self) -> bool {
        self.batch_id.is_some()
    }

    pub fn remaining_steps(&self) -> usize {
        self.batch_len
            .saturating_sub(self.current_index.max(self.start_index))
    }
}

/// Point-in-time view read by the prefetch scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSnapshot {
    pub queued: usize,
    pub capacity: usize,
    pub cursor: PlaybackCursor,
    pub avg_rtt_sec: f64,
    pub default_step_dt: f64,
}

/// State shared by one agent's playback and prefetch loops.
///
/// Locks are only held for the duration of a field access and never across
/// an await point.
pub struct AgentState {
    queue: Mutex<BatchQueue<TrajectoryBatch>>,
    cursor: Mutex<PlaybackCursor>,
    history: Mutex<AnchorHistory>,
    rtt: Mutex<RttEstimator>,
    remaining_time: Mutex<f64>,
    in_flight: AtomicBool,
    frozen: AtomicBool,
    goal_reached: AtomicBool,
    default_step_dt: f64,
    cancel: CancellationToken,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AgentState {
    pub fn new(config: &Config, cancel: CancellationToken) -> Self {
        Self {
            queue: Mutex::new(BatchQueue::new(config.prefetch.max_buffered_trajs)),
            cursor: Mutex::new(PlaybackCursor::default()),
            history: Mutex::new(AnchorHistory::new(
                config.history.max_history_length,
                config.service.send_empty_history,
            )),
            rtt: Mutex::new(RttEstimator::new(config.prefetch.initial_rtt_sec)),
            remaining_time: Mutex::new(config.playback.time_budget_sec.max(0.0)),
            in_flight: AtomicBool::new(false),
            frozen: AtomicBool::new(false),
            goal_reached: AtomicBool::new(false),
            default_step_dt: config.playback.step_dt_sec,
            cancel,
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// True once the goal was reached or the agent was cancelled.
    pub fn is_terminal(&self) -> bool {
        self.goal_reached.load(Ordering::SeqCst) || self.cancel.is_cancelled()
    }

    pub fn goal_reached(&self) -> bool {
        self.goal_reached.load(Ordering::SeqCst)
    }

    /// One-way transition. Returns false if the goal had already been reached.
    pub fn mark_goal_reached(&self) -> bool {
        let first = !self.goal_reached.swap(true, Ordering::SeqCst);
        self.cancel.cancel();
        first
    }

    pub fn push_batch(&self, batch: TrajectoryBatch) -> Option<TrajectoryBatch> {
        guard(&self.queue).push(batch)
    }

    pub fn pop_batch(&self) -> Option<TrajectoryBatch> {
        guard(&self.queue).pop()
    }

    pub fn queued(&self) -> usize {
        guard(&self.queue).len()
    }

    pub fn cursor(&self) -> PlaybackCursor {
        guard(&self.cursor).clone()
    }

    pub fn update_cursor(&self, f: impl FnOnce(&mut PlaybackCursor)) {
        f(&mut guard(&self.cursor));
    }

    pub fn record_anchor(&self, anchor: i64) {
        guard(&self.history).record(anchor);
    }

    pub fn history_field(&self) -> Option<String> {
        guard(&self.history).to_field()
    }

    pub fn history(&self) -> Vec<i64> {
        guard(&self.history).entries()
    }

    pub fn record_rtt(&self, measured_sec: f64) -> f64 {
        guard(&self.rtt).record(measured_sec)
    }

    pub fn avg_rtt(&self) -> f64 {
        guard(&self.rtt).average()
    }

    pub fn remaining_time(&self) -> f64 {
        *guard(&self.remaining_time)
    }

    pub fn consume_time(&self, dt: f64) {
        let mut t = guard(&self.remaining_time);
        *t = (*t - dt).max(0.0);
    }

    /// Claims the single in-flight request slot.
    pub fn try_begin_request(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn end_request(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }

    pub fn request_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn set_frozen(&self, frozen: bool) {
        self.frozen.store(frozen, Ordering::SeqCst);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        let queue = guard(&self.queue);
        SchedulerSnapshot {
            queued: queue.len(),
            capacity: queue.capacity(),
            cursor: self.cursor(),
            avg_rtt_sec: self.avg_rtt(),
            default_step_dt: self.default_step_dt,
        }
    }
}
