mod support;

use crowdpilot::adapters::outbound::{SceneRegistry, StaticObservation};
use crowdpilot::application::{AgentState, CycleOutcome, OrchestratorPorts, TrajectoryOrchestrator};
use crowdpilot::common::{FetchError, TransportError};
use crowdpilot::config::Config;
use crowdpilot::domains::logger::DynLogger;
use crowdpilot::domains::motion::{Pose, Quat, Vec3};
use crowdpilot::domains::trajectory::{AgentEvent, EndpointProbe, GroupPositionSource};
use std::sync::Arc;
use std::time::Duration;
use support::{single_output, straight_walk, CaptureLogger, MemoryBody, Obstacles, ScriptedTransport};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn ports(transport: Arc<ScriptedTransport>, probe: Option<Arc<dyn EndpointProbe>>) -> OrchestratorPorts {
    OrchestratorPorts {
        transport,
        observation: Arc::new(StaticObservation::placeholder()),
        probe,
        group: None,
    }
}

fn orchestrator(config: &Arc<Config>, ports: OrchestratorPorts) -> (TrajectoryOrchestrator, Arc<CaptureLogger>) {
    let capture = CaptureLogger::new();
    let logger: DynLogger = capture.clone();
    (TrajectoryOrchestrator::new("ped-0", Arc::clone(config), ports, logger), capture)
}

fn walk_body() -> String {
    single_output(&straight_walk(10, 0.1))
}

#[cfg(test)]
mod cycle_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_successful_cycle_enqueues_batch() {
        let config = Arc::new(Config::default());
        let transport = Arc::new(ScriptedTransport::repeating(walk_body()));
        let (orch, _) = orchestrator(&config, ports(transport.clone(), None));
        let state = AgentState::new(&config, CancellationToken::new());
        let body = MemoryBody::at(Vec3::ZERO);

        let outcome = orch.run_cycle(&state, body.as_ref(), Vec3::ground(3.0, 4.0)).await;

        assert!(matches!(outcome, Ok(CycleOutcome::Enqueued { evicted: None, .. })));
        assert_eq!(state.queued(), 1);
        assert_eq!(transport.request_count(), 1);
        let sent = transport.requests.lock().unwrap()[0].clone();
        assert_eq!(sent.goal_field(), "3.0000,4.0000");
        assert_eq!(sent.history, None);

        let batch = state.pop_batch().unwrap();
        assert_eq!(batch.len(), 11);
        assert_eq!(batch.start_index(), 1);
        assert_eq!(batch.path.waypoints[10], Vec3::new(1.0, 0.0, 0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_is_retried() {
        let config = Arc::new(Config::default());
        let transport = Arc::new(
            ScriptedTransport::new(vec![Err(TransportError::Status(503))]).with_fallback(walk_body()),
        );
        let (orch, capture) = orchestrator(&config, ports(transport.clone(), None));
        let state = AgentState::new(&config, CancellationToken::new());
        let body = MemoryBody::at(Vec3::ZERO);

        let outcome = orch.run_cycle(&state, body.as_ref(), Vec3::ground(5.0, 0.0)).await;

        assert!(matches!(outcome, Ok(CycleOutcome::Enqueued { .. })));
        assert_eq!(transport.request_count(), 2);
        assert!(capture.contains("HTTP 503"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_retry_budget() {
        let mut config = Config::default();
        config.prefetch.max_transport_retries = 2;
        let config = Arc::new(config);
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let (orch, _) = orchestrator(&config, ports(transport.clone(), None));
        let state = AgentState::new(&config, CancellationToken::new());
        let body = MemoryBody::at(Vec3::ZERO);

        let outcome = orch.run_cycle(&state, body.as_ref(), Vec3::ground(5.0, 0.0)).await;

        assert!(matches!(outcome, Err(FetchError::Transport(TransportError::EmptyBody))));
        assert_eq!(transport.request_count(), 3);
        assert_eq!(state.queued(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_transport_failure() {
        let mut config = Config::default();
        config.service.request_timeout_ms = 100;
        config.prefetch.max_transport_retries = 1;
        let config = Arc::new(config);
        let transport =
            Arc::new(ScriptedTransport::repeating(walk_body()).with_delay(Duration::from_secs(10)));
        let (orch, _) = orchestrator(&config, ports(transport.clone(), None));
        let state = AgentState::new(&config, CancellationToken::new());
        let body = MemoryBody::at(Vec3::ZERO);

        let outcome = orch.run_cycle(&state, body.as_ref(), Vec3::ground(5.0, 0.0)).await;

        match outcome {
            Err(FetchError::Transport(TransportError::Timeout(limit))) => {
                assert_eq!(limit, Duration::from_millis(100))
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(transport.request_count(), 2);
        // Timed-out requests still feed the RTT average.
        assert!(state.avg_rtt() < 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_trajectory_is_retried() {
        let mut config = Config::default();
        config.prefetch.max_transport_retries = 1;
        let config = Arc::new(config);
        let transport = Arc::new(ScriptedTransport::repeating(r#"{"output": [[[0, 0]]]}"#));
        let (orch, _) = orchestrator(&config, ports(transport.clone(), None));
        let state = AgentState::new(&config, CancellationToken::new());
        let body = MemoryBody::at(Vec3::ZERO);

        let outcome = orch.run_cycle(&state, body.as_ref(), Vec3::ground(5.0, 0.0)).await;

        assert!(matches!(outcome, Err(FetchError::EmptyTrajectory)));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_blocked_gives_up_after_budget() {
        let mut config = Config::default();
        config.selection.blocked_retry_attempts = 3;
        let config = Arc::new(config);
        let transport = Arc::new(ScriptedTransport::repeating(walk_body()));
        let probe: Arc<dyn EndpointProbe> = Arc::new(Obstacles(vec![Vec3::ground(1.0, 0.0)]));
        let (orch, capture) = orchestrator(&config, ports(transport.clone(), Some(probe)));
        let state = AgentState::new(&config, CancellationToken::new());
        let body = MemoryBody::at(Vec3::ZERO);

        let outcome = orch.run_cycle(&state, body.as_ref(), Vec3::ground(5.0, 0.0)).await;

        assert_eq!(outcome.unwrap(), CycleOutcome::GaveUp { attempts: 3 });
        assert_eq!(transport.request_count(), 3);
        assert_eq!(state.queued(), 0);
        assert!(!state.is_frozen());
        assert!(capture.contains("all candidates blocked (attempt 3/3)"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_candidate_falls_back_to_clear_one() {
        let config = Arc::new(Config::default());
        let body_text = serde_json::json!({
            "output": [
                [[0.0, 0.0], [1.0, 0.0]],
                [[0.0, 0.0], [0.0, 1.0]],
            ]
        })
        .to_string();
        let transport = Arc::new(ScriptedTransport::repeating(body_text));
        let probe: Arc<dyn EndpointProbe> = Arc::new(Obstacles(vec![Vec3::ground(1.0, 0.0)]));
        let (orch, _) = orchestrator(&config, ports(transport, Some(probe)));
        let state = AgentState::new(&config, CancellationToken::new());
        let body = MemoryBody::at(Vec3::ZERO);

        orch.run_cycle(&state, body.as_ref(), Vec3::ground(5.0, 0.0)).await.unwrap();

        let batch = state.pop_batch().unwrap();
        assert_eq!(batch.path.waypoints[1], Vec3::new(0.0, 0.0, 1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_evicts_oldest_batch() {
        let mut config = Config::default();
        config.prefetch.max_buffered_trajs = 1;
        let config = Arc::new(config);
        let transport = Arc::new(ScriptedTransport::repeating(walk_body()));
        let (orch, _) = orchestrator(&config, ports(transport, None));
        let state = AgentState::new(&config, CancellationToken::new());
        let body = MemoryBody::at(Vec3::ZERO);
        let goal = Vec3::ground(5.0, 0.0);

        let first = match orch.run_cycle(&state, body.as_ref(), goal).await.unwrap() {
            CycleOutcome::Enqueued { batch_id, .. } => batch_id,
            other => panic!("unexpected {:?}", other),
        };
        let second = orch.run_cycle(&state, body.as_ref(), goal).await.unwrap();

        assert!(matches!(second, CycleOutcome::Enqueued { evicted: Some(id), .. } if id == first));
        assert_eq!(state.queued(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_is_echoed() {
        let config = Arc::new(Config::default());
        let transport = Arc::new(ScriptedTransport::repeating(walk_body()));
        let (orch, _) = orchestrator(&config, ports(transport.clone(), None));
        let state = AgentState::new(&config, CancellationToken::new());
        state.record_anchor(3);
        state.record_anchor(4);
        let body = MemoryBody::at(Vec3::ZERO);

        orch.run_cycle(&state, body.as_ref(), Vec3::ground(5.0, 0.0)).await.unwrap();

        let sent = transport.requests.lock().unwrap()[0].clone();
        assert_eq!(sent.history.as_deref(), Some("3,4"));
        assert!(sent.form_fields().iter().any(|(k, v)| k == "history" && v == "3,4"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_are_published() {
        let config = Arc::new(Config::default());
        let transport = Arc::new(ScriptedTransport::repeating(walk_body()));
        let (tx, mut rx) = mpsc::channel(16);
        let (orch, _) = orchestrator(&config, ports(transport, None));
        let orch = orch.with_events(tx);
        let state = AgentState::new(&config, CancellationToken::new());
        let body = MemoryBody::at(Vec3::ZERO);

        orch.run_cycle(&state, body.as_ref(), Vec3::ground(5.0, 0.0)).await.unwrap();

        assert!(matches!(rx.recv().await, Some(AgentEvent::FetchSucceeded { candidates: 1, chosen: 0, .. })));
        assert!(matches!(rx.recv().await, Some(AgentEvent::BatchEnqueued { steps: 11, .. })));
    }
}

#[cfg(test)]
mod cancellation_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_agent_sends_nothing() {
        let config = Arc::new(Config::default());
        let transport = Arc::new(ScriptedTransport::repeating(walk_body()));
        let (orch, _) = orchestrator(&config, ports(transport.clone(), None));
        let state = AgentState::new(&config, CancellationToken::new());
        state.cancellation().cancel();
        let body = MemoryBody::at(Vec3::ZERO);

        let result = orch.fetch_once(&state, body.as_ref(), Vec3::ground(5.0, 0.0)).await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_after_cancellation_is_discarded() {
        let config = Arc::new(Config::default());
        let transport =
            Arc::new(ScriptedTransport::repeating(walk_body()).with_delay(Duration::from_secs(1)));
        let (orch, _) = orchestrator(&config, ports(transport.clone(), None));
        let state = AgentState::new(&config, CancellationToken::new());
        let body = MemoryBody::at(Vec3::ZERO);

        let (result, _) = tokio::join!(
            orch.run_cycle(&state, body.as_ref(), Vec3::ground(5.0, 0.0)),
            async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                state.cancellation().cancel();
            }
        );

        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert_eq!(state.queued(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_goal_reached_stops_fetching() {
        let config = Arc::new(Config::default());
        let transport = Arc::new(ScriptedTransport::repeating(walk_body()));
        let (orch, _) = orchestrator(&config, ports(transport.clone(), None));
        let state = AgentState::new(&config, CancellationToken::new());
        assert!(state.mark_goal_reached());
        assert!(!state.mark_goal_reached());
        let body = MemoryBody::at(Vec3::ZERO);

        let result = orch.run_cycle(&state, body.as_ref(), Vec3::ground(5.0, 0.0)).await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert_eq!(transport.request_count(), 0);
    }
}

#[cfg(test)]
mod request_tests {
    use super::*;

    #[test]
    fn test_world_goal_offset_with_flip() {
        let mut config = Config::default();
        config.service.goal_flip_x = true;
        let config = Arc::new(config);
        let (orch, _) = orchestrator(&config, ports(Arc::new(ScriptedTransport::new(vec![])), None));
        let pose = Pose::new(Vec3::ground(1.0, 1.0), Quat::from_yaw_deg(45.0));

        assert_eq!(orch.goal_offset(&pose, Vec3::ground(3.0, 4.0)), [-2.0, 3.0]);
    }

    #[test]
    fn test_local_goal_offset() {
        let mut config = Config::default();
        config.service.goal_in_local_frame = true;
        let config = Arc::new(config);
        let (orch, _) = orchestrator(&config, ports(Arc::new(ScriptedTransport::new(vec![])), None));
        // Facing +X, so a goal two metres along +X is straight ahead.
        let pose = Pose::new(Vec3::ZERO, Quat::from_yaw_deg(90.0));

        let [x, z] = orch.goal_offset(&pose, Vec3::ground(2.0, 0.0));
        assert!(x.abs() < 1e-9);
        assert!((z - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_group_positions_are_relative() {
        let mut config = Config::default();
        config.service.send_group_positions = true;
        let config = Arc::new(config);
        let scene = SceneRegistry::new();
        scene.upsert_agent("ped-0", Vec3::ground(1.0, 1.0), 0.3);
        scene.upsert_agent("ped-1", Vec3::ground(2.0, 3.0), 0.3);
        let mut p = ports(Arc::new(ScriptedTransport::new(vec![])), None);
        let group: Arc<dyn GroupPositionSource> = scene;
        p.group = Some(group);
        let (orch, _) = orchestrator(&config, p);
        let state = AgentState::new(&config, CancellationToken::new());

        let request = orch
            .build_request(&state, &Pose::new(Vec3::ground(1.0, 1.0), Quat::IDENTITY), Vec3::ground(5.0, 5.0))
            .unwrap();

        assert_eq!(request.group_rel_positions, vec![[1.0, 2.0]]);
        assert_eq!(request.remaining_time_field(), "60.00");
        assert!(!request.image.is_empty());
    }
}
