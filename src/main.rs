use crowdpilot::adapters::outbound::{
    init_buffered_logger, init_console_logger, HttpPredictionTransport, SceneRegistry,
    SimulatedPredictor, SimulatedPredictorConfig, StaticObservation,
};
use crowdpilot::application::{CrowdRunner, OrchestratorPorts, PedestrianClient};
use crowdpilot::common::{ApplicationResult, EventEnvelope};
use crowdpilot::domains::motion::{Pose, Quat, Vec3};
use crowdpilot::domains::trajectory::{AgentEvent, PredictionTransport};
use crowdpilot::Config;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> ApplicationResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting crowdpilot demo");

    let config = if Path::new(CONFIG_PATH).exists() {
        Config::from_file(CONFIG_PATH).await?
    } else {
        info!("{} not found, using built-in defaults", CONFIG_PATH);
        Config::default()
    };
    config.validate()?;
    let config = Arc::new(config);

    let logger = init_buffered_logger(init_console_logger(), 1024);
    let scene = SceneRegistry::new();
    scene.add_static("kiosk", Vec3::ground(0.0, 0.0), 0.8);

    let mut predictor = None;
    let transport: Arc<dyn PredictionTransport> = if config.service.simulate {
        info!("Using the built-in simulated predictor");
        let simulated = Arc::new(SimulatedPredictor::new(SimulatedPredictorConfig {
            step_dt: config.playback.step_dt_sec,
            ..SimulatedPredictorConfig::default()
        }));
        predictor = Some(simulated.clone());
        simulated
    } else {
        info!("Posting prediction requests to {}", config.service.endpoint);
        Arc::new(HttpPredictionTransport::from_config(&config.service)?)
    };
    let ports = OrchestratorPorts {
        transport,
        observation: Arc::new(StaticObservation::placeholder()),
        probe: Some(scene.clone()),
        group: Some(scene.clone()),
    };

    let (event_tx, mut event_rx) = mpsc::channel::<AgentEvent>(256);
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match EventEnvelope::new(&event, "crowdpilot-demo") {
                Ok(envelope) => tracing::debug!(
                    event_type = %envelope.event_type,
                    agent = %envelope.agent_id,
                    data = %envelope.event_data,
                    "agent event"
                ),
                Err(e) => error!("Failed to serialize agent event: {}", e),
            }
        }
    });

    let mut crowd = CrowdRunner::new(logger.clone());
    let routes = [
        (Vec3::ground(-6.0, -6.0), Vec3::ground(6.0, 6.0)),
        (Vec3::ground(6.0, -6.0), Vec3::ground(-6.0, 6.0)),
        (Vec3::ground(0.0, -8.0), Vec3::ground(0.5, 8.0)),
        (Vec3::ground(-8.0, 0.0), Vec3::ground(8.0, 0.5)),
    ];
    for (i, (start, goal)) in routes.iter().enumerate() {
        let id = format!("ped-{:02}", i);
        let heading = Quat::look_along(goal.sub(*start)).unwrap_or_default();
        let body = scene.spawn_body(&id, Pose::new(*start, heading), 0.25);
        let client = PedestrianClient::with_cancellation(
            id,
            Arc::clone(&config),
            body,
            *goal,
            ports.clone(),
            logger.clone(),
            crowd.agent_token(),
        )
        .with_events(event_tx.clone());
        crowd.spawn(client);
    }
    drop(event_tx);

    let shutdown = crowd.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping agents");
            shutdown.cancel();
        }
    });

    let report = crowd.join_all().await;
    info!(
        "Demo finished: {} reached, {} cancelled, {} failed",
        report.reached.len(),
        report.cancelled.len(),
        report.failed
    );
    if let Some(predictor) = predictor {
        info!("Simulated predictor served {} requests", predictor.requests());
    }

    // Let the buffered logger drain before exit.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
