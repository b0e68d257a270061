//! Instance binary for the Sentinel simulation.
//!
//! Wires one instance together: configuration, persisted world, sync
//! transport, advisory client, the single-writer runner and the API
//! server. Runs until the operator stops it, `max_ticks` is reached, or
//! Ctrl-C arrives.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `sentinel-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Create the local agent and restore or create the world
//! 4. Connect the sync transport (degrades to unsynchronized on failure)
//! 5. Configure the advisory client from the environment
//! 6. Spawn the instance
//! 7. Start the API server
//! 8. Wait for the instance to end or a shutdown signal
//! 9. Stop, flush, and log the result

mod error;
mod observer_callback;

use std::path::Path;
use std::sync::Arc;

use sentinel_advisor::{Advisor, AdvisorConfig};
use sentinel_core::config::{LogFormat, LoggingConfig, SimulationConfig};
use sentinel_core::sync::LOCAL_BUS_CAPACITY;
use sentinel_core::{
    InstanceSettings, LocalBus, OperatorState, Services, SyncTransport, WorldClock,
    WorldInstance, runner,
};
use sentinel_observer::state::{AppState, TickFeed};
use sentinel_observer::{ServerConfig, spawn_observer};
use sentinel_store::{SnapshotStore, load_or_initial};
use sentinel_types::{Agent, Position};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::observer_callback::ObserverCallback;

/// Config file looked up in the working directory.
const CONFIG_FILE: &str = "sentinel-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any startup step fails or the tick counter
/// overflows.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1-2. Configuration, then logging configured from it.
    let config = load_config()?;
    init_logging(&config.logging);
    info!(
        agent = %config.agent.name,
        tick_interval_ms = config.world.tick_interval_ms,
        anomaly_probability = config.world.anomaly_probability,
        seed = ?config.world.seed,
        max_ticks = config.world.max_ticks,
        "sentinel-engine starting"
    );

    // 3. Local agent and world.
    let clock = WorldClock::from_config(&config.world)?;
    let me = Agent::new(config.agent.name.clone(), Position::default());
    let store = config
        .storage
        .enabled
        .then(|| SnapshotStore::new(&config.storage.dir, config.storage.key.clone()));
    let state = match &store {
        Some(store) => load_or_initial(store, &me).await,
        None => {
            info!("Persistence disabled, starting fresh world");
            sentinel_sim::initial_state(&me)
        }
    };

    // 4. Sync transport.
    let bus = LocalBus::new(config.sync.channel_name.clone(), LOCAL_BUS_CAPACITY);
    let transport = SyncTransport::connect(&config.sync, &bus).await;
    info!(
        transport = transport.label(),
        channel = %config.sync.channel_name,
        "Sync transport ready"
    );

    // 5. Advisory client.
    let advisor = Advisor::from_config(&AdvisorConfig::from_env()?);
    info!(advisor = advisor.name(), "Advisory client ready");

    // 6. Instance.
    let settings = InstanceSettings {
        clock,
        generator: sentinel_sim::AnomalyGenerator::new(config.world.anomaly_probability),
        seed: config.world.seed,
    };
    let (instance, effects) = WorldInstance::new(state, me, settings);
    let operator = Arc::new(OperatorState::new(
        config.world.tick_interval_ms,
        config.world.max_ticks,
    ));
    let feed = TickFeed::new();
    let services = Services {
        transport,
        store,
        advisor,
    };
    let (handle, mut join) = runner::spawn_instance(
        instance,
        effects,
        services,
        operator,
        Box::new(ObserverCallback::new(feed.clone())),
    )
    .await?;

    // 7. API server.
    let app_state = Arc::new(AppState::with_feed(handle.clone(), feed));
    let server = spawn_observer(&ServerConfig::from(&config.observer), app_state).await?;

    // 8. Wait.
    let joined = tokio::select! {
        joined = &mut join => joined,
        () = shutdown_signal() => {
            info!("Shutdown signal received, stopping instance");
            handle.stop();
            join.await
        }
    };

    // 9. Finish.
    server.abort();
    let result = joined.map_err(|e| EngineError::Join {
        message: e.to_string(),
    })??;

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "sentinel-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from [`CONFIG_FILE`] in the working directory.
///
/// A missing file yields defaults; environment overrides apply either way.
fn load_config() -> Result<SimulationConfig, EngineError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        Ok(SimulationConfig::from_file(config_path)?)
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match config.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Resolve on Ctrl-C. If the handler cannot be installed, never resolve.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl-C handler unavailable, waiting for instance to end");
        std::future::pending::<()>().await;
    }
}
