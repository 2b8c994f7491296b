//! Staleguard daemon entry point.

use std::sync::Arc;

use log::{error, info};
use tokio::signal;

mod api;
mod cache;
mod checker;
mod config;
mod error;
mod monitor;
mod policy;
mod resolver;
mod runtime;
mod scheduler;
mod settings;
mod types;
mod updater;

use config::Config;
use monitor::Monitor;
use runtime::{ContainerRuntime, DockerRuntime};
use scheduler::Scheduler;
use settings::JsonFileStore;
use updater::Updater;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    // Load configuration
    let cfg = Config::load()?;
    info!("Starting Staleguard daemon with config: {:?}", cfg);

    // Container Runtime (Docker)
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerRuntime::connect()?);

    let updater = Updater::new(
        Arc::clone(&runtime),
        cfg.updater_image.clone(),
        cfg.updater_api_version.clone(),
        cfg.docker_socket.clone(),
    );
    let store = Arc::new(JsonFileStore::new(cfg.settings_path.clone()));
    info!("Reading update policy from {}", store.path().display());
    let monitor = Arc::new(Monitor::new(
        runtime,
        updater,
        store,
        cfg.host_identity(),
    ));

    // Background scheduler
    let scheduler = Scheduler::new(Arc::clone(&monitor), cfg.tick(), cfg.backoff());
    let scheduler_handle = tokio::spawn(scheduler.run());

    // HTTP API, until Ctrl+C
    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
    };
    if let Err(e) = api::serve(cfg.bind, monitor, shutdown).await {
        error!("HTTP API failed: {}", e);
    }

    scheduler_handle.abort();

    info!("Shutdown complete.");
    Ok(())
}
