// Module declarations for the application's core components
pub mod aggregates;    // Daily min/max/avg and energy integration
pub mod channels;      // Inter-component communication channels
pub mod config;        // Configuration management
pub mod coordinator;   // Frame decode pipeline and stats
pub mod lumentree;     // Lumentree inverter protocol implementation
pub mod mqtt;          // MQTT client and messaging
pub mod options;       // Command line options parsing
pub mod prelude;       // Common imports and types
pub mod scheduler;     // Periodic refresh requests
pub mod store;         // Latest snapshots and history
pub mod utils;         // Utility functions

// Get the package version from Cargo.toml
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;

use crate::coordinator::Coordinator;
use crate::scheduler::Scheduler;

/// Main application entry point
///
/// Initializes and starts all components, then waits for the shutdown
/// signal and stops them in dependency order.
pub async fn app(
    mut shutdown_rx: broadcast::Receiver<()>,
    config: ConfigWrapper,
) -> Result<()> {
    info!("lumentree-bridge {} starting", CARGO_PKG_VERSION);

    let channels = Channels::new();
    let store = Store::new(config.retention());

    let coordinator = Coordinator::new(config.clone(), channels.clone(), store.clone());
    let coordinator_clone = coordinator.clone();
    let coordinator_handle = tokio::spawn(async move {
        if let Err(e) = coordinator_clone.start().await {
            error!("Coordinator task failed: {}", e);
        }
    });

    let scheduler = Scheduler::new(config.clone(), coordinator.clone());
    let scheduler_clone = scheduler.clone();
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler_clone.start().await {
            error!("Scheduler task failed: {}", e);
        }
    });

    let mqtt = mqtt::Mqtt::new(
        config.clone(),
        channels.clone(),
        coordinator.shared_stats.clone(),
    );
    let mqtt_clone = mqtt.clone();
    let mqtt_handle = tokio::spawn(async move {
        if let Err(e) = mqtt_clone.start().await {
            error!("MQTT task failed: {}", e);
        }
    });

    info!("Waiting for shutdown signal...");
    let _ = shutdown_rx.recv().await;

    info!("Shutdown signal received, stopping components...");
    coordinator.stop();
    let _ = mqtt.stop().await;

    // scheduler has no state to flush; just drop its task
    scheduler_handle.abort();

    if let Err(e) = coordinator_handle.await {
        error!("Error waiting for coordinator task: {}", e);
    }
    if let Err(e) = mqtt_handle.await {
        error!("Error waiting for MQTT task: {}", e);
    }

    if let Ok(stats) = coordinator.shared_stats.lock() {
        stats.print_summary();
    }

    info!("Shutdown complete");
    Ok(())
}
