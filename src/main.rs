use anyhow::Result;
use log::error;
use std::io::Write;
use tokio::sync::broadcast;

use lumentree_bridge::config::ConfigWrapper;
use lumentree_bridge::options::Options;

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::new();

    // Initialize logging with a default level; once the config is loaded the
    // filter is re-applied with the configured level.
    init_logger(env_logger::Env::default().default_filter_or("info"), false);

    let config = ConfigWrapper::new(options.config_file)?;

    init_logger(
        env_logger::Env::default().default_filter_or(config.loglevel()),
        true,
    );

    // Create a channel for shutdown signaling
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        if let Err(e) = shutdown_tx_clone.send(()) {
            error!("Failed to send shutdown signal: {}", e);
        }
    });

    lumentree_bridge::app(shutdown_rx, config).await
}

fn init_logger(env: env_logger::Env, quiet_on_reinit: bool) {
    let result = env_logger::Builder::from_env(env)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init();

    if let Err(e) = result {
        if !quiet_on_reinit {
            eprintln!("Failed to initialize logger: {}", e);
        }
    }
}
