use std::path::PathBuf;

use healthlog_service::config::{self, loader::CONFIG_PATH_VAR};
use healthlog_service::lifecycle::{signals, Application, Shutdown};
use healthlog_service::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from);
    let loaded = match config::load_config(config_path.as_deref()) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            std::process::exit(1);
        }
    };
    let config = loaded.config;

    logging::init(config.observability.log_level, config.environment)?;
    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        log_level = %config.observability.log_level,
        "healthlog-service starting"
    );

    let app = Application::build(&config).await?;
    tracing::info!(address = %app.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        match signals::wait_for_signal().await {
            Ok(()) => shutdown.trigger(),
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for shutdown signals");
                // Keep the coordinator alive so the server is not stopped.
                std::future::pending::<()>().await;
            }
        }
    });

    app.run(receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
