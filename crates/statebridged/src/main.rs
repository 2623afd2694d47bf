use std::time::Duration;

use clap::Parser;
use statebridged::Config;
use tracing::{error, warn};

/// Upper bound for flushing telemetry on exit.
const TELEMETRY_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is normal outside local dev.
    let _ = dotenvy::dotenv();
    let config = Config::parse();

    let telemetry_config = config.telemetry();
    let telemetry =
        tokio::task::spawn_blocking(move || statebridge_telemetry::init(&telemetry_config))
            .await??;

    let result = statebridged::run(config).await;
    if let Err(e) = &result {
        error!(error = %format_args!("{e:#}"), "daemon exited with error");
    }

    if let Err(e) = telemetry.shutdown(TELEMETRY_FLUSH_TIMEOUT).await {
        warn!(error = %e, "telemetry shutdown failed");
    }

    result
}
