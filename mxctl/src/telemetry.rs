//! Telemetry initialization: structured logging via tracing-subscriber.
//!
//! Log verbosity is controlled with the standard `RUST_LOG` environment
//! variable (e.g. `RUST_LOG=mxctl=debug,sqlx=warn`); the default level is
//! `info`.

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize tracing with a console fmt layer and an env-based filter.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    info!("Telemetry initialized");

    Ok(())
}
