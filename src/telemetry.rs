//! Log setup for the binary.

use anyhow::{Context, Result};
use tracing::Subscriber;
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Default filter: engine decisions at info, everything else quiet.
pub const DEFAULT_FILTER: &str = "warn,quarry=info";

/// Filter used with `--verbose`.
pub const VERBOSE_FILTER: &str = "info,quarry=debug";

/// `RUST_LOG` wins over `fallback`.
pub fn get_subscriber(fallback: &str) -> impl Subscriber + Send + Sync {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let stderr = fmt::Layer::new()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();
    Registry::default().with(env_filter).with(stderr)
}

/// Install `subscriber` globally and route `log` records into it. Call once.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) -> Result<()> {
    LogTracer::init().context("failed to set logger")?;
    tracing::subscriber::set_global_default(subscriber).context("failed to set subscriber")?;
    Ok(())
}
