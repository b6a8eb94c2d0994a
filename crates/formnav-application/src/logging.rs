//! Process-wide tracing setup.

use crate::telemetry::NavigationEventLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "formnav=info";

/// Builds the filter from `RUST_LOG`, then `fallback`, then [`DEFAULT_FILTER`].
pub fn env_filter(fallback: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback.unwrap_or(DEFAULT_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber: env filter, fmt output on stderr and,
/// when given, the navigation event layer.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(
    fallback_filter: Option<&str>,
    events: Option<NavigationEventLayer>,
) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(fallback_filter))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(events)
        .try_init()?;
    Ok(())
}
