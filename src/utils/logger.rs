//! Logging setup
//!
//! Every process (leader and workers) installs its own subscriber writing to
//! stderr; workers inherit the leader's stderr so all lines share one stream.

use crate::config::DEFAULT_LOG_FILTER;
use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the filter: explicit level first, then `RUST_LOG`, then the default.
pub fn build_filter(log_level: Option<&str>) -> Result<EnvFilter> {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    Ok(filter)
}

/// Initialise the global subscriber.
///
/// # Examples
/// ```no_run
/// use usersvc::utils::logger::init_logger;
///
/// init_logger(Some("debug")).unwrap();
/// ```
pub fn init_logger(log_level: Option<&str>) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact();

    tracing_subscriber::registry()
        .with(build_filter(log_level)?)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
