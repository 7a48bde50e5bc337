//! Logging setup for entiq.
//!
//! The core emits `tracing` events at resolution and render points.
//! Applications that want to see them without wiring their own
//! subscriber can call [`init`], which is controlled by environment
//! variables:
//!
//! - `ENTIQ_DEBUG=true|1|yes` — enable debug logging
//! - `ENTIQ_LOG_LEVEL=trace|debug|info|warn|error` — override the level

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging was requested via `ENTIQ_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("ENTIQ_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// The effective log level: `ENTIQ_LOG_LEVEL` if set and valid, otherwise
/// `debug` when `ENTIQ_DEBUG` is on and `warn` when it is not.
pub fn log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("ENTIQ_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Install a tracing subscriber filtered to the entiq crates.
///
/// Call once at startup; later calls are no-ops. Does nothing unless
/// logging was requested through the environment, and nothing at all
/// without the `tracing-subscriber` feature.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("ENTIQ_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = log_level();
            let filter = EnvFilter::try_new(format!(
                "entiq_query={level},entiq_expr={level},entiq_schema={level}"
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact())
                .init();

            tracing::debug!(level, "entiq logging initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_disabled_by_default() {
        // SAFETY: tests run single-threaded over this variable.
        unsafe {
            env::remove_var("ENTIQ_DEBUG");
        }
        assert!(!is_debug_enabled());
    }

    #[test]
    fn test_level_fallback() {
        // SAFETY: tests run single-threaded over this variable.
        unsafe {
            env::remove_var("ENTIQ_DEBUG");
            env::remove_var("ENTIQ_LOG_LEVEL");
        }
        assert_eq!(log_level(), "warn");
    }
}
