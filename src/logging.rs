//! Tracing subscriber setup for the binary.
//!
//! Two output modes share one filter:
//! - **JSON** (`json = true`): one JSON object per event, for log shipping.
//! - **Compact** (`json = false`): human-readable lines.
//!
//! `RUST_LOG` takes precedence over the configured filter
//! (e.g. `RUST_LOG=load_forecast=debug` shows every forecast step).
//! Logs go to stderr so forecast output on stdout stays machine-readable.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Installs the global tracing subscriber.
///
/// # Arguments
///
/// * `json` - Emit JSON lines instead of compact text
/// * `default_filter` - `EnvFilter` directive used when `RUST_LOG` is unset
///   or invalid; falls back to `info` if it does not parse either
///
/// # Errors
///
/// Returns `TryInitError` if a global subscriber is already installed.
pub fn init_tracing(json: bool, default_filter: &str) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr);
        registry.with(json_layer).try_init()
    } else {
        let text_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr);
        registry.with(text_layer).try_init()
    }
}
