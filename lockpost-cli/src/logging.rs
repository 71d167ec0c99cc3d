//! Logging setup for the lockpost CLI.
//!
//! Driven by the `[general]` section of `LockpostConfig`. Everything goes to
//! stderr; stdout is reserved for the rendered report so `--output json`
//! stays machine-readable.

use anyhow::{Result, anyhow};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use lockpost_core::config::GeneralConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `general.log_level` when set.
///
/// # Formats
///
/// * `"json"` - one JSON object per line
/// * `"pretty"` - multi-line human-readable output
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| anyhow!("invalid log level '{}': {}", config.log_level, e))?,
    };

    tracing_subscriber::registry()
        .with(format_layer(&config.log_format)?)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize tracing subscriber: {}", e))
}

fn format_layer(format: &str) -> Result<BoxedLayer> {
    match format {
        "json" => Ok(fmt::layer().json().with_writer(std::io::stderr).boxed()),
        "pretty" => Ok(fmt::layer().pretty().with_writer(std::io::stderr).boxed()),
        other => Err(anyhow!(
            "unknown log format '{}', expected 'json' or 'pretty'",
            other
        )),
    }
}
