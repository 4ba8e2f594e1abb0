//! Tracing subscriber for the bridge binary.
//!
//! `RUST_LOG` wins over the configured level when it is set. Otherwise the
//! configured level applies to the bridge, and the WebSocket transport crates
//! stay at `warn` so per-frame chatter does not drown out session events.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const QUIET_TRANSPORT: &str = "tungstenite=warn,tokio_tungstenite=warn";

fn default_directives(level: &str) -> String {
    format!("{level},{QUIET_TRANSPORT}")
}

pub fn setup_logging(config: &LoggingSettings) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(default_directives(&config.level))?,
    };

    let layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_names(true);
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_format {
        registry.with(layer.json()).try_init()?;
    } else {
        registry.with(layer.with_ansi(true)).try_init()?;
    }

    info!(
        "🔧 Logging at {} ({})",
        config.level,
        if config.json_format { "json" } else { "text" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        let directives = default_directives("debug");
        assert_eq!(directives, "debug,tungstenite=warn,tokio_tungstenite=warn");
        assert!(EnvFilter::try_new(directives).is_ok());
    }
}
