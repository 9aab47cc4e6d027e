use anyhow::Result;
use revu_config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Build the filter for a configured level and optional extra directives.
///
/// Falls back to `RUST_LOG`, then to `info`, when the directives do not parse.
pub fn build_env_filter(level: &str, extra: Option<&str>) -> EnvFilter {
    let directives = match extra {
        Some(extra) if !extra.trim().is_empty() => format!("{},{}", level, extra),
        _ => level.to_string(),
    };

    EnvFilter::try_new(directives)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging from configuration
pub fn init_logging_from_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config.level.as_str(), config.filter.as_deref());
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    // try_init avoids a panic if the global subscriber is already set
    let result = match config.format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

/// Initialize simple tracing for basic console output
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    let env_filter = build_env_filter(log_level, None);

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}
