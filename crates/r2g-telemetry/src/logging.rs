use tracing_subscriber::{EnvFilter, fmt};

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Build the event filter: `RUST_LOG` when set and valid, otherwise
/// `default_level` (e.g. "info" or "r2g_core=debug,warn").
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber.
///
/// Safe to call multiple times (e.g. in tests) -- subsequent calls are no-ops.
pub fn init_logging(service_name: &str, format: LogFormat, default_level: &str) {
    let builder = fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true);

    match format {
        LogFormat::Pretty => builder.with_thread_ids(false).try_init().ok(),
        LogFormat::Json => builder.json().try_init().ok(),
    };

    tracing::debug!(service = service_name, ?format, "logging initialised");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_logging("r2g-test", LogFormat::Pretty, "warn");
        init_logging("r2g-test", LogFormat::Json, "debug");
        tracing::warn!("still logging");
    }

    #[test]
    fn default_format_is_pretty() {
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }
}
