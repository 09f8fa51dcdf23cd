// tracing subscriber setup for the binary

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Directive string from config: `<level>,<filters>`
pub fn filter_directives(config: &LoggingConfig, verbose: bool) -> String {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let base = format!("{},hyper=warn,reqwest=warn", level);

    match config.filters.as_deref().map(str::trim) {
        Some(extra) if !extra.is_empty() => format!("{},{}", base, extra),
        _ => base,
    }
}

/// Install the global subscriber; RUST_LOG wins over config.
/// Logs go to stderr so stdout stays clean for JSON output.
pub fn init(config: &LoggingConfig, verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config, verbose)));

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();

    if let Err(e) = result {
        eprintln!("logging already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives() {
        let config = LoggingConfig::default();
        assert_eq!(filter_directives(&config, false), "info,hyper=warn,reqwest=warn");
        assert!(filter_directives(&config, true).starts_with("debug,"));

        let config = LoggingConfig {
            level: "warn".to_string(),
            filters: Some("arbor_stream::resolver::relay=trace".to_string()),
        };
        assert_eq!(
            filter_directives(&config, false),
            "warn,hyper=warn,reqwest=warn,arbor_stream::resolver::relay=trace"
        );
    }
}
