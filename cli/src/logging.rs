use colored::*;
use log::LevelFilter;

/// Maps a configured level name onto a filter, defaulting to `warn`
pub fn parse_level(level: Option<&str>) -> LevelFilter {
    level
        .map(|level| match level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Warn,
        })
        .unwrap_or(LevelFilter::Warn)
}

/// Initializes env_logger. `RUST_LOG` wins over the configured level.
/// Library events arrive through tracing's `log` compatibility.
pub fn init(level: LevelFilter) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.to_string()))
        .format_timestamp(None)
        .init();
}

pub fn log_info(message: &str) {
    log::info!("{}", message);
}

/// Shown to the user regardless of log level
pub fn log_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level(Some("DEBUG")), LevelFilter::Debug);
        assert_eq!(parse_level(Some("off")), LevelFilter::Off);
        assert_eq!(parse_level(Some("loud")), LevelFilter::Warn);
        assert_eq!(parse_level(None), LevelFilter::Warn);
    }
}
