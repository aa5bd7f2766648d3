use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// HTTP stack modules that are silenced below TRACE. Long-lived streams make
/// them log on every poll, which drowns out connection lifecycle messages.
const FILTERED_MODULES: &[&str] = &["tower", "tower_http", "tracing", "hyper", "h2", "axum"];

pub struct Logger {}

impl Logger {
    /// Installs the global terminal logger at the configured level.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        let level = config.log_level_filter;
        let log_config = Self::build_log_config(Self::should_filter_dependencies(level));

        TermLogger::init(level, log_config, TerminalMode::Mixed, ColorChoice::Auto)
    }

    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}
