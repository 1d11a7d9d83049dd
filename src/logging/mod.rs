//! Logging infrastructure - structured tracing throughout the runtime
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log levels per module
//! - Zero-cost when disabled
//! - Optional file output for kernel call logs

use once_cell::sync::OnceCell;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

mod macros;
pub use macros::*;

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Log file path, when file output is enabled
    pub log_path: Option<String>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_path: None,
            json_format: false,
            show_spans: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // ARBOR_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("ARBOR_LOG_LEVEL") {
            config.level = match level_str.to_lowercase().as_str() {
                "trace" => Level::TRACE,
                "debug" => Level::DEBUG,
                "info" => Level::INFO,
                "warn" => Level::WARN,
                "error" => Level::ERROR,
                _ => Level::INFO,
            };
        }

        // ARBOR_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("ARBOR_LOG_FILE") {
            config.log_path = Some(path);
        }

        // ARBOR_LOG_JSON: enable JSON format
        config.json_format = std::env::var("ARBOR_LOG_JSON").is_ok();

        // ARBOR_LOG_SPANS: show span events
        config.show_spans = std::env::var("ARBOR_LOG_SPANS").is_ok();

        config
    }

    /// Create high-performance config (minimal logging)
    pub fn performance() -> Self {
        Self {
            level: Level::ERROR,
            log_path: None,
            json_format: false,
            show_spans: false,
        }
    }
}

/// Initialize logging with default configuration
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "arbor_runtime={}",
                config.level.as_str().to_lowercase()
            ))
        });

        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let file_layer = config.log_path.as_ref().map(|path| {
            let path = Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "arbor_runtime.log".into());
            let appender =
                tracing_appender::rolling::never(dir.unwrap_or_else(|| Path::new(".")), name);
            fmt::layer().with_writer(appender).with_ansi(false)
        });

        let registry = tracing_subscriber::registry().with(env_filter).with(file_layer);

        if config.json_format {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(io::stdout)
                        .with_span_events(span_events)
                        .with_target(true),
                )
                .init();
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_writer(io::stdout)
                        .with_span_events(span_events)
                        .with_target(true)
                        .with_thread_ids(cfg!(debug_assertions))
                        .with_line_number(cfg!(debug_assertions)),
                )
                .init();
        }
    });
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

/// Performance tracking utilities
pub mod perf {
    use std::time::Instant;
    use tracing::debug;

    /// Track operation duration (returns guard that logs on drop)
    #[must_use]
    pub fn track(operation: &str) -> PerformanceGuard {
        PerformanceGuard {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub struct PerformanceGuard {
        operation: String,
        start: Instant,
    }

    impl Drop for PerformanceGuard {
        fn drop(&mut self) {
            let elapsed = self.start.elapsed();
            debug!(
                operation = %self.operation,
                duration_us = elapsed.as_micros(),
                "operation completed"
            );
        }
    }
}
