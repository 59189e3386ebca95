// Logging for Rendezvous
//
// This module wires the `tracing` ecosystem up for the barrier and the
// thread group coordinator. Library code only emits events through the
// `tracing` macros; installing a subscriber is left to binaries and tests.
//
// # Usage Examples
//
// ```rust
// use rendezvous::logging;
//
// // INFO level, console output
// logging::init_default();
//
// // or DEBUG level with per-thread names, which shows each worker's iterations
// logging::init_development();
//
// // console plus an append-only log file
// logging::init_with_file(logging::LogConfig::default(), "log/barrier_test.log").unwrap();
// ```
//
// ## Using Log Macros
//
// ```rust
// use rendezvous::{log_error, round_span};
//
// let span = round_span!(3);
// let _guard = span.enter();
// tracing::info!("starting round");
//
// let error = std::io::Error::new(std::io::ErrorKind::Other, "no more threads");
// log_error!(error, operation = "spawn_n");
// ```

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Once;
use tracing::{Level, Subscriber};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Configuration for the logging system
///
/// # Examples
///
/// ```rust
/// use rendezvous::logging::LogConfig;
/// use tracing::Level;
///
/// let config = LogConfig {
///     level: Level::DEBUG,
///     target_filters: Some("rendezvous::thread=trace".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: Level,
    /// Whether to use JSON format for logs
    pub json_format: bool,
    /// Whether to include file and line information
    pub show_file_line: bool,
    /// Whether to include thread name/id
    pub show_thread_info: bool,
    /// Whether to include timestamps
    pub show_time: bool,
    /// Target filter expressions (format: "target=level,target2=level2,...")
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_file_line: false,
            show_thread_info: true,
            show_time: true,
            target_filters: None,
        }
    }
}

// Initialization guard to ensure we only initialize once
static INIT: Once = Once::new();

fn env_filter(config: &LogConfig) -> EnvFilter {
    let mut env_filter = EnvFilter::from_default_env().add_directive(config.level.into());

    if let Some(filters) = &config.target_filters {
        for filter in filters.split(',') {
            if let Ok(directive) = filter.parse() {
                env_filter = env_filter.add_directive(directive);
            }
        }
    }
    env_filter
}

/// Initialize the logging system with the given configuration
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(env_filter(&config));

        let subscriber: Box<dyn Subscriber + Send + Sync> = if config.json_format {
            Box::new(registry.with(fmt::layer().json().flatten_event(true)))
        } else {
            let fmt_layer = fmt::layer()
                .with_ansi(atty::is(atty::Stream::Stdout))
                .with_file(config.show_file_line)
                .with_line_number(config.show_file_line)
                .with_thread_names(config.show_thread_info)
                .with_thread_ids(config.show_thread_info);

            if config.show_time {
                Box::new(registry.with(fmt_layer))
            } else {
                Box::new(registry.with(fmt_layer.without_time()))
            }
        };

        set_global_subscriber(subscriber);
    });
}

fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting global tracing subscriber: {}", err);
    }
}

/// Open `path` for appending, creating it and its parent directory if needed
pub fn file_writer(path: &str) -> io::Result<Box<dyn io::Write + Send + Sync + 'static>> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;

    Ok(Box::new(file))
}

/// Initialize logging with both console and file output
///
/// Console output follows `config`; the file always gets plain text with
/// thread names, since that is what identifies workers in the log.
///
/// # Errors
/// Returns an error if the log file cannot be opened.
pub fn init_with_file(config: LogConfig, log_file: &str) -> Result<(), io::Error> {
    // Fail early rather than silently falling back to stderr on every event.
    drop(file_writer(log_file)?);

    INIT.call_once(|| {
        let console_layer = fmt::layer()
            .with_ansi(atty::is(atty::Stream::Stdout))
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .with_thread_names(config.show_thread_info)
            .with_thread_ids(config.show_thread_info);

        let log_file_path = log_file.to_string();

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(move || match file_writer(&log_file_path) {
                Ok(writer) => writer,
                Err(_) => Box::new(std::io::stderr()),
            })
            .with_thread_names(true)
            .with_thread_ids(true);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter(&config))
            .with(console_layer)
            .with(file_layer);

        set_global_subscriber(subscriber);
    });

    Ok(())
}

/// Initialize INFO level console logging
pub fn init_default() {
    init(LogConfig::default());
}

/// Initialize logging for development: DEBUG level, file/line information,
/// and TRACE for barrier internals.
pub fn init_development() {
    let config = LogConfig {
        level: Level::DEBUG,
        json_format: false,
        show_file_line: true,
        show_thread_info: true,
        show_time: true,
        target_filters: Some("rendezvous::thread::barrier=trace".to_string()),
    };
    init(config);
}

/// Initialize logging for tests
///
/// Only warnings and errors, no thread information or timestamps, to keep
/// test output compact.
pub fn init_test() {
    let config = LogConfig {
        level: Level::WARN,
        json_format: false,
        show_file_line: true,
        show_thread_info: false,
        show_time: false,
        target_filters: None,
    };
    init(config);
}

/// Create a span covering one spawn/join round of the driver
///
/// # Examples
///
/// ```rust
/// use rendezvous::round_span;
///
/// let span = round_span!(0);
/// let _guard = span.enter();
///
/// let span = round_span!(1, threads = 4);
/// ```
#[macro_export]
macro_rules! round_span {
    ($round:expr) => {
        tracing::info_span!("round", round = $round)
    };
    ($round:expr, $($fields:tt)*) => {
        tracing::info_span!("round", round = $round, $($fields)*)
    };
}

/// Log error events
///
/// # Examples
///
/// ```rust
/// use rendezvous::log_error;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "Resource temporarily unavailable");
/// log_error!(error);
/// log_error!(error, operation = "spawn_n");
/// ```
#[macro_export]
macro_rules! log_error {
    ($error:expr) => {
        tracing::error!(error = %$error);
    };
    ($error:expr, $($fields:tt)*) => {
        tracing::error!(error = %$error, $($fields)*);
    };
}
