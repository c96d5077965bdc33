//! # Busline
//!
//! An in-process, type-routed publish/subscribe message bus for wiring
//! device event sources and command handlers to UI bridges and task logic
//! without a shared base type.
//!
//! ## Architecture
//!
//! Busline is organized as a workspace:
//!
//! 1. **busline-core** - Message bus, configuration, error types
//! 2. **busline** - This facade: re-exports and logging setup
//!
//! ## Features
//!
//! - **Type routing**: values reach only callbacks registered for their exact type
//! - **Priorities**: per-topic subscribers run in descending priority order
//! - **Global subscribers**: observe every value of a type on any topic
//! - **Namespaces**: `ns::topic` keys isolate subsystems sharing topic names
//! - **Background dispatch**: one worker thread per payload type, isolated failures
//! - **Async bridge**: forward a topic into a tokio channel

pub use busline_core::error;
pub use busline_core::message_bus;

pub use busline_core::{
    BusError, BusStats, ConfigError, Error, MessageBus, MessageBusConfig, Payload, PayloadType,
    Result, SubscriptionId, Topic, TypedCallback, WorkerState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Output format for [`init_logging_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line human readable output.
    #[default]
    Pretty,
    /// One JSON object per event, for log collectors.
    Json,
}

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
/// - Thread names, so dispatch workers (`busline-<Type>`) are identifiable
pub fn init_logging() -> anyhow::Result<()> {
    init_logging_with(LogFormat::Pretty)
}

/// Initialize logging with the given output format
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging_with(format: LogFormat) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing::Level::INFO.to_string()));

    match format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_line_number(true)
                .pretty();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stdout)
                .with_thread_names(true)
                .json();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    tracing::debug!(version = VERSION, build_date = BUILD_DATE, "Logging initialized");
    Ok(())
}
