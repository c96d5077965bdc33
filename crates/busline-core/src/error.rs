//! Error handling for busline
//!
//! Provides the error taxonomy of the message bus:
//! - Dispatch errors (type mismatches, failing callbacks, worker spawn failures)
//! - Configuration errors (loading, saving and validating bus settings)
//!
//! Dispatch errors never propagate to publishers. They are built at the
//! dispatch call site and handed to the logging sink, so the publishing side
//! only ever sees success.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Bus dispatch error type
///
/// Represents a failure that was recovered locally inside the bus.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// A subscriber's declared payload type differs from the published payload
    #[error("Type mismatch on '{topic}': subscriber expects {expected}, payload is {actual}")]
    TypeMismatch {
        /// The fully-qualified topic the payload was published on.
        topic: String,
        /// The payload type the subscriber was registered for.
        expected: &'static str,
        /// The payload type that was actually published.
        actual: &'static str,
    },

    /// A subscriber callback panicked or returned an error
    #[error("Callback failed on '{topic}' ({payload}): {reason}")]
    CallbackFailure {
        /// The fully-qualified topic, or `*` for global subscribers.
        topic: String,
        /// The payload type being delivered.
        payload: &'static str,
        /// Panic message or error description.
        reason: String,
    },

    /// The operating system refused to start a dispatch worker
    #[error("Failed to spawn dispatch worker for {payload}: {reason}")]
    WorkerSpawn {
        /// The payload type the worker was meant to serve.
        payload: &'static str,
        /// The underlying I/O error.
        reason: String,
    },
}

impl BusError {
    /// Check if this is a type mismatch
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, BusError::TypeMismatch { .. })
    }

    /// Check if this is a callback failure
    pub fn is_callback_failure(&self) -> bool {
        matches!(self, BusError::CallbackFailure { .. })
    }
}

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting {
        /// The offending key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration file format is not supported.
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Main error type for busline
#[derive(Error, Debug)]
pub enum Error {
    /// Bus dispatch error
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
