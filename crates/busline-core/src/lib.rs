//! # Busline Core
//!
//! Core of the busline message bus.
//! Provides the type-routed publish/subscribe engine, its configuration,
//! error taxonomy and the shared-state aliases it is built on.

pub mod error;
pub mod message_bus;
pub mod types;

pub use error::{BusError, ConfigError, Error, Result};

pub use message_bus::{
    BusStats, MessageBus, MessageBusConfig, Payload, PayloadType, SubscriptionId, Topic,
    TypedCallback, WorkerState,
};

// Re-export type aliases for convenience
pub use types::{
    thread_safe, thread_safe_rw, thread_safe_rw_map, ThreadSafe, ThreadSafeRw, ThreadSafeRwMap,
};
