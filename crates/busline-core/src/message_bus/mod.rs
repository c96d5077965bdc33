//! # Message Bus Module
//!
//! In-process, type-routed publish/subscribe for decoupled communication
//! between producers (device clients, command handlers) and consumers
//! (UI bridges, task logic).
//!
//! ## Overview
//!
//! - Values are routed by topic and by their exact runtime type
//! - Topic subscribers run in descending priority, ties in registration order
//! - Global subscribers see every value of their type, after topic subscribers
//! - Callbacks run on one background worker thread per payload type
//! - Publishing never waits for subscribers
//!
//! ```text
//! publish(topic, value)
//!     │  tag with PayloadType
//!     ▼
//! DeliveryQueue ── lane per payload type ──► DispatchWorker<T>
//!                                                │
//!                         ┌──────────────────────┴──────────────┐
//!                         ▼                                     ▼
//!              SubscriptionTable[topic]                GlobalSubscribers[T]
//!              (priority order, T only)                (registration order)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use busline_core::message_bus::{MessageBus, Topic};
//!
//! let bus = MessageBus::new();
//!
//! bus.subscribe_with_priority("temp", 10, |celsius: f64| {
//!     println!("over-temperature check: {}", celsius);
//! });
//! bus.global_subscribe(|celsius: f64| println!("audit: {}", celsius));
//! bus.subscribe(Topic::namespaced("spindle", "rpm"), |rpm: u32| {
//!     println!("spindle at {} RPM", rpm);
//! });
//!
//! bus.start();
//! bus.publish("temp", 21.5_f64);
//! bus.publish(Topic::namespaced("spindle", "rpm"), 12_000_u32);
//!
//! // Joins every worker; no callback runs after this returns
//! bus.stop();
//! ```

mod bus;
mod config;
mod payload;
mod queue;
mod stats;
mod subscription;
mod topic;
mod worker;

#[cfg(test)]
mod test_support;

pub use bus::MessageBus;
pub use config::{MessageBusConfig, MIN_WORKER_STACK_SIZE};
pub use payload::{Payload, PayloadType};
pub use queue::{DeliveryQueue, QueuedMessage};
pub use stats::BusStats;
pub use subscription::{GlobalSubscribers, SubscriptionId, SubscriptionTable, TypedCallback};
pub use topic::{Topic, NAMESPACE_SEPARATOR, NAMESPACE_WILDCARD};
pub use worker::WorkerState;
