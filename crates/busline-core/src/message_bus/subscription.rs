//! Subscription table and global subscriber list.
//!
//! Topic subscribers live in a map from fully-qualified topic to a list kept
//! in descending priority order, with ties in registration order. Global
//! subscribers are a flat list consulted for every message whose payload type
//! matches, after the topic subscribers have run.
//!
//! Both structures hand out cloned snapshots to the dispatch workers so no
//! lock is held while user callbacks execute.

use std::sync::Arc;

use anyhow::anyhow;
use uuid::Uuid;

use super::payload::{Payload, PayloadType};
use crate::types::{thread_safe_rw, thread_safe_rw_map, ThreadSafeRw, ThreadSafeRwMap};

/// Subscription handle for identity-based removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new unique subscription ID
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

type ErasedHandler = Arc<dyn Fn(&Payload) -> anyhow::Result<()> + Send + Sync>;

/// A callback tagged with the payload type it accepts
#[derive(Clone)]
pub struct TypedCallback {
    ty: PayloadType,
    handler: ErasedHandler,
}

impl TypedCallback {
    /// Wrap an infallible handler for payloads of type `T`
    pub fn new<T, F>(handler: F) -> Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::fallible(move |value: T| {
            handler(value);
            Ok(())
        })
    }

    /// Wrap a handler whose `Err` is reported as a callback failure
    pub fn fallible<T, F>(handler: F) -> Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let ty = PayloadType::of::<T>();
        let handler: ErasedHandler = Arc::new(move |payload: &Payload| {
            let value = payload.downcast_ref::<T>().ok_or_else(|| {
                anyhow!(
                    "payload is {}, handler expects {}",
                    payload.payload_type(),
                    ty
                )
            })?;
            handler(value.clone())
        });
        Self { ty, handler }
    }

    /// The payload type this callback accepts
    pub fn payload_type(&self) -> PayloadType {
        self.ty
    }

    pub(crate) fn invoke(&self, payload: &Payload) -> anyhow::Result<()> {
        (self.handler)(payload)
    }
}

impl std::fmt::Debug for TypedCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCallback")
            .field("payload", &self.ty.name())
            .finish()
    }
}

/// One registration on a topic
#[derive(Debug, Clone)]
pub(crate) struct SubscriberEntry {
    pub id: SubscriptionId,
    pub priority: i32,
    pub callback: TypedCallback,
}

/// One registration in the global list
#[derive(Debug, Clone)]
pub(crate) struct GlobalEntry {
    pub id: SubscriptionId,
    pub callback: TypedCallback,
}

/// Per-topic priority-ordered subscriber lists
#[derive(Default)]
pub struct SubscriptionTable {
    topics: ThreadSafeRwMap<String, Vec<SubscriberEntry>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self {
            topics: thread_safe_rw_map(),
        }
    }

    /// Register a callback, keeping the topic's list in descending priority
    ///
    /// The new entry goes after every entry of equal or higher priority,
    /// which keeps ties in registration order.
    pub fn insert(&self, topic: String, priority: i32, callback: TypedCallback) -> SubscriptionId {
        let id = SubscriptionId::new();
        let mut topics = self.topics.write();
        let entries = topics.entry(topic).or_default();
        let index = entries.partition_point(|entry| entry.priority >= priority);
        entries.insert(
            index,
            SubscriberEntry {
                id,
                priority,
                callback,
            },
        );
        id
    }

    /// Remove every entry on `topic` registered for payload type `ty`
    ///
    /// Returns the number of entries removed.
    pub fn remove_type(&self, topic: &str, ty: PayloadType) -> usize {
        let mut topics = self.topics.write();
        let Some(entries) = topics.get_mut(topic) else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|entry| entry.callback.payload_type() != ty);
        let removed = before - entries.len();
        if entries.is_empty() {
            topics.remove(topic);
        }
        removed
    }

    /// Remove the entry with the given id from whichever topic holds it
    pub fn remove_id(&self, id: SubscriptionId) -> bool {
        let mut topics = self.topics.write();
        let Some(topic) = topics
            .iter()
            .find(|(_, entries)| entries.iter().any(|entry| entry.id == id))
            .map(|(topic, _)| topic.clone())
        else {
            return false;
        };
        if let Some(entries) = topics.get_mut(&topic) {
            entries.retain(|entry| entry.id != id);
            if entries.is_empty() {
                topics.remove(&topic);
            }
        }
        true
    }

    pub(crate) fn snapshot(&self, topic: &str) -> Vec<SubscriberEntry> {
        self.topics.read().get(topic).cloned().unwrap_or_default()
    }

    /// Number of subscribers on a fully-qualified topic
    pub fn count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }

    /// Whether any topic subscriber accepts `ty`
    pub fn accepts(&self, ty: PayloadType) -> bool {
        self.topics
            .read()
            .values()
            .flatten()
            .any(|entry| entry.callback.payload_type() == ty)
    }

    /// Distinct payload types with at least one topic subscriber
    pub fn payload_types(&self) -> Vec<PayloadType> {
        let topics = self.topics.read();
        let mut types: Vec<PayloadType> = Vec::new();
        for entry in topics.values().flatten() {
            let ty = entry.callback.payload_type();
            if !types.contains(&ty) {
                types.push(ty);
            }
        }
        types
    }

    /// Fully-qualified topics that currently have subscribers
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.topics.read().keys().cloned().collect();
        topics.sort();
        topics
    }
}

/// Callbacks invoked for every message of their payload type
#[derive(Default)]
pub struct GlobalSubscribers {
    entries: ThreadSafeRw<Vec<GlobalEntry>>,
}

impl GlobalSubscribers {
    pub fn new() -> Self {
        Self {
            entries: thread_safe_rw(Vec::new()),
        }
    }

    pub fn insert(&self, callback: TypedCallback) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.entries.write().push(GlobalEntry { id, callback });
        id
    }

    /// Remove every global entry registered for `ty`
    pub fn remove_type(&self, ty: PayloadType) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.callback.payload_type() != ty);
        before - entries.len()
    }

    pub fn remove_id(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    pub(crate) fn snapshot_for(&self, ty: PayloadType) -> Vec<GlobalEntry> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.callback.payload_type() == ty)
            .cloned()
            .collect()
    }

    /// Number of global subscribers across all payload types
    pub fn count(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether any global subscriber accepts `ty`
    pub fn accepts(&self, ty: PayloadType) -> bool {
        self.entries
            .read()
            .iter()
            .any(|entry| entry.callback.payload_type() == ty)
    }

    /// Distinct payload types with at least one global subscriber
    pub fn payload_types(&self) -> Vec<PayloadType> {
        let mut types: Vec<PayloadType> = Vec::new();
        for entry in self.entries.read().iter() {
            let ty = entry.callback.payload_type();
            if !types.contains(&ty) {
                types.push(ty);
            }
        }
        types
    }
}
