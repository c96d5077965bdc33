//! Message bus implementation.
//!
//! Provides the [`MessageBus`] facade that owns the subscription table, the
//! global subscriber list, the delivery queue and the dispatch workers.
//!
//! The bus is an ordinary value: construct it, share it (usually behind an
//! `Arc`), and drop it to stop every worker. Independent buses do not
//! interact, which keeps tests isolated.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

use super::config::MessageBusConfig;
use super::payload::{Payload, PayloadType};
use super::queue::DeliveryQueue;
use super::stats::{BusStats, DispatchCounters};
use super::subscription::{GlobalSubscribers, SubscriptionId, SubscriptionTable, TypedCallback};
use super::topic::Topic;
use super::worker::{DispatchWorker, WorkerState};
use crate::types::{thread_safe, ThreadSafe};

/// State shared between the facade and its workers
///
/// Each part carries its own lock, so a burst of subscriptions never stalls
/// publishers and a long queue never stalls subscribers.
#[derive(Default)]
pub(crate) struct BusCore {
    pub table: SubscriptionTable,
    pub globals: GlobalSubscribers,
    pub queue: DeliveryQueue,
    pub counters: DispatchCounters,
}

#[derive(Default)]
struct WorkerPool {
    running: bool,
    workers: HashMap<PayloadType, DispatchWorker>,
}

/// In-process, type-routed publish/subscribe bus
pub struct MessageBus {
    core: Arc<BusCore>,
    pool: ThreadSafe<WorkerPool>,
    config: MessageBusConfig,
}

impl MessageBus {
    /// Create a new message bus with default configuration
    pub fn new() -> Self {
        Self::with_config(MessageBusConfig::default())
    }

    /// Create a new message bus with custom configuration
    pub fn with_config(config: MessageBusConfig) -> Self {
        Self {
            core: Arc::new(BusCore::default()),
            pool: thread_safe(WorkerPool::default()),
            config,
        }
    }

    // ---- Subscription table ----

    /// Subscribe to `topic` with priority 0
    ///
    /// The callback receives a clone of every `T` published on the topic.
    /// Subscribing the same callback twice yields two invocations per publish.
    pub fn subscribe<T, F>(&self, topic: impl Into<Topic>, callback: F) -> SubscriptionId
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe_with_priority(topic, 0, callback)
    }

    /// Subscribe to `topic`; higher priorities run first, ties in registration order
    pub fn subscribe_with_priority<T, F>(
        &self,
        topic: impl Into<Topic>,
        priority: i32,
        callback: F,
    ) -> SubscriptionId
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.register(topic.into(), priority, TypedCallback::new(callback))
    }

    /// Subscribe with a fallible callback; an `Err` is logged as a callback failure
    pub fn try_subscribe<T, F>(
        &self,
        topic: impl Into<Topic>,
        priority: i32,
        callback: F,
    ) -> SubscriptionId
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(topic.into(), priority, TypedCallback::fallible(callback))
    }

    /// Subscribe to the `ns.*` topic of a namespace
    ///
    /// This only receives messages published to exactly that topic
    /// (`ns::ns.*`). No wildcard matching is performed.
    pub fn subscribe_to_namespace<T, F>(
        &self,
        namespace: &str,
        priority: i32,
        callback: F,
    ) -> SubscriptionId
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.register(
            Topic::namespace_wildcard(namespace),
            priority,
            TypedCallback::new(callback),
        )
    }

    fn register(&self, topic: Topic, priority: i32, callback: TypedCallback) -> SubscriptionId {
        let ty = callback.payload_type();
        let full_topic = topic.full_name();
        let id = self.core.table.insert(full_topic.clone(), priority, callback);
        debug!(
            topic = %full_topic,
            payload = ty.name(),
            priority,
            subscription = %id,
            "Subscription added"
        );
        self.auto_start(ty);
        id
    }

    /// Remove every `T` subscriber on `topic`
    ///
    /// Matching is by payload type, so all callbacks accepting `T` on this
    /// topic are removed, not a single one. Use [`unsubscribe_id`](Self::unsubscribe_id)
    /// to remove one registration. Returns the number removed; an unknown
    /// topic is a no-op.
    pub fn unsubscribe<T: 'static>(&self, topic: impl Into<Topic>) -> usize {
        let full_topic = topic.into().full_name();
        let ty = PayloadType::of::<T>();
        let removed = self.core.table.remove_type(&full_topic, ty);
        if removed > 0 {
            debug!(topic = %full_topic, payload = ty.name(), removed, "Subscriptions removed");
        }
        removed
    }

    /// Remove a single topic or global subscription by its handle
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe_id(&self, id: SubscriptionId) -> bool {
        let removed = self.core.table.remove_id(id) || self.core.globals.remove_id(id);
        if removed {
            debug!(subscription = %id, "Subscription removed");
        }
        removed
    }

    // ---- Global subscribers ----

    /// Receive every `T` published on any topic, after the topic subscribers
    pub fn global_subscribe<T, F>(&self, callback: F) -> SubscriptionId
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let callback = TypedCallback::new(callback);
        let ty = callback.payload_type();
        let id = self.core.globals.insert(callback);
        debug!(payload = ty.name(), subscription = %id, "Global subscription added");
        self.auto_start(ty);
        id
    }

    /// Remove every global `T` subscriber
    pub fn global_unsubscribe<T: 'static>(&self) -> usize {
        let ty = PayloadType::of::<T>();
        let removed = self.core.globals.remove_type(ty);
        if removed > 0 {
            debug!(payload = ty.name(), removed, "Global subscriptions removed");
        }
        removed
    }

    // ---- Publishing ----

    /// Queue `value` for delivery on `topic`
    ///
    /// Never blocks on subscribers and never fails. If no worker is running
    /// for `T` the message waits in the queue until one is started. On a
    /// running bus, a value that no topic or global subscriber accepts is
    /// dropped here instead of being queued.
    pub fn publish<T>(&self, topic: impl Into<Topic>, value: T)
    where
        T: Send + Sync + 'static,
    {
        let full_topic = topic.into().full_name();
        self.core.counters.record_published();

        let ty = PayloadType::of::<T>();
        if self.is_running() && !self.core.table.accepts(ty) && !self.core.globals.accepts(ty) {
            self.core.counters.record_dropped();
            trace!(
                topic = %full_topic,
                payload = ty.name(),
                "No subscribers for payload type, message dropped"
            );
            return;
        }

        let sequence = self.core.queue.push(full_topic, Payload::new(value));
        trace!(sequence, payload = ty.name(), "Message queued");
    }

    /// Bridge a topic into an async channel
    ///
    /// Every `T` delivered on `topic` is forwarded to the returned receiver,
    /// so async consumers (UI bridges, tokio tasks) can `recv().await` instead
    /// of running inside a dispatch worker. Remove the bridge with
    /// [`unsubscribe_id`](Self::unsubscribe_id).
    pub fn channel<T>(&self, topic: impl Into<Topic>) -> (SubscriptionId, mpsc::UnboundedReceiver<T>)
    where
        T: Clone + Send + Sync + 'static,
    {
        let topic = topic.into();
        let label = topic.full_name();
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe(topic, move |value: T| {
            if tx.send(value).is_err() {
                debug!(topic = %label, "Channel receiver dropped, message discarded");
            }
        });
        (id, rx)
    }

    // ---- Worker lifecycle ----

    /// Mark the bus running and start workers for every subscribed payload type
    ///
    /// Workers are only started automatically when
    /// [`MessageBusConfig::auto_start_workers`] is set. Calling `start` twice
    /// is harmless.
    pub fn start(&self) {
        let mut pool = self.pool.lock();
        if !pool.running {
            pool.running = true;
            info!("Message bus started");
        }
        if self.config.auto_start_workers {
            for ty in self.subscribed_types() {
                self.ensure_worker(&mut pool, ty);
            }
        }
    }

    /// Stop every worker; equivalent to [`stop_all_processing_threads`](Self::stop_all_processing_threads)
    pub fn stop(&self) {
        self.stop_all_processing_threads();
    }

    /// Start the dispatch worker for `T`, marking the bus running
    ///
    /// Returns true if a worker for `T` is running after the call.
    pub fn start_processing_thread<T: 'static>(&self) -> bool {
        let mut pool = self.pool.lock();
        pool.running = true;
        self.ensure_worker(&mut pool, PayloadType::of::<T>())
    }

    /// Cancel and join the dispatch worker for `T` only
    ///
    /// A no-op if no worker for `T` is running. Called from inside a callback,
    /// the worker is cancelled but not joined.
    pub fn stop_processing_thread<T: 'static>(&self) {
        let worker = self.pool.lock().workers.remove(&PayloadType::of::<T>());
        if let Some(worker) = worker {
            worker.cancel(&self.core);
            worker.join();
        }
    }

    /// Cancel and join every worker, then mark the bus not running
    ///
    /// When this returns no callback is executing. Called from inside a
    /// callback, workers are cancelled but not joined; each exits once its
    /// current callback returns. Later publishes are queued but not drained
    /// until a worker is started again.
    pub fn stop_all_processing_threads(&self) {
        let workers: Vec<DispatchWorker> = {
            let mut pool = self.pool.lock();
            if pool.running {
                info!("Message bus stopping");
            }
            pool.running = false;
            pool.workers.drain().map(|(_, worker)| worker).collect()
        };

        for worker in &workers {
            worker.cancel(&self.core);
        }
        for worker in workers {
            worker.join();
        }
    }

    fn auto_start(&self, ty: PayloadType) {
        if !self.config.auto_start_workers {
            return;
        }
        let mut pool = self.pool.lock();
        if pool.running {
            self.ensure_worker(&mut pool, ty);
        }
    }

    fn ensure_worker(&self, pool: &mut WorkerPool, ty: PayloadType) -> bool {
        if pool
            .workers
            .get(&ty)
            .is_some_and(|worker| !worker.is_finished())
        {
            return true;
        }
        if let Some(stale) = pool.workers.remove(&ty) {
            stale.join();
        }

        match DispatchWorker::spawn(ty, Arc::clone(&self.core), &self.config) {
            Ok(worker) => {
                pool.workers.insert(ty, worker);
                true
            }
            Err(err) => {
                error!("{}", err);
                false
            }
        }
    }

    fn subscribed_types(&self) -> Vec<PayloadType> {
        let mut types = self.core.table.payload_types();
        for ty in self.core.globals.payload_types() {
            if !types.contains(&ty) {
                types.push(ty);
            }
        }
        types
    }

    // ---- Introspection ----

    /// Number of subscribers on `topic`
    pub fn subscriber_count(&self, topic: impl Into<Topic>) -> usize {
        self.core.table.count(&topic.into().full_name())
    }

    /// Number of global subscribers across all payload types
    pub fn global_subscriber_count(&self) -> usize {
        self.core.globals.count()
    }

    /// Fully-qualified topics that currently have subscribers
    pub fn topics(&self) -> Vec<String> {
        self.core.table.topics()
    }

    /// Messages of type `T` waiting for dispatch
    pub fn pending<T: 'static>(&self) -> usize {
        self.core.queue.len(PayloadType::of::<T>())
    }

    /// Drop every queued `T` message, returning how many were discarded
    pub fn clear_pending<T: 'static>(&self) -> usize {
        let dropped = self.core.queue.clear(PayloadType::of::<T>());
        if dropped > 0 {
            debug!(payload = std::any::type_name::<T>(), dropped, "Pending messages cleared");
        }
        dropped
    }

    /// Whether the bus is running (started and not stopped)
    pub fn is_running(&self) -> bool {
        self.pool.lock().running
    }

    /// Whether a worker for `T` is alive
    pub fn is_processing<T: 'static>(&self) -> bool {
        self.pool
            .lock()
            .workers
            .get(&PayloadType::of::<T>())
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Lifecycle state of the worker for `T`, if one exists
    pub fn worker_state<T: 'static>(&self) -> Option<WorkerState> {
        self.pool
            .lock()
            .workers
            .get(&PayloadType::of::<T>())
            .map(DispatchWorker::state)
    }

    /// Snapshot of counters, queue depth and worker count
    pub fn stats(&self) -> BusStats {
        let (workers, running) = {
            let pool = self.pool.lock();
            (pool.workers.len(), pool.running)
        };
        self.core
            .counters
            .snapshot(self.core.queue.total_len(), workers, running)
    }

    /// Get the current configuration
    pub fn config(&self) -> &MessageBusConfig {
        &self.config
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MessageBus {
    fn drop(&mut self) {
        self.stop_all_processing_threads();
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("topics", &self.core.table.topics().len())
            .field("global_subscribers", &self.global_subscriber_count())
            .field("running", &self.is_running())
            .field("config", &self.config)
            .finish()
    }
}
