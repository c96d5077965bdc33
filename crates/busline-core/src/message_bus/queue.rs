//! Delivery queue.
//!
//! Published messages are routed at enqueue time into one FIFO lane per
//! payload type. Each lane has its own lock and condition variable, so the
//! dispatch worker for a type only ever sees payloads of that type and never
//! has to discard or requeue someone else's message. Traffic of one type
//! cannot starve another.
//!
//! ```text
//! publish(topic, f64) ──► [lane f64]    ──► worker f64
//! publish(topic, Jog) ──► [lane Jog]    ──► worker Jog
//! publish(topic, Str) ──► [lane String] ──► worker String
//! ```
//!
//! Lanes are unbounded. A lane whose type has no running worker keeps
//! accumulating until a worker is started for it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::payload::{Payload, PayloadType};
use crate::types::{thread_safe_rw_map, ThreadSafeRwMap};

/// A message waiting for dispatch
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    /// Fully-qualified topic
    pub topic: String,
    /// Tagged value
    pub payload: Payload,
    /// Global enqueue order across all lanes
    pub sequence: u64,
}

#[derive(Default)]
struct Lane {
    items: Mutex<VecDeque<QueuedMessage>>,
    ready: Condvar,
}

/// FIFO lanes keyed by payload type
#[derive(Default)]
pub struct DeliveryQueue {
    lanes: ThreadSafeRwMap<PayloadType, Arc<Lane>>,
    sequence: AtomicU64,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self {
            lanes: thread_safe_rw_map(),
            sequence: AtomicU64::new(0),
        }
    }

    fn lane(&self, ty: PayloadType) -> Arc<Lane> {
        if let Some(lane) = self.lanes.read().get(&ty) {
            return Arc::clone(lane);
        }
        Arc::clone(self.lanes.write().entry(ty).or_default())
    }

    /// Append a message to the tail of its type's lane and wake the lane's worker
    ///
    /// Returns the message's sequence number.
    pub fn push(&self, topic: String, payload: Payload) -> u64 {
        let lane = self.lane(payload.payload_type());
        let mut items = lane.items.lock();
        // Numbered under the lane lock so lane order and sequence order agree.
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        items.push_back(QueuedMessage {
            topic,
            payload,
            sequence,
        });
        drop(items);
        // A worker that is being replaced may still be parked on this lane.
        lane.ready.notify_all();
        sequence
    }

    /// Block until a message of type `ty` is available or `cancelled` is set
    ///
    /// Returns `None` on cancellation, leaving any queued messages in place.
    pub fn pop(&self, ty: PayloadType, cancelled: &AtomicBool) -> Option<QueuedMessage> {
        let lane = self.lane(ty);
        let mut items = lane.items.lock();
        loop {
            if cancelled.load(Ordering::Acquire) {
                return None;
            }
            if let Some(message) = items.pop_front() {
                return Some(message);
            }
            lane.ready.wait(&mut items);
        }
    }

    /// Wake every waiter on the lane for `ty` so it re-checks its cancel flag
    pub fn wake(&self, ty: PayloadType) {
        let lane = self.lane(ty);
        let _items = lane.items.lock();
        lane.ready.notify_all();
    }

    /// Messages waiting in the lane for `ty`
    pub fn len(&self, ty: PayloadType) -> usize {
        self.lanes
            .read()
            .get(&ty)
            .map_or(0, |lane| lane.items.lock().len())
    }

    /// Messages waiting across all lanes
    pub fn total_len(&self) -> usize {
        self.lanes
            .read()
            .values()
            .map(|lane| lane.items.lock().len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// Discard everything waiting in the lane for `ty`
    ///
    /// Returns the number of messages dropped.
    pub fn clear(&self, ty: PayloadType) -> usize {
        let Some(lane) = self.lanes.read().get(&ty).cloned() else {
            return 0;
        };
        let mut items = lane.items.lock();
        let dropped = items.len();
        items.clear();
        dropped
    }
}
