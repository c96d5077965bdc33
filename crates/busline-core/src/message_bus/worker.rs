//! Dispatch workers.
//!
//! One OS thread per payload type drains that type's delivery lane and runs
//! the matching callbacks:
//!
//! ```text
//!            spawn            pop()               dispatch done
//! Created ───────► Running ─────────► Dispatching ─────────────► Running
//!                     │                                             │
//!                     └──────────── cancel flag set ◄───────────────┘
//!                                        │
//!                                        ▼
//!                                     Stopped
//! ```
//!
//! ## Rules
//! - Topic subscribers run first in priority order, then global subscribers.
//! - Topic subscribers registered for another payload type are skipped.
//! - A panic or `Err` from one callback is logged and does not affect the
//!   other callbacks of the same dispatch or the worker loop.
//! - Cancellation is checked on every wake and between messages. An in-flight
//!   callback always runs to completion; queued messages stay queued.
//!
//! **Warning**: panics are caught with `AssertUnwindSafe`. A subscriber that
//! panics while holding its own lock may leave its state inconsistent.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, info_span, trace, warn};

use super::bus::BusCore;
use super::config::MessageBusConfig;
use super::payload::PayloadType;
use super::queue::QueuedMessage;
use super::subscription::TypedCallback;
use crate::error::BusError;

/// Topic label used when reporting failures of global subscribers
const GLOBAL_TOPIC_LABEL: &str = "*";

/// Lifecycle of a dispatch worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Thread spawned, loop not yet entered.
    Created,
    /// Waiting for messages.
    Running,
    /// Invoking callbacks for one message.
    Dispatching,
    /// Loop exited.
    Stopped,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Created,
            1 => WorkerState::Running,
            2 => WorkerState::Dispatching,
            _ => WorkerState::Stopped,
        }
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Created => write!(f, "Created"),
            WorkerState::Running => write!(f, "Running"),
            WorkerState::Dispatching => write!(f, "Dispatching"),
            WorkerState::Stopped => write!(f, "Stopped"),
        }
    }
}

#[derive(Debug)]
struct WorkerControl {
    cancelled: AtomicBool,
    state: AtomicU8,
}

impl WorkerControl {
    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// Handle to the background thread serving one payload type
pub(crate) struct DispatchWorker {
    ty: PayloadType,
    control: Arc<WorkerControl>,
    handle: Option<JoinHandle<()>>,
}

impl DispatchWorker {
    pub fn spawn(
        ty: PayloadType,
        core: Arc<BusCore>,
        config: &MessageBusConfig,
    ) -> Result<Self, BusError> {
        let control = Arc::new(WorkerControl {
            cancelled: AtomicBool::new(false),
            state: AtomicU8::new(WorkerState::Created as u8),
        });

        let mut builder = thread::Builder::new().name(format!(
            "{}-{}",
            config.thread_name_prefix,
            ty.short_name()
        ));
        if let Some(size) = config.worker_stack_size {
            builder = builder.stack_size(size);
        }

        let worker_control = Arc::clone(&control);
        let handle = builder
            .spawn(move || run(ty, &worker_control, &core))
            .map_err(|e| BusError::WorkerSpawn {
                payload: ty.name(),
                reason: e.to_string(),
            })?;

        info!(payload = ty.name(), "Dispatch worker started");
        Ok(Self {
            ty,
            control,
            handle: Some(handle),
        })
    }

    pub fn state(&self) -> WorkerState {
        self.control.state()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Set the cancel flag and wake the worker if it is parked on its lane
    pub fn cancel(&self, core: &BusCore) {
        self.control.cancelled.store(true, Ordering::Release);
        core.queue.wake(self.ty);
    }

    /// Wait for the worker thread to exit
    ///
    /// Called from any dispatch worker thread (a callback stopping its own
    /// or another worker) this detaches instead of joining. Two callbacks
    /// stopping each other would otherwise wait on each other forever. The
    /// cancel flag is already set, so the thread exits once its callback
    /// returns.
    pub fn join(mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if on_dispatch_worker() {
            debug!(
                payload = self.ty.name(),
                "Dispatch worker stopped from a callback, not joining"
            );
            return;
        }
        if handle.join().is_err() {
            error!(payload = self.ty.name(), "Dispatch worker thread panicked");
        }
        info!(payload = self.ty.name(), "Dispatch worker stopped");
    }
}

impl std::fmt::Debug for DispatchWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchWorker")
            .field("payload", &self.ty.name())
            .field("state", &self.state())
            .finish()
    }
}

thread_local! {
    static ON_DISPATCH_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is a dispatch worker of any bus
pub(crate) fn on_dispatch_worker() -> bool {
    ON_DISPATCH_WORKER.with(Cell::get)
}

fn run(ty: PayloadType, control: &WorkerControl, core: &BusCore) {
    ON_DISPATCH_WORKER.with(|flag| flag.set(true));
    let span = info_span!("dispatch_worker", payload = ty.name());
    let _enter = span.enter();

    control.set_state(WorkerState::Running);
    while let Some(message) = core.queue.pop(ty, &control.cancelled) {
        control.set_state(WorkerState::Dispatching);
        dispatch(ty, &message, core);
        control.set_state(WorkerState::Running);
    }
    control.set_state(WorkerState::Stopped);
}

/// Deliver one message to its topic subscribers, then to global subscribers
fn dispatch(ty: PayloadType, message: &QueuedMessage, core: &BusCore) {
    let entries = core.table.snapshot(&message.topic);
    let globals = core.globals.snapshot_for(ty);

    if entries.is_empty() && globals.is_empty() {
        trace!(topic = %message.topic, sequence = message.sequence, "No subscribers, message dropped");
        core.counters.record_dropped();
        return;
    }

    for entry in &entries {
        let expected = entry.callback.payload_type();
        if expected != ty {
            let mismatch = BusError::TypeMismatch {
                topic: message.topic.clone(),
                expected: expected.name(),
                actual: ty.name(),
            };
            debug!(subscription = %entry.id, "{}", mismatch);
            core.counters.record_mismatched();
            continue;
        }
        invoke(&message.topic, &entry.callback, message, core);
    }

    for entry in &globals {
        invoke(GLOBAL_TOPIC_LABEL, &entry.callback, message, core);
    }
}

fn invoke(label: &str, callback: &TypedCallback, message: &QueuedMessage, core: &BusCore) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback.invoke(&message.payload)));
    let reason = match outcome {
        Ok(Ok(())) => {
            core.counters.record_delivered();
            return;
        }
        Ok(Err(err)) => format!("{:#}", err),
        Err(panic_err) => {
            if let Some(msg) = panic_err.downcast_ref::<&'static str>() {
                format!("panicked: {}", msg)
            } else if let Some(msg) = panic_err.downcast_ref::<String>() {
                format!("panicked: {}", msg)
            } else {
                "panicked: unknown panic".to_string()
            }
        }
    };

    core.counters.record_failed();
    let failure = BusError::CallbackFailure {
        topic: label.to_string(),
        payload: message.payload.payload_type().name(),
        reason,
    };
    warn!(sequence = message.sequence, "{}", failure);
}
