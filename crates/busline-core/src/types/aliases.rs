//! Type aliases for the shared state behind the message bus.
//!
//! The bus keeps its subscription table, global subscriber list, delivery
//! lanes and worker pool behind independent locks. These aliases give
//! those nested types readable names and keep the lock flavour in one place.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use busline_core::types::*;
//!
//! // Instead of: Arc<RwLock<HashMap<String, Vec<Entry>>>>
//! let table: ThreadSafeRwMap<String, Vec<Entry>> = thread_safe_rw_map();
//! ```

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

// =============================================================================
// THREAD-SAFE SHARED TYPES (Arc<Mutex<T>> / Arc<RwLock<T>>)
// =============================================================================

/// A thread-safe, mutex-protected wrapper for cross-thread sharing.
///
/// Uses `parking_lot::Mutex`, which does not poison when a holder panics.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// A thread-safe reader-writer lock wrapper for read-heavy workloads.
///
/// Multiple dispatch workers can read concurrently; subscribe and
/// unsubscribe take the write side.
pub type ThreadSafeRw<T> = Arc<RwLock<T>>;

/// A thread-safe reader-writer hash map.
pub type ThreadSafeRwMap<K, V> = Arc<RwLock<HashMap<K, V>>>;

// =============================================================================
// CONSTRUCTOR HELPERS
// =============================================================================

/// Create a new `ThreadSafe<T>` from a value.
#[inline]
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}

/// Create a new `ThreadSafeRw<T>` from a value.
#[inline]
pub fn thread_safe_rw<T>(value: T) -> ThreadSafeRw<T> {
    Arc::new(RwLock::new(value))
}

/// Create a new empty `ThreadSafeRwMap<K, V>`.
#[inline]
pub fn thread_safe_rw_map<K, V>() -> ThreadSafeRwMap<K, V> {
    Arc::new(RwLock::new(HashMap::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_safe_creation() {
        let value: ThreadSafe<i32> = thread_safe(42);
        assert_eq!(*value.lock(), 42);

        *value.lock() = 100;
        assert_eq!(*value.lock(), 100);
    }

    #[test]
    fn test_thread_safe_rw_map() {
        let map: ThreadSafeRwMap<String, Vec<i32>> = thread_safe_rw_map();
        map.write().entry("temp".to_string()).or_default().push(1);

        // Multiple readers
        assert_eq!(map.read().get("temp").map(Vec::len), Some(1));
        assert_eq!(map.read().len(), 1);
    }

    #[test]
    fn test_thread_safe_rw() {
        let value: ThreadSafeRw<Vec<u8>> = thread_safe_rw(Vec::new());
        value.write().push(7);
        assert_eq!(value.read().as_slice(), &[7]);
    }
}
