//! Concurrency primitives shared by the managers.
//!
//! - [`KeyedLocks`] serializes work per entity id (one product, one version)
//!   while letting unrelated entities proceed in parallel.
//! - [`CancelToken`] is a cooperative cancellation flag checked by long
//!   operations between units of work.
//! - [`retry_with_backoff`] retries operations that failed with a transient
//!   I/O error.

use crate::{Error, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Per-key mutual exclusion.
///
/// Locks are created lazily on first use and shared through `Arc`, so a
/// caller can hold a guard without keeping the map locked.
pub struct KeyedLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the lock for `key`.
    pub fn get(&self, key: &str) -> Arc<Mutex<()>> {
        {
            let map = self.locks.read();
            if let Some(lock) = map.get(key) {
                return lock.clone();
            }
        }

        let mut map = self.locks.write();
        // Another thread may have inserted it between the two locks
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` while holding the lock for `key`.
    ///
    /// The entry is dropped afterwards unless another caller still holds
    /// or waits on it.
    pub fn with<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.get(key);
        let result = {
            let _guard = lock.lock();
            f()
        };
        self.release(key, lock);
        result
    }

    /// Number of keys with a live entry.
    pub fn len(&self) -> usize {
        self.locks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut map = self.locks.write();
        let ours = Arc::as_ptr(&lock);
        drop(lock);
        // Only the map's reference left
        let idle = map
            .get(key)
            .is_some_and(|held| Arc::as_ptr(held) == ours && Arc::strong_count(held) == 1);
        if idle {
            map.remove(key);
        }
    }
}

impl Default for KeyedLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative cancellation flag.
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Return `Err(Cancelled)` once the token has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Bounded retry settings for transient I/O failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Delay before the first retry; doubled for each further retry
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(25),
        }
    }
}

/// Whether an I/O error is worth retrying.
pub fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Run `op`, retrying transient I/O failures with exponential backoff.
///
/// Non-transient errors are returned immediately.
pub fn retry_with_backoff<T>(
    policy: RetryPolicy,
    what: &str,
    mut op: impl FnMut() -> Result<T>,
) -> Result<T> {
    let attempts = policy.attempts.max(1);
    let mut delay = policy.backoff;
    let mut attempt = 1;

    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && e.as_io().is_some_and(is_transient) => {
                warn!(
                    operation = what,
                    attempt,
                    error = %e,
                    "Transient I/O failure, retrying"
                );
                std::thread::sleep(delay);
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
