//! Per-key blocking decorator
//!
//! A miss leaves the key locked by the calling thread until it stores a value
//! (or gives up through `remove`), so concurrent callers wait for that one
//! computation instead of repeating it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::error::{CacheError, CacheResult};
use super::key::CacheKey;
use super::provider::{Cache, CacheValue};

#[derive(Debug, Default)]
struct KeyLock {
    owner: Mutex<Option<ThreadId>>,
    released: Condvar,
}

/// Serializes misses on the same key across threads.
///
/// - `get` takes the key's lock. A hit releases it at once; a miss or an
///   explicit [`CacheValue::Null`] keeps it for the calling thread.
/// - `put` writes through and then releases.
/// - `remove` only releases; the delegate is not touched.
///
/// Releasing a lock the current thread does not own is a no-op. A thread that
/// already owns a key's lock acquires it again without waiting, and a single
/// release frees it.
pub struct BlockingCache<C> {
    inner: C,
    timeout: Option<Duration>,
    locks: Mutex<HashMap<CacheKey, Arc<KeyLock>>>,
    epoch: AtomicU64,
}

impl<C: std::fmt::Debug> std::fmt::Debug for BlockingCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingCache")
            .field("inner", &self.inner)
            .field("timeout", &self.timeout)
            .field("held_locks", &self.locks.lock().len())
            .finish_non_exhaustive()
    }
}

impl<C: Cache> BlockingCache<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            timeout: None,
            locks: Mutex::new(HashMap::new()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Bound the wait for a key's lock. `None` or a zero duration waits forever.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Number of keys with a live lock entry
    pub fn lock_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Wake every caller currently waiting for a key lock; each fails with
    /// [`CacheError::Interrupted`]. Holders keep their locks.
    pub fn interrupt_waiters(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let locks: Vec<Arc<KeyLock>> = self.locks.lock().values().cloned().collect();
        for lock in locks {
            let _owner = lock.owner.lock();
            lock.released.notify_all();
        }
    }

    fn acquire(&self, key: &CacheKey) -> CacheResult<()> {
        let lock = Arc::clone(
            self.locks
                .lock()
                .entry(key.clone())
                .or_insert_with(|| Arc::new(KeyLock::default())),
        );
        let me = thread::current().id();
        let epoch = self.epoch.load(Ordering::SeqCst);
        let deadline = self.timeout.map(|t| Instant::now() + t);

        let failure = {
            let mut owner = lock.owner.lock();
            loop {
                match *owner {
                    None => {
                        *owner = Some(me);
                        return Ok(());
                    }
                    Some(holder) if holder == me => return Ok(()),
                    Some(_) => {}
                }
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    break CacheError::Interrupted {
                        cache: self.inner.id().to_string(),
                        key: key.to_string(),
                    };
                }
                match (deadline, self.timeout) {
                    (Some(deadline), Some(timeout)) => {
                        if lock.released.wait_until(&mut owner, deadline).timed_out()
                            && owner.is_some()
                        {
                            break CacheError::LockTimeout {
                                cache: self.inner.id().to_string(),
                                key: key.to_string(),
                                timeout,
                            };
                        }
                    }
                    _ => lock.released.wait(&mut owner),
                }
            }
        };

        drop(lock);
        self.discard_if_idle(key);
        tracing::debug!(cache.id = self.inner.id(), cache.key = %key, error = %failure, "key lock not acquired");
        Err(failure)
    }

    fn release(&self, key: &CacheKey) {
        let me = thread::current().id();
        let mut locks = self.locks.lock();
        let Some(lock) = locks.get(key) else {
            return;
        };
        let idle = {
            let mut owner = lock.owner.lock();
            if *owner != Some(me) {
                return;
            }
            *owner = None;
            lock.released.notify_all();
            Arc::strong_count(lock) == 1
        };
        if idle {
            locks.remove(key);
        }
    }

    fn discard_if_idle(&self, key: &CacheKey) {
        let mut locks = self.locks.lock();
        let idle = locks
            .get(key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1 && lock.owner.lock().is_none());
        if idle {
            locks.remove(key);
        }
    }
}

impl<C: Cache> Cache for BlockingCache<C> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> CacheResult<()> {
        let result = self.inner.put(key.clone(), value);
        self.release(&key);
        result
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        self.acquire(key)?;
        match self.inner.get(key) {
            // An explicit null still needs a value, so the caller keeps the lock
            Ok(None) => Ok(None),
            Ok(Some(CacheValue::Null)) => Ok(Some(CacheValue::Null)),
            other => {
                self.release(key);
                other
            }
        }
    }

    fn remove(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        self.release(key);
        Ok(None)
    }

    fn clear(&self) -> CacheResult<()> {
        self.inner.clear()
    }
}
