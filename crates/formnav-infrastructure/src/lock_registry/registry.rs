use super::interruption::ThreadMarker;
use super::lock::{KeyedLock, LockGuard};
use formnav_core::config::{LockConfig, validate_lock_mask};
use formnav_core::error::{NavigationError, Result};
use std::collections::hash_map::DefaultHasher;
use std::hash::{BuildHasher, BuildHasherDefault};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// How long `acquire` blocks on one lock instance before looking at the table again.
const ACQUIRE_POLL: Duration = Duration::from_millis(50);

#[derive(Default)]
struct Bucket {
    lock: Option<Arc<KeyedLock>>,
    /// Key the current lock was last obtained for.
    key: Option<String>,
}

/// Diagnostic view of one held bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSnapshot {
    pub bucket: usize,
    pub key: Option<String>,
    pub owner: String,
    pub owner_alive: bool,
    pub holds: usize,
    pub held_for: Duration,
}

/// Fixed table of `mask + 1` reentrant locks, indexed by `hash(key) & mask`.
///
/// Keys that share a bucket share its lock. Locks held by exited threads are
/// replaced on the next [`obtain`](Self::obtain); locks held longer than the
/// configured duration get their owner interrupted and are handed out again
/// once it lets go.
pub struct LockRegistry {
    mask: u32,
    buckets: Vec<Mutex<Bucket>>,
    hasher: BuildHasherDefault<DefaultHasher>,
    lock_duration: Duration,
    eviction_grace: Duration,
}

impl LockRegistry {
    pub fn new(config: &LockConfig) -> Result<Self> {
        Self::with_settings(config.mask, config.lock_duration(), config.eviction_grace())
    }

    /// # Errors
    ///
    /// Returns a config error unless `mask` is `2^n - 1` with fewer than 32 bits.
    pub fn with_settings(mask: u32, lock_duration: Duration, eviction_grace: Duration) -> Result<Self> {
        validate_lock_mask(mask)?;
        let buckets = (0..=mask as usize)
            .map(|_| Mutex::new(Bucket::default()))
            .collect();
        Ok(Self {
            mask,
            buckets,
            hasher: BuildHasherDefault::default(),
            lock_duration,
            eviction_grace,
        })
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket a key maps to. Stable across runs of the same build.
    pub fn bucket_index(&self, key: &str) -> usize {
        (self.hasher.hash_one(key) & u64::from(self.mask)) as usize
    }

    fn bucket(&self, index: usize) -> MutexGuard<'_, Bucket> {
        self.buckets[index]
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the lock for `key` without taking it.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::EvictionFailed`] when the lock has expired
    /// and its owner did not let go within the grace period.
    pub fn obtain(&self, key: &str) -> Result<Arc<KeyedLock>> {
        let index = self.bucket_index(key);
        let mut bucket = self.bucket(index);

        if let Some(existing) = bucket.key.as_deref() {
            if existing != key {
                tracing::warn!(
                    bucket = index,
                    existing,
                    requested = key,
                    "lock hash collision, keys will share one lock"
                );
            }
        }

        let lock = match bucket.lock.clone() {
            Some(lock) => lock,
            None => {
                let fresh = Arc::new(KeyedLock::new());
                bucket.lock = Some(fresh.clone());
                fresh
            }
        };

        let Some(owner) = lock.owner() else {
            bucket.key = Some(key.to_string());
            return Ok(lock);
        };

        if !owner.is_alive() {
            tracing::error!(
                key,
                owner = %owner,
                "lock owner exited without releasing, replacing lock"
            );
            let fresh = Arc::new(KeyedLock::new());
            bucket.lock = Some(fresh.clone());
            bucket.key = Some(key.to_string());
            return Ok(fresh);
        }

        let held_for = lock.locked_for().unwrap_or_default();
        if held_for <= self.lock_duration || owner.is_current() {
            return Ok(lock);
        }

        tracing::warn!(
            key,
            owner = %owner,
            held_secs = held_for.as_secs(),
            "lock expired, evicting owner"
        );
        drop(bucket);
        self.evict(key, &lock, &owner)?;
        // Requests already waiting on this lock must contend with the
        // evictor for it, so it is kept rather than replaced.
        Ok(lock)
    }

    /// Takes the lock for `key`, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::LockTimeout`] when the lock stays held, or
    /// the eviction failure from [`obtain`](Self::obtain).
    pub fn acquire(&self, key: &str, timeout: Duration) -> Result<LockGuard> {
        let started = Instant::now();
        let deadline = started + timeout;
        loop {
            let lock = self.obtain(key)?;
            let slice = deadline
                .saturating_duration_since(Instant::now())
                .min(ACQUIRE_POLL);
            if let Some(guard) = lock.try_lock_for(slice) {
                tracing::debug!(key, waited_ms = started.elapsed().as_millis() as u64, "lock acquired");
                return Ok(guard);
            }
            if Instant::now() >= deadline {
                return Err(NavigationError::LockTimeout {
                    key: key.to_string(),
                    waited_secs: timeout.as_secs(),
                });
            }
        }
    }

    /// Seconds the lock for `key` has been held, if it is held.
    pub fn time_locked(&self, key: &str) -> Option<u64> {
        let bucket = self.bucket(self.bucket_index(key));
        bucket
            .lock
            .as_ref()
            .and_then(|lock| lock.locked_for())
            .map(|held| held.as_secs())
    }

    /// Evicts whatever holds the lock for `key`, regardless of age or owner.
    ///
    /// Returns whether a held lock was found.
    pub fn break_any_existing_locks(&self, key: &str) -> Result<bool> {
        let bucket = self.bucket(self.bucket_index(key));
        let Some(lock) = bucket.lock.clone() else {
            return Ok(false);
        };
        let Some(owner) = lock.owner() else {
            return Ok(false);
        };
        drop(bucket);

        tracing::warn!(key, owner = %owner, "breaking existing lock");
        if !owner.is_current() {
            self.evict(key, &lock, &owner)?;
        }
        Ok(true)
    }

    /// Held buckets, for diagnostics.
    pub fn snapshot(&self) -> Vec<LockSnapshot> {
        self.buckets
            .iter()
            .enumerate()
            .filter_map(|(index, bucket)| {
                let bucket = bucket.lock().unwrap_or_else(|e| e.into_inner());
                let lock = bucket.lock.as_ref()?;
                let owner = lock.owner()?;
                Some(LockSnapshot {
                    bucket: index,
                    key: bucket.key.clone(),
                    owner: owner.to_string(),
                    owner_alive: owner.is_alive(),
                    holds: lock.holds(),
                    held_for: lock.locked_for().unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Interrupts `owner` and waits for it to release or exit.
    fn evict(&self, key: &str, lock: &KeyedLock, owner: &Arc<ThreadMarker>) -> Result<()> {
        owner.interrupt();
        if lock.wait_for_owner_gone(owner, self.eviction_grace) {
            tracing::info!(key, owner = %owner, "evicted lock owner");
            return Ok(());
        }
        tracing::error!(
            key,
            owner = %owner,
            grace_secs = self.eviction_grace.as_secs(),
            "unable to evict lock owner"
        );
        Err(NavigationError::EvictionFailed {
            key: key.to_string(),
            owner: owner.to_string(),
        })
    }
}

impl std::fmt::Debug for LockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockRegistry")
            .field("mask", &format_args!("{:#x}", self.mask))
            .field("lock_duration", &self.lock_duration)
            .field("eviction_grace", &self.eviction_grace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock_registry::interruption;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    fn registry(mask: u32) -> LockRegistry {
        LockRegistry::with_settings(mask, Duration::from_secs(300), Duration::from_secs(5)).unwrap()
    }

    /// Holds `key` on another thread until the returned sender fires.
    fn hold_on_other_thread(
        registry: Arc<LockRegistry>,
        key: &str,
    ) -> (mpsc::Sender<()>, thread::JoinHandle<()>) {
        let (release_tx, release_rx) = mpsc::channel();
        let (held_tx, held_rx) = mpsc::channel();
        let key = key.to_string();
        let handle = thread::spawn(move || {
            let _guard = registry.acquire(&key, Duration::from_secs(5)).unwrap();
            held_tx.send(()).unwrap();
            let _ = release_rx.recv();
        });
        held_rx.recv().unwrap();
        (release_tx, handle)
    }

    #[test]
    fn test_rejects_invalid_mask() {
        let err = LockRegistry::with_settings(10, Duration::from_secs(1), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, NavigationError::Config(_)));
    }

    #[test]
    fn test_reentrant_acquire_by_owner() {
        let registry = registry(0xFF);
        let first = registry.acquire("session-1", Duration::ZERO).unwrap();
        let second = registry.acquire("session-1", Duration::ZERO).unwrap();

        assert_eq!(first.lock().holds(), 2);
        assert!(Arc::ptr_eq(first.lock(), second.lock()));
        assert!(registry.time_locked("session-1").is_some());

        drop(second);
        drop(first);
        assert!(registry.time_locked("session-1").is_none());
    }

    #[test]
    fn test_distinct_buckets_do_not_block() {
        let registry = Arc::new(registry(0xFFFF));
        let key_a = "session-a".to_string();
        let key_b = (0..)
            .map(|i| format!("session-b{i}"))
            .find(|k| registry.bucket_index(k) != registry.bucket_index(&key_a))
            .unwrap();

        let (release, handle) = hold_on_other_thread(registry.clone(), &key_a);
        let guard = registry.acquire(&key_b, Duration::ZERO);
        assert!(guard.is_ok());

        release.send(()).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_same_key_times_out_while_held() {
        let registry = Arc::new(registry(0xFFFF));
        let (release, handle) = hold_on_other_thread(registry.clone(), "session-1");

        let err = registry
            .acquire("session-1", Duration::from_millis(100))
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, NavigationError::LockTimeout { .. }));

        release.send(()).unwrap();
        handle.join().unwrap();
        assert!(registry.acquire("session-1", Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_colliding_keys_share_a_lock() {
        let registry = Arc::new(registry(0));
        let (release, handle) = hold_on_other_thread(registry.clone(), "alpha");

        assert!(Arc::ptr_eq(
            &registry.obtain("alpha").unwrap(),
            &registry.obtain("beta").unwrap()
        ));
        assert!(registry.acquire("beta", Duration::from_millis(50)).is_err());
        assert_eq!(registry.snapshot()[0].key.as_deref(), Some("alpha"));

        release.send(()).unwrap();
        handle.join().unwrap();

        // Unheld, so the bucket now belongs to the new key.
        registry.obtain("beta").unwrap();
        assert!(registry.snapshot().is_empty());
        let _guard = registry.acquire("beta", Duration::ZERO).unwrap();
        assert_eq!(registry.snapshot()[0].key.as_deref(), Some("beta"));
    }

    #[test]
    fn test_dead_owner_is_replaced_on_obtain() {
        let registry = Arc::new(registry(0xFF));
        let held = registry.clone();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let guard = held.acquire("session-1", Duration::ZERO).unwrap();
            tx.send(guard.lock().owner().unwrap()).unwrap();
            std::mem::forget(guard);
        })
        .join()
        .unwrap();
        let owner = rx.recv().unwrap();
        assert!(owner.wait_for_exit(Duration::from_secs(5)));

        let stale = registry.snapshot();
        assert_eq!(stale.len(), 1);
        assert!(!stale[0].owner_alive);

        let guard = registry.acquire("session-1", Duration::ZERO).unwrap();
        assert!(guard.lock().is_held_by_current_thread());
    }

    #[test]
    fn test_expired_lock_interrupts_cooperative_owner() {
        let registry = Arc::new(
            LockRegistry::with_settings(0xFF, Duration::from_millis(50), Duration::from_secs(5))
                .unwrap(),
        );
        let worker_registry = registry.clone();
        let (held_tx, held_rx) = mpsc::channel();
        let worker = thread::spawn(move || {
            let _guard = worker_registry
                .acquire("session-1", Duration::ZERO)
                .unwrap();
            held_tx.send(()).unwrap();
            while !interruption::is_interrupted() {
                thread::sleep(Duration::from_millis(5));
            }
            interruption::check_interrupted().is_err()
        });
        held_rx.recv().unwrap();
        thread::sleep(Duration::from_millis(100));

        let guard = registry.acquire("session-1", Duration::from_secs(5)).unwrap();
        assert!(guard.lock().is_held_by_current_thread());
        assert!(worker.join().unwrap());
    }

    #[test]
    fn test_unresponsive_owner_is_eviction_failure() {
        let registry = Arc::new(
            LockRegistry::with_settings(0xFF, Duration::from_millis(10), Duration::from_millis(50))
                .unwrap(),
        );
        let (release, handle) = hold_on_other_thread(registry.clone(), "session-1");
        thread::sleep(Duration::from_millis(30));

        let err = registry.obtain("session-1").unwrap_err();
        assert!(matches!(err, NavigationError::EvictionFailed { ref key, .. } if key == "session-1"));
        assert!(err.is_retryable());

        release.send(()).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_own_expired_lock_is_not_evicted() {
        let registry =
            LockRegistry::with_settings(0xFF, Duration::from_millis(10), Duration::from_millis(10))
                .unwrap();
        let outer = registry.acquire("session-1", Duration::ZERO).unwrap();
        thread::sleep(Duration::from_millis(30));

        let lock = registry.obtain("session-1").unwrap();
        assert!(Arc::ptr_eq(&lock, outer.lock()));
        assert!(!interruption::is_interrupted());
    }

    #[test]
    fn test_break_existing_locks() {
        let registry = Arc::new(registry(0xFF));
        assert!(!registry.break_any_existing_locks("session-1").unwrap());

        let worker_registry = registry.clone();
        let (held_tx, held_rx) = mpsc::channel();
        let worker = thread::spawn(move || {
            let _guard = worker_registry
                .acquire("session-1", Duration::ZERO)
                .unwrap();
            held_tx.send(()).unwrap();
            while !interruption::is_interrupted() {
                thread::sleep(Duration::from_millis(5));
            }
        });
        held_rx.recv().unwrap();
        let before = registry.obtain("session-1").unwrap();

        assert!(registry.break_any_existing_locks("session-1").unwrap());
        worker.join().unwrap();
        assert!(Arc::ptr_eq(&before, &registry.obtain("session-1").unwrap()));
        assert!(registry.time_locked("session-1").is_none());
        assert!(registry.acquire("session-1", Duration::ZERO).is_ok());
    }

    #[test]
    fn test_eviction_keeps_waiters_and_evictor_exclusive() {
        let registry = Arc::new(
            LockRegistry::with_settings(0xFF, Duration::from_millis(100), Duration::from_secs(5))
                .unwrap(),
        );
        let inside = Arc::new(AtomicUsize::new(0));
        let most_inside = Arc::new(AtomicUsize::new(0));

        let owner_registry = registry.clone();
        let (held_tx, held_rx) = mpsc::channel();
        let owner = thread::spawn(move || {
            let _guard = owner_registry.acquire("s", Duration::ZERO).unwrap();
            held_tx.send(()).unwrap();
            while !interruption::is_interrupted() {
                thread::sleep(Duration::from_millis(2));
            }
        });
        held_rx.recv().unwrap();

        let contender = |delay: Duration| {
            let registry = registry.clone();
            let inside = inside.clone();
            let most_inside = most_inside.clone();
            thread::spawn(move || {
                thread::sleep(delay);
                let guard = registry.acquire("s", Duration::from_secs(5)).unwrap();
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                most_inside.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(30));
                inside.fetch_sub(1, Ordering::SeqCst);
                drop(guard);
            })
        };
        // One request starts waiting before the lock expires, one arrives after.
        let waiter = contender(Duration::from_millis(80));
        let evictor = contender(Duration::from_millis(110));

        owner.join().unwrap();
        waiter.join().unwrap();
        evictor.join().unwrap();
        assert_eq!(most_inside.load(Ordering::SeqCst), 1);
        assert!(registry.time_locked("s").is_none());
    }
}
