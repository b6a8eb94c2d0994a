use super::interruption::{ThreadMarker, current_marker};
use std::marker::PhantomData;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Default)]
struct LockState {
    owner: Option<Arc<ThreadMarker>>,
    holds: usize,
    locked_at: Option<Instant>,
}

/// A reentrant lock that knows which thread holds it and since when.
#[derive(Default)]
pub struct KeyedLock {
    state: Mutex<LockState>,
    released: Condvar,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Takes the lock, waiting at most `timeout`. Reentrant for the owning thread.
    pub fn try_lock_for(self: &Arc<Self>, timeout: Duration) -> Option<LockGuard> {
        let me = current_marker();
        let deadline = Instant::now() + timeout;
        let mut state = self.state();
        loop {
            match &state.owner {
                None => {
                    state.owner = Some(me);
                    state.holds = 1;
                    state.locked_at = Some(Instant::now());
                    return Some(LockGuard::new(self.clone()));
                }
                Some(owner) if owner.thread_id() == me.thread_id() => {
                    state.holds += 1;
                    return Some(LockGuard::new(self.clone()));
                }
                Some(_) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return None;
                    }
                    state = self
                        .released
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(|e| e.into_inner())
                        .0;
                }
            }
        }
    }

    fn release(&self) {
        let mut state = self.state();
        state.holds = state.holds.saturating_sub(1);
        if state.holds == 0 {
            state.owner = None;
            state.locked_at = None;
            self.released.notify_all();
        }
    }

    pub fn is_locked(&self) -> bool {
        self.state().owner.is_some()
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        self.state()
            .owner
            .as_ref()
            .is_some_and(|owner| owner.is_current())
    }

    /// Reentrant hold count of the current owner.
    pub fn holds(&self) -> usize {
        self.state().holds
    }

    pub(crate) fn owner(&self) -> Option<Arc<ThreadMarker>> {
        self.state().owner.clone()
    }

    /// `Some(false)` when the owning thread has exited without releasing.
    pub fn owner_alive(&self) -> Option<bool> {
        self.state().owner.as_ref().map(|owner| owner.is_alive())
    }

    pub fn locked_for(&self) -> Option<Duration> {
        self.state().locked_at.map(|at| at.elapsed())
    }

    /// Waits until `owner` no longer holds the lock, either by releasing it or
    /// by exiting. Returns false on timeout.
    pub(crate) fn wait_for_owner_gone(&self, owner: &Arc<ThreadMarker>, timeout: Duration) -> bool {
        const POLL: Duration = Duration::from_millis(10);
        let deadline = Instant::now() + timeout;
        let mut state = self.state();
        loop {
            let still_held = state
                .owner
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, owner));
            if !still_held || !owner.is_alive() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            // Polls so that a thread exit, which is not signalled here, is noticed.
            state = self
                .released
                .wait_timeout(state, remaining.min(POLL))
                .unwrap_or_else(|e| e.into_inner())
                .0;
        }
    }
}

/// Releases one hold on drop. Not `Send`: only the owning thread may release.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    lock: Arc<KeyedLock>,
    _not_send: PhantomData<*const ()>,
}

impl LockGuard {
    fn new(lock: Arc<KeyedLock>) -> Self {
        Self {
            lock,
            _not_send: PhantomData,
        }
    }

    pub fn lock(&self) -> &Arc<KeyedLock> {
        &self.lock
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.lock.release();
    }
}

impl std::fmt::Debug for KeyedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("KeyedLock")
            .field("owner", &state.owner.as_ref().map(|owner| owner.to_string()))
            .field("holds", &state.holds)
            .finish()
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("holds", &self.lock.holds())
            .finish()
    }
}
