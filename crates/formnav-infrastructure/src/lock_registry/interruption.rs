//! Cooperative interruption and liveness of lock owners.
//!
//! Every thread that touches the registry gets a [`ThreadMarker`] in a
//! thread-local slot. The slot's destructor runs when the thread exits and
//! marks the thread dead, which is how a lock left behind by a finished thread
//! is recognised. Interruption is a flag on the marker: the registry sets it,
//! long-running work is expected to poll [`is_interrupted`] or
//! [`check_interrupted`] and bail out.

use formnav_core::error::{NavigationError, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// Liveness and interrupt state of one thread.
pub struct ThreadMarker {
    thread_id: ThreadId,
    name: String,
    interrupted: AtomicBool,
    alive: Mutex<bool>,
    exited: Condvar,
}

impl ThreadMarker {
    fn for_current_thread() -> Self {
        let current = thread::current();
        Self {
            thread_id: current.id(),
            name: current.name().unwrap_or("unnamed").to_string(),
            interrupted: AtomicBool::new(false),
            alive: Mutex::new(true),
            exited: Condvar::new(),
        }
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    pub fn is_current(&self) -> bool {
        self.thread_id == thread::current().id()
    }

    pub fn is_alive(&self) -> bool {
        *self.alive.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    /// Blocks until the thread exits or `timeout` passes. Returns true if it exited.
    pub fn wait_for_exit(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut alive = self.alive.lock().unwrap_or_else(|e| e.into_inner());
        while *alive {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            alive = self
                .exited
                .wait_timeout(alive, remaining)
                .unwrap_or_else(|e| e.into_inner())
                .0;
        }
        true
    }

    fn mark_exited(&self) {
        let mut alive = self.alive.lock().unwrap_or_else(|e| e.into_inner());
        *alive = false;
        self.exited.notify_all();
    }
}

impl fmt::Display for ThreadMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.name, self.thread_id)
    }
}

impl fmt::Debug for ThreadMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadMarker")
            .field("thread", &self.thread_id)
            .field("name", &self.name)
            .field("alive", &self.is_alive())
            .field("interrupted", &self.interrupted.load(Ordering::SeqCst))
            .finish()
    }
}

struct ThreadPresence {
    marker: Arc<ThreadMarker>,
}

impl Drop for ThreadPresence {
    fn drop(&mut self) {
        self.marker.mark_exited();
    }
}

thread_local! {
    static PRESENCE: ThreadPresence = ThreadPresence {
        marker: Arc::new(ThreadMarker::for_current_thread()),
    };
}

/// Marker of the calling thread.
pub(crate) fn current_marker() -> Arc<ThreadMarker> {
    PRESENCE.with(|presence| presence.marker.clone())
}

/// True if the lock registry asked the calling thread to stop.
pub fn is_interrupted() -> bool {
    PRESENCE
        .try_with(|presence| presence.marker.interrupted.load(Ordering::SeqCst))
        .unwrap_or(false)
}

/// Fails with [`NavigationError::Interrupted`] if the calling thread was
/// interrupted, clearing the flag.
pub fn check_interrupted() -> Result<()> {
    if clear_interrupted() {
        return Err(NavigationError::Interrupted);
    }
    Ok(())
}

/// Clears the calling thread's interrupt flag, returning its previous value.
pub fn clear_interrupted() -> bool {
    PRESENCE
        .try_with(|presence| presence.marker.interrupted.swap(false, Ordering::SeqCst))
        .unwrap_or(false)
}
