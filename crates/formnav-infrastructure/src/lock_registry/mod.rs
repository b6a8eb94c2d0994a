//! Per-session locking across requests.
//!
//! # Module Structure
//!
//! - `registry`: Bucketed lock table with eviction (`LockRegistry`)
//! - `lock`: Reentrant owner-tracking lock (`KeyedLock`, `LockGuard`)
//! - `interruption`: Thread liveness markers and cooperative interruption

pub mod interruption;
mod lock;
mod registry;

pub use lock::{KeyedLock, LockGuard};
pub use registry::{LockRegistry, LockSnapshot};
