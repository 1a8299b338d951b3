//! Type aliases for commonly used shared types.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use armdraw_core::types::*;
//!
//! // Instead of: Arc<Mutex<SequencerState>>
//! let state: ThreadSafe<SequencerState> = thread_safe(SequencerState::Idle);
//! ```

use parking_lot::Mutex;
use std::sync::Arc;

/// A thread-safe, mutex-protected wrapper for cross-thread sharing.
///
/// Uses `parking_lot::Mutex` for better performance than `std::sync::Mutex`.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// Wrap a value in [`ThreadSafe`]
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}
