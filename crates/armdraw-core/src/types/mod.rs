//! Type aliases for shared state.
//!
//! ## Modules
//!
//! - [`aliases`]: Type aliases for `Arc<Mutex<T>>` and friends.

pub mod aliases;

pub use aliases::*;
