//! Shim module to abstract over std and loom synchronization primitives.
//!
//! Production builds use `std::sync::atomic` directly. Under the `loom`
//! feature the same paths resolve to loom's model-checked replacements, so the
//! lock-free engine can be exhaustively explored by the tests in
//! `tests/loom_lockfree.rs` without touching production code.

#[cfg(not(feature = "loom"))]
pub(crate) mod atomic {
    pub use std::sync::atomic::*;
}

#[cfg(feature = "loom")]
pub(crate) mod atomic {
    pub use loom::sync::atomic::*;
}

#[cfg(not(feature = "loom"))]
pub(crate) mod thread {
    pub use std::thread::yield_now;
}

#[cfg(feature = "loom")]
pub(crate) mod thread {
    pub use loom::thread::yield_now;
}
