//! Collection adapters over the sequential ring core.
//!
//! Thin wrappers that give the ring familiar container vocabularies: FIFO
//! [`Queue`], LIFO [`Stack`], and double-ended [`Deque`]. All of them are
//! pure index arithmetic over [`crate::SeqRing`]; none add synchronization.
//! Wrap the storage in a [`crate::GuardedRing`] instead when the container
//! must be shared between threads.

pub mod deque;
pub mod queue;
pub mod stack;

pub use deque::Deque;
pub use queue::Queue;
pub use stack::Stack;
