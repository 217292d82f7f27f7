//! # Fixed-capacity ring buffers under selectable concurrency disciplines
//!
//! `slotring` is a caller-owned circular buffer usable as the storage
//! substrate for queues, stacks and deques. The caller allocates the slot
//! storage ([`SlotArray`] inline or [`SlotVec`] on the heap) and wires one of
//! four ring variants to it; the storage is never freed by the ring.
//!
//! # Overview
//!
//! - [`SeqRing`] - single-threaded core: head/tail/count bookkeeping,
//!   overwriting insert, double-ended operations
//! - [`GuardedRing`] - the sequential core behind a mutex, with an opt-out
//!   for single-threaded deployments sharing the same binary
//! - [`LockFreeRing`] - atomic indices with CAS slot reservation, a runtime
//!   [`OrderPolicy`], bounded-retry and deadline-bounded variants
//! - [`HybridRing`] - the lock-free fast path plus a mutex-guarded slow path
//!   for composite operations like flush
//! - [`adapters`] - FIFO queue, LIFO stack and deque vocabularies over the
//!   sequential core
//!
//! # Example
//!
//! ```
//! use slotring::{LockFreeRing, OrderPolicy, SlotArray};
//!
//! let mut storage = SlotArray::<u64, 16>::new();
//! let ring = LockFreeRing::new(&mut storage, OrderPolicy::default())?;
//!
//! ring.insert(1).unwrap();
//! ring.insert(2).unwrap();
//! assert_eq!(ring.retrieve(), Some(1));
//! assert_eq!(ring.retrieve(), Some(2));
//! assert_eq!(ring.retrieve(), None);
//! # Ok::<(), slotring::InitError>(())
//! ```
//!
//! # Choosing a variant
//!
//! One producer and one consumer get FIFO ordering from every variant. With
//! multiple producers, the relative order of their elements is whichever
//! thread's CAS lands first; each successful claim owns a distinct slot.
//! The lock-free admission check is an estimate, not a transaction; see the
//! [`LockFreeRing`] docs for the bounded-staleness caveat. `flush` on the
//! atomic variants requires external quiescence.
//!
//! # Feature flags
//!
//! - `tracing` - structured logging of construction, flushes and retry
//!   exhaustion via the `tracing` crate
//! - `loom` - swaps `std::sync::atomic` for loom's model-checked atomics;
//!   used by `tests/loom_lockfree.rs`

pub mod adapters;
mod backoff;
mod guarded;
mod hybrid;
mod lockfree;
mod policy;
mod seq;
mod shim;
mod store;
pub mod trace;

pub use guarded::GuardedRing;
pub use hybrid::HybridRing;
pub use lockfree::{LockFreeRing, Timeout};
pub use policy::OrderPolicy;
pub use seq::SeqRing;
pub use store::{InitError, SlotArray, SlotCell, SlotVec};
