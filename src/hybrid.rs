//! Hybrid ring buffer: atomic fast path, mutex-guarded slow path.
//!
//! Insert and retrieve go through the same CAS reservation protocol as
//! [`LockFreeRing`] and never take a lock. Composite operations that must see
//! a consistent snapshot of the non-atomic descriptor fields (flush today, a
//! resize would belong here too) serialize against each other behind a
//! mutex.
//!
//! The lock only protects the slow path's internal consistency, not against
//! fast-path writers: flushing while producers or consumers are active is
//! unsafe in exactly the way [`LockFreeRing::flush`] is, and remains a
//! quiescence contract on the caller.

use parking_lot::Mutex;

use crate::lockfree::{LockFreeRing, Timeout};
use crate::policy::OrderPolicy;
use crate::store::{InitError, SlotCell};
use crate::trace::debug;

/// Ring buffer with a lock-free fast path and a locked slow path.
///
/// # Example
///
/// ```
/// use slotring::{HybridRing, OrderPolicy, SlotArray};
///
/// let mut storage = SlotArray::<u32, 8>::new();
/// let ring = HybridRing::new(&mut storage, OrderPolicy::default())?;
///
/// ring.insert(1).unwrap();
/// ring.insert(2).unwrap();
/// ring.flush(); // drops both elements under the slow-path lock
/// assert!(ring.is_empty());
/// # Ok::<(), slotring::InitError>(())
/// ```
pub struct HybridRing<'a, T> {
    fast: LockFreeRing<'a, T>,
    /// Serializes composite operations against each other.
    slow: Mutex<()>,
}

impl<'a, T> HybridRing<'a, T> {
    /// Wires a hybrid ring to caller-owned storage.
    ///
    /// # Errors
    ///
    /// [`InitError::ZeroCapacity`] if the storage holds no slots. Lock
    /// creation itself cannot fail.
    pub fn new(storage: &'a mut [SlotCell<T>], policy: OrderPolicy) -> Result<Self, InitError> {
        Ok(Self {
            fast: LockFreeRing::new(storage, policy)?,
            slow: Mutex::new(()),
        })
    }

    /// The memory-ordering policy of the fast path.
    #[must_use]
    pub fn policy(&self) -> OrderPolicy {
        self.fast.policy()
    }

    /// Capacity in elements.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.fast.capacity()
    }

    /// Capacity estimate of live elements (see [`LockFreeRing::len`]).
    #[must_use]
    pub fn len(&self) -> usize {
        self.fast.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fast.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.fast.is_full()
    }

    /// True iff inserting `n` more elements would not fit.
    #[must_use]
    pub fn will_full(&self, n: usize) -> bool {
        self.fast.will_full(n)
    }

    /// Fast path: lock-free insert (see [`LockFreeRing::insert`]).
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` if the buffer is full.
    pub fn insert(&self, item: T) -> Result<(), T> {
        self.fast.insert(item)
    }

    /// Fast path: lock-free retrieve (see [`LockFreeRing::retrieve`]).
    #[must_use]
    pub fn retrieve(&self) -> Option<T> {
        self.fast.retrieve()
    }

    /// Fast path: advisory peek (see [`LockFreeRing::peek`]).
    #[must_use]
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.fast.peek()
    }

    /// Fast path: bounded-retry insert (see [`LockFreeRing::try_insert`]).
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` when full or out of retries.
    pub fn try_insert(&self, item: T, max_retries: usize) -> Result<(), T> {
        self.fast.try_insert(item, max_retries)
    }

    /// Fast path: bounded-retry retrieve (see
    /// [`LockFreeRing::try_retrieve`]).
    #[must_use]
    pub fn try_retrieve(&self, max_retries: usize) -> Option<T> {
        self.fast.try_retrieve(max_retries)
    }

    /// Fast path: deadline-bounded insert (see
    /// [`LockFreeRing::insert_blocking`]).
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` on timeout.
    pub fn insert_blocking(&self, item: T, timeout: Timeout) -> Result<(), T> {
        self.fast.insert_blocking(item, timeout)
    }

    /// Fast path: deadline-bounded retrieve (see
    /// [`LockFreeRing::retrieve_blocking`]).
    #[must_use]
    pub fn retrieve_blocking(&self, timeout: Timeout) -> Option<T> {
        self.fast.retrieve_blocking(timeout)
    }

    /// Slow path: drops every live element and resets the indices, holding
    /// the composite-operation lock throughout.
    ///
    /// The lock keeps concurrent slow-path calls (another flush) from
    /// interleaving; it does not stop fast-path producers or consumers.
    /// Callers must quiesce those before flushing, exactly as for
    /// [`LockFreeRing::flush`].
    pub fn flush(&self) {
        let _guard = self.slow.lock();
        // SAFETY: quiescence of the fast path is the documented caller
        // contract for flush; the guard serializes slow-path peers.
        unsafe { self.fast.drain_in_place() };
        debug!("hybrid ring flushed");
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use crate::store::{SlotArray, SlotVec};
    use std::sync::Arc;

    #[test]
    fn test_fast_path_round_trip() {
        let mut storage = SlotArray::<u64, 8>::new();
        let ring = HybridRing::new(&mut storage, OrderPolicy::default()).unwrap();

        for i in 1..=5 {
            ring.insert(i).unwrap();
        }
        assert_eq!(ring.peek(), Some(1));
        for i in 1..=5 {
            assert_eq!(ring.retrieve(), Some(i));
        }
        assert_eq!(ring.retrieve(), None);
    }

    #[test]
    fn test_flush_drops_live_elements() {
        let counter = Arc::new(());
        let mut storage = SlotVec::<Arc<()>>::with_capacity(4);
        let ring = HybridRing::new(&mut storage, OrderPolicy::default()).unwrap();

        for _ in 0..3 {
            ring.insert(Arc::clone(&counter)).unwrap();
        }
        assert_eq!(Arc::strong_count(&counter), 4);

        ring.flush();
        assert_eq!(Arc::strong_count(&counter), 1);
        assert!(ring.is_empty());

        // Reusable after flush.
        ring.insert(Arc::clone(&counter)).unwrap();
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_fast_path_conservation_across_threads() {
        let mut storage = SlotVec::<u64>::with_capacity(32);
        let ring = HybridRing::new(&mut storage, OrderPolicy::default()).unwrap();
        let count = 2000u64;

        std::thread::scope(|s| {
            let ring = &ring;
            s.spawn(move || {
                for i in 0..count {
                    let mut item = i;
                    while let Err(back) = ring.insert(item) {
                        item = back;
                        std::hint::spin_loop();
                    }
                }
            });
            let received = s
                .spawn(move || {
                    let mut received = 0u64;
                    while received < count {
                        if ring.retrieve().is_some() {
                            received += 1;
                        } else {
                            std::hint::spin_loop();
                        }
                    }
                    received
                })
                .join()
                .unwrap();
            assert_eq!(received, count);
        });

        assert!(ring.is_empty());
    }

    #[test]
    fn test_bounded_and_blocking_variants_delegate() {
        let mut storage = SlotArray::<u64, 2>::new();
        let ring = HybridRing::new(&mut storage, OrderPolicy::SeqCst).unwrap();

        assert_eq!(ring.try_insert(1, 4), Ok(()));
        assert_eq!(ring.try_insert(2, 4), Ok(()));
        assert_eq!(ring.try_insert(3, 4), Err(3));
        assert_eq!(ring.try_retrieve(4), Some(1));
        assert_eq!(
            ring.retrieve_blocking(Timeout::from(std::time::Duration::ZERO)),
            Some(2)
        );
        assert!(ring.is_empty());
    }
}
