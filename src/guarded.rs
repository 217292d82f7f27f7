//! Mutual-exclusion ring buffer.
//!
//! `GuardedRing` shares one [`SeqRing`] between threads behind a
//! [`parking_lot::Mutex`]. Every operation holds the lock for its full
//! critical section (admission check plus element copy), so no intermediate
//! state is ever observable and the failure semantics are exactly the
//! sequential core's.
//!
//! Single-threaded deployments that share the same binary can skip the lock
//! entirely via [`GuardedRing::new_unsynchronized`]; same layout, no
//! lock/unlock on any path.

use parking_lot::Mutex;

use crate::seq::SeqRing;
use crate::store::{InitError, SlotCell};
use crate::trace::debug;

/// Lock-guarded ring buffer over caller-owned storage.
///
/// # Example
///
/// ```
/// use slotring::{GuardedRing, SlotArray};
///
/// let mut storage = SlotArray::<u64, 8>::new();
/// let ring = GuardedRing::new(&mut storage)?;
///
/// std::thread::scope(|s| {
///     s.spawn(|| {
///         while ring.insert(7).is_err() {
///             std::hint::spin_loop();
///         }
///     });
///     s.spawn(|| {
///         loop {
///             if let Some(v) = ring.retrieve() {
///                 assert_eq!(v, 7);
///                 break;
///             }
///             std::hint::spin_loop();
///         }
///     });
/// });
/// # Ok::<(), slotring::InitError>(())
/// ```
pub struct GuardedRing<'a, T> {
    inner: Mutex<SeqRing<'a, T>>,
    locking: bool,
}

impl<'a, T> GuardedRing<'a, T> {
    /// Wires a lock-guarded ring to caller-owned storage.
    ///
    /// # Errors
    ///
    /// [`InitError::ZeroCapacity`] if the storage holds no slots. Lock
    /// creation itself cannot fail.
    pub fn new(storage: &'a mut [SlotCell<T>]) -> Result<Self, InitError> {
        Ok(Self {
            inner: Mutex::new(SeqRing::new(storage)?),
            locking: true,
        })
    }

    /// Wires a ring that skips the lock on every operation.
    ///
    /// Intended for single-threaded deployments that want the guarded API
    /// without paying for atomics in the lock word.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that all operations on this ring are
    /// externally serialized: no two threads may call into it concurrently.
    ///
    /// # Errors
    ///
    /// [`InitError::ZeroCapacity`] if the storage holds no slots.
    pub unsafe fn new_unsynchronized(storage: &'a mut [SlotCell<T>]) -> Result<Self, InitError> {
        Ok(Self {
            inner: Mutex::new(SeqRing::new(storage)?),
            locking: false,
        })
    }

    /// Runs `f` inside this ring's critical section.
    fn with<R>(&self, f: impl FnOnce(&mut SeqRing<'a, T>) -> R) -> R {
        if self.locking {
            f(&mut self.inner.lock())
        } else {
            // SAFETY: the new_unsynchronized contract makes this the only
            // thread inside the ring, so bypassing the lock cannot alias.
            f(unsafe { &mut *self.inner.data_ptr() })
        }
    }

    /// Capacity in elements.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.with(|ring| ring.capacity())
    }

    /// Number of live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.with(|ring| ring.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.with(|ring| ring.is_empty())
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.with(|ring| ring.is_full())
    }

    /// True iff inserting `n` more elements would not fit.
    #[must_use]
    pub fn will_full(&self, n: usize) -> bool {
        self.with(|ring| ring.will_full(n))
    }

    /// Appends an element at the tail.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` if the ring is full, handing the element back.
    pub fn insert(&self, item: T) -> Result<(), T> {
        self.with(|ring| ring.insert(item))
    }

    /// Appends an element at the tail, evicting the oldest element when full.
    ///
    /// Never fails; the evicted element (if any) is returned to the caller.
    pub fn insert_overwrite(&self, item: T) -> Option<T> {
        self.with(|ring| ring.insert_overwrite(item))
    }

    /// Removes and returns the oldest element, or `None` when empty.
    #[must_use]
    pub fn retrieve(&self) -> Option<T> {
        self.with(|ring| ring.retrieve())
    }

    /// Copies the oldest element without removing it.
    ///
    /// Clones under the lock; a reference cannot outlive the critical
    /// section.
    #[must_use]
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.with(|ring| ring.peek().cloned())
    }

    /// Drops every live element and resets the ring, all inside one critical
    /// section.
    pub fn flush(&self) {
        self.with(|ring| ring.flush());
        debug!("guarded ring flushed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SlotArray;

    #[test]
    fn test_basic_fifo() {
        let mut storage = SlotArray::<u32, 8>::new();
        let ring = GuardedRing::new(&mut storage).unwrap();

        for i in 1..=5 {
            ring.insert(i).unwrap();
        }
        for i in 1..=5 {
            assert_eq!(ring.retrieve(), Some(i));
        }
        assert_eq!(ring.retrieve(), None);
    }

    #[test]
    fn test_failure_semantics_match_sequential_core() {
        let mut storage = SlotArray::<u32, 2>::new();
        let ring = GuardedRing::new(&mut storage).unwrap();

        ring.insert(1).unwrap();
        ring.insert(2).unwrap();
        assert_eq!(ring.insert(3), Err(3));
        assert!(ring.is_full());
        assert!(ring.will_full(1));

        assert_eq!(ring.insert_overwrite(3), Some(1));
        assert_eq!(ring.retrieve(), Some(2));
        assert_eq!(ring.retrieve(), Some(3));
        assert!(ring.is_empty());
    }

    #[test]
    fn test_peek_copies_without_mutation() {
        let mut storage = SlotArray::<String, 4>::new();
        let ring = GuardedRing::new(&mut storage).unwrap();

        ring.insert("front".to_string()).unwrap();
        let before = ring.len();
        assert_eq!(ring.peek().as_deref(), Some("front"));
        assert_eq!(ring.len(), before);
    }

    #[test]
    fn test_unsynchronized_mode_single_thread() {
        let mut storage = SlotArray::<u32, 4>::new();
        // SAFETY: the ring never leaves this thread.
        let ring = unsafe { GuardedRing::new_unsynchronized(&mut storage) }.unwrap();

        ring.insert(1).unwrap();
        ring.insert(2).unwrap();
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.retrieve(), Some(1));
        ring.flush();
        assert!(ring.is_empty());
    }

    #[test]
    fn test_concurrent_producers_conserve_count() {
        let mut storage = SlotArray::<u64, 64>::new();
        let ring = GuardedRing::new(&mut storage).unwrap();
        let per_thread = 500u64;

        std::thread::scope(|s| {
            for t in 0..4 {
                let ring = &ring;
                s.spawn(move || {
                    for i in 0..per_thread {
                        let mut item = t * 1000 + i;
                        loop {
                            match ring.insert(item) {
                                Ok(()) => break,
                                Err(back) => {
                                    item = back;
                                    std::hint::spin_loop();
                                }
                            }
                        }
                    }
                });
            }
            let ring = &ring;
            let drained = s
                .spawn(move || {
                    let mut drained = 0u64;
                    while drained < 4 * per_thread {
                        if ring.retrieve().is_some() {
                            drained += 1;
                        } else {
                            std::thread::yield_now();
                        }
                    }
                    drained
                })
                .join()
                .unwrap();
            assert_eq!(drained, 4 * per_thread);
        });

        assert!(ring.is_empty());
    }
}
