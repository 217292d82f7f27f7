//! Single-threaded ring buffer core.
//!
//! `SeqRing` does the head/tail/count bookkeeping every other variant builds
//! on: FIFO insert/retrieve, an overwriting insert that evicts the oldest
//! element, and the double-ended operations backing the deque and stack
//! adapters. `count` is tracked explicitly so `head == tail` never has to
//! disambiguate empty from full.
//!
//! All operations take `&mut self`; the concurrent wrappers in
//! [`crate::guarded`] decide how that exclusivity is enforced.

use crate::store::{InitError, RingStore, SlotCell};
use crate::trace::debug;

/// Fixed-capacity single-threaded ring buffer over caller-owned storage.
///
/// # Example
///
/// ```
/// use slotring::{SeqRing, SlotArray};
///
/// let mut storage = SlotArray::<u32, 4>::new();
/// let mut ring = SeqRing::new(&mut storage)?;
///
/// ring.insert(1).unwrap();
/// ring.insert(2).unwrap();
/// assert_eq!(ring.retrieve(), Some(1));
/// assert_eq!(ring.retrieve(), Some(2));
/// assert_eq!(ring.retrieve(), None);
/// # Ok::<(), slotring::InitError>(())
/// ```
pub struct SeqRing<'a, T> {
    store: RingStore<'a, T>,
    head: usize,
    tail: usize,
    count: usize,
}

impl<'a, T> SeqRing<'a, T> {
    /// Wires a ring to caller-owned storage.
    ///
    /// The storage outlives the ring and is never freed by it; the exclusive
    /// borrow keeps any second ring off the same slots.
    ///
    /// # Errors
    ///
    /// [`InitError::ZeroCapacity`] if the storage holds no slots.
    pub fn new(storage: &'a mut [SlotCell<T>]) -> Result<Self, InitError> {
        let store = RingStore::new(storage)?;
        debug!(capacity = store.capacity(), "sequential ring ready");
        Ok(Self {
            store,
            head: 0,
            tail: 0,
            count: 0,
        })
    }

    /// Capacity in elements.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Number of live elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.count == self.store.capacity()
    }

    /// True iff inserting `n` more elements would not fit.
    #[inline]
    #[must_use]
    pub const fn will_full(&self, n: usize) -> bool {
        self.count + n > self.store.capacity()
    }

    /// Advances an index to the next slot, wrapping to 0 at capacity.
    ///
    /// Equivalent to `(i + 1) % capacity` without the division.
    #[inline]
    const fn bump(&self, i: usize) -> usize {
        let next = i + 1;
        if next == self.store.capacity() { 0 } else { next }
    }

    /// Steps an index back one slot, wrapping to `capacity - 1` at 0.
    #[inline]
    const fn bump_back(&self, i: usize) -> usize {
        if i == 0 { self.store.capacity() - 1 } else { i - 1 }
    }

    /// Appends an element at the tail.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` if the ring is full, handing the element back.
    pub fn insert(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        // SAFETY: count < capacity, so the slot at tail is vacant and this
        // ring holds the only claim on it.
        unsafe { self.store.write(self.tail, item) };
        self.tail = self.bump(self.tail);
        self.count += 1;
        Ok(())
    }

    /// Appends an element at the tail, evicting the oldest element when full.
    ///
    /// Never fails. Returns the evicted element, whose release obligation
    /// transfers back to the caller; dropping it is the common case.
    pub fn insert_overwrite(&mut self, item: T) -> Option<T> {
        if self.is_full() {
            // Full means head == tail: move the oldest element out before its
            // slot is reused for the incoming one.
            // SAFETY: count == capacity, so the slot at head is initialized.
            let evicted = unsafe { self.store.read(self.head) };
            self.head = self.bump(self.head);
            // SAFETY: the slot at tail was vacated by the read above.
            unsafe { self.store.write(self.tail, item) };
            self.tail = self.bump(self.tail);
            Some(evicted)
        } else {
            // SAFETY: count < capacity, so the slot at tail is vacant.
            unsafe { self.store.write(self.tail, item) };
            self.tail = self.bump(self.tail);
            self.count += 1;
            None
        }
    }

    /// Removes and returns the oldest element, or `None` when empty.
    #[must_use]
    pub fn retrieve(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: count > 0, so the slot at head holds a live element.
        let item = unsafe { self.store.read(self.head) };
        self.head = self.bump(self.head);
        self.count -= 1;
        Some(item)
    }

    /// Borrows the oldest element without removing it.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: count > 0, so the slot at head holds a live element, and
        // the &self borrow blocks mutation for the borrow's duration.
        Some(unsafe { self.store.peek(self.head) })
    }

    /// Prepends an element at the head.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` if the ring is full.
    pub fn insert_front(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.head = self.bump_back(self.head);
        // SAFETY: count < capacity, so the slot one step before head is
        // vacant.
        unsafe { self.store.write(self.head, item) };
        self.count += 1;
        Ok(())
    }

    /// Removes and returns the newest element, or `None` when empty.
    #[must_use]
    pub fn retrieve_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.tail = self.bump_back(self.tail);
        self.count -= 1;
        // SAFETY: count was > 0, so the slot one step before tail holds the
        // newest live element.
        Some(unsafe { self.store.read(self.tail) })
    }

    /// Borrows the newest element without removing it.
    #[must_use]
    pub fn peek_back(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        let back = self.bump_back(self.tail);
        // SAFETY: count > 0, so the slot one step before tail is live.
        Some(unsafe { self.store.peek(back) })
    }

    /// Drops every live element and resets head, tail and count to zero.
    pub fn flush(&mut self) {
        let mut idx = self.head;
        for _ in 0..self.count {
            // SAFETY: walking exactly count slots from head visits each live
            // element once.
            unsafe { self.store.drop_in_place(idx) };
            idx = self.bump(idx);
        }
        debug!(dropped = self.count, "sequential ring flushed");
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }
}

impl<T> Drop for SeqRing<'_, T> {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SlotArray, SlotVec};
    use std::rc::Rc;

    #[test]
    fn test_fifo_order() {
        let mut storage = SlotArray::<u32, 8>::new();
        let mut ring = SeqRing::new(&mut storage).unwrap();

        for i in 1..=5 {
            ring.insert(i).unwrap();
        }
        for i in 1..=5 {
            assert_eq!(ring.retrieve(), Some(i));
        }
        assert_eq!(ring.retrieve(), None);
    }

    #[test]
    fn test_full_returns_item() {
        let mut storage = SlotArray::<u32, 2>::new();
        let mut ring = SeqRing::new(&mut storage).unwrap();

        ring.insert(1).unwrap();
        ring.insert(2).unwrap();
        assert_eq!(ring.insert(3), Err(3));

        assert_eq!(ring.retrieve(), Some(1));
        ring.insert(3).unwrap();
        assert_eq!(ring.insert(4), Err(4));
    }

    #[test]
    fn test_count_invariant_over_mixed_operations() {
        let mut storage = SlotArray::<u32, 4>::new();
        let mut ring = SeqRing::new(&mut storage).unwrap();

        let mut expected = 0usize;
        for round in 0..20u32 {
            if ring.insert(round).is_ok() {
                expected += 1;
            }
            assert!(ring.len() <= ring.capacity());
            if round % 3 == 0 && ring.retrieve().is_some() {
                expected -= 1;
            }
            assert_eq!(ring.len(), expected);
        }
    }

    #[test]
    fn test_overwrite_evicts_oldest() {
        let mut storage = SlotArray::<u32, 5>::new();
        let mut ring = SeqRing::new(&mut storage).unwrap();

        for i in 1..=5 {
            assert_eq!(ring.insert_overwrite(i), None);
        }
        // Sixth insert evicts the oldest element.
        assert_eq!(ring.insert_overwrite(6), Some(1));
        assert_eq!(ring.len(), 5);

        for i in 2..=6 {
            assert_eq!(ring.retrieve(), Some(i));
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_peek_does_not_mutate() {
        let mut storage = SlotArray::<u32, 4>::new();
        let mut ring = SeqRing::new(&mut storage).unwrap();

        assert_eq!(ring.peek(), None);

        ring.insert(42).unwrap();
        ring.insert(43).unwrap();
        let before = ring.len();
        assert_eq!(ring.peek(), Some(&42));
        assert_eq!(ring.len(), before);
        assert_eq!(ring.retrieve(), Some(42));
    }

    #[test]
    fn test_will_full_threshold() {
        let mut storage = SlotArray::<u32, 5>::new();
        let mut ring = SeqRing::new(&mut storage).unwrap();

        for i in 0..3 {
            ring.insert(i).unwrap();
        }
        assert!(ring.will_full(3));
        assert!(!ring.will_full(2));
    }

    #[test]
    fn test_double_ended_operations() {
        let mut storage = SlotArray::<u32, 4>::new();
        let mut ring = SeqRing::new(&mut storage).unwrap();

        ring.insert(2).unwrap();
        ring.insert_front(1).unwrap();
        ring.insert(3).unwrap();

        assert_eq!(ring.peek(), Some(&1));
        assert_eq!(ring.peek_back(), Some(&3));
        assert_eq!(ring.retrieve_back(), Some(3));
        assert_eq!(ring.retrieve(), Some(1));
        assert_eq!(ring.retrieve(), Some(2));
        assert!(ring.is_empty());
    }

    #[test]
    fn test_insert_front_wraps_and_fills() {
        let mut storage = SlotArray::<u32, 3>::new();
        let mut ring = SeqRing::new(&mut storage).unwrap();

        ring.insert_front(3).unwrap();
        ring.insert_front(2).unwrap();
        ring.insert_front(1).unwrap();
        assert_eq!(ring.insert_front(0), Err(0));

        for i in 1..=3 {
            assert_eq!(ring.retrieve(), Some(i));
        }
    }

    #[test]
    fn test_wrapping_reuse() {
        let mut storage = SlotArray::<u32, 4>::new();
        let mut ring = SeqRing::new(&mut storage).unwrap();

        for round in 0..5 {
            for i in 0..4 {
                ring.insert(round * 10 + i).unwrap();
            }
            for i in 0..4 {
                assert_eq!(ring.retrieve(), Some(round * 10 + i));
            }
            assert!(ring.is_empty());
        }
    }

    #[test]
    fn test_heap_payload_round_trip() {
        let mut storage = SlotVec::<String>::with_capacity(3);
        let mut ring = SeqRing::new(&mut storage).unwrap();

        ring.insert("alpha".to_string()).unwrap();
        ring.insert("beta".to_string()).unwrap();
        assert_eq!(ring.retrieve().as_deref(), Some("alpha"));
        assert_eq!(ring.retrieve().as_deref(), Some("beta"));
    }

    #[test]
    fn test_flush_drops_each_live_element_once() {
        let counter = Rc::new(());
        let mut storage = SlotVec::<Rc<()>>::with_capacity(4);
        let mut ring = SeqRing::new(&mut storage).unwrap();

        for _ in 0..3 {
            ring.insert(Rc::clone(&counter)).unwrap();
        }
        // One element has already been moved back out.
        drop(ring.retrieve());
        assert_eq!(Rc::strong_count(&counter), 3);

        ring.flush();
        assert_eq!(Rc::strong_count(&counter), 1);
        assert!(ring.is_empty());
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn test_drop_releases_live_elements() {
        let counter = Rc::new(());
        let mut storage = SlotVec::<Rc<()>>::with_capacity(4);
        {
            let mut ring = SeqRing::new(&mut storage).unwrap();
            for _ in 0..4 {
                ring.insert(Rc::clone(&counter)).unwrap();
            }
            assert_eq!(Rc::strong_count(&counter), 5);
        }
        assert_eq!(Rc::strong_count(&counter), 1);
    }

    #[test]
    fn test_overwrite_after_wrap_keeps_order() {
        let mut storage = SlotArray::<u32, 3>::new();
        let mut ring = SeqRing::new(&mut storage).unwrap();

        // Shift head off zero first.
        ring.insert(0).unwrap();
        assert_eq!(ring.retrieve(), Some(0));

        for i in 1..=3 {
            assert_eq!(ring.insert_overwrite(i), None);
        }
        assert_eq!(ring.insert_overwrite(4), Some(1));
        assert_eq!(ring.insert_overwrite(5), Some(2));

        assert_eq!(ring.retrieve(), Some(3));
        assert_eq!(ring.retrieve(), Some(4));
        assert_eq!(ring.retrieve(), Some(5));
    }
}
