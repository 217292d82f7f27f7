//! Lock-free ring buffer with CAS index reservation.
//!
//! Producers reserve a slot by winning a compare-and-swap on `tail`,
//! consumers by winning one on `head`; a successful CAS grants the calling
//! thread exclusive ownership of the pre-CAS index. `count` is an auxiliary
//! capacity estimate used to admission-control attempts, not a linearization
//! point.
//!
//! Insert keeps the exact check, reserve, copy, publish ordering:
//!
//! 1. Load `count`; reject if the buffer looks full.
//! 2. Load `tail` and compute its successor.
//! 3. CAS `tail`. Failure means another producer won the race; retry.
//! 4. On success, copy the element into the claimed slot, then publish by
//!    incrementing `count`.
//!
//! Retrieve runs the mirror loop over `head` with one difference: the
//! consumer first reserves an element with a guarded decrement on `count`,
//! then claims the head index. Reserving first keeps `count` from
//! underflowing when several consumers race a nearly empty buffer; only
//! reservation holders ever advance `head`.
//!
//! # Admission staleness
//!
//! The producer's admission check (step 1) and reservation CAS (step 3) are
//! not one atomic transaction. With several concurrent producers the `count`
//! snapshot can be stale by the time the CAS lands, transiently admitting
//! more elements than `capacity` before the next reload rejects further
//! inserts; an over-admitted producer claims a slot whose previous element
//! was never retrieved, losing it. `count` conservation (increments minus
//! decrements) still holds, so this is a bounded-staleness property, not a
//! hard capacity guarantee under multi-producer load. Callers that need a
//! hard bound must serialize producers externally.
//!
//! For the same reason, `count` does not say which slots have been written:
//! a consumer racing multiple producers can have the slot at `head` surfaced
//! to it before the claiming producer's copy lands. Treat payloads as plain
//! data when mixing concurrent producers and consumers; ownership-carrying
//! payloads belong behind [`crate::GuardedRing`] or external serialization.
//!
//! # Flush
//!
//! [`LockFreeRing::flush`] resets the indices without coordinating with
//! in-flight CAS loops and without dropping live elements; it requires
//! external quiescence of all producers and consumers. Elements still live
//! at ring drop are released then.

use std::time::Duration;

use minstant::Instant;

use crate::backoff::Backoff;
use crate::policy::OrderPolicy;
use crate::shim::atomic::{AtomicBool, AtomicUsize, Ordering};
use crate::store::{InitError, RingStore, SlotCell};
use crate::trace::{debug, trace};

/// Deadline specification for the blocking operations.
#[derive(Debug, Clone, Copy)]
pub enum Timeout {
    /// Spin indefinitely.
    Infinite,
    /// Spin for at most the specified duration.
    Duration(Duration),
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

/// Lock-free ring buffer over caller-owned storage.
///
/// Shared by reference between any number of producer and consumer threads;
/// no operation blocks, though the plain insert/retrieve spin until they win
/// a reservation or the buffer is full/empty.
///
/// # Example
///
/// ```
/// use slotring::{LockFreeRing, OrderPolicy, SlotArray};
///
/// let mut storage = SlotArray::<u64, 64>::new();
/// let ring = LockFreeRing::new(&mut storage, OrderPolicy::default())?;
///
/// std::thread::scope(|s| {
///     s.spawn(|| {
///         for i in 0..1000u64 {
///             let mut item = i;
///             while let Err(back) = ring.insert(item) {
///                 item = back;
///                 std::hint::spin_loop();
///             }
///         }
///     });
///     s.spawn(|| {
///         let mut next = 0u64;
///         while next < 1000 {
///             if let Some(v) = ring.retrieve() {
///                 assert_eq!(v, next);
///                 next += 1;
///             } else {
///                 std::hint::spin_loop();
///             }
///         }
///     });
/// });
/// # Ok::<(), slotring::InitError>(())
/// ```
pub struct LockFreeRing<'a, T> {
    store: RingStore<'a, T>,
    head: AtomicUsize,
    tail: AtomicUsize,
    count: AtomicUsize,
    /// Set as the last step of construction; consulted by every operation so
    /// a descriptor observed mid-initialization (in-place construction in
    /// static storage, descriptor handed between cores) fails closed instead
    /// of operating on garbage indices.
    initialized: AtomicBool,
    policy: OrderPolicy,
}

impl<'a, T> LockFreeRing<'a, T> {
    /// Wires a lock-free ring to caller-owned storage.
    ///
    /// The `initialized` flag is published last, so no thread can observe a
    /// partially-initialized descriptor.
    ///
    /// # Errors
    ///
    /// [`InitError::ZeroCapacity`] if the storage holds no slots.
    pub fn new(storage: &'a mut [SlotCell<T>], policy: OrderPolicy) -> Result<Self, InitError> {
        let store = RingStore::new(storage)?;
        debug!(capacity = store.capacity(), ?policy, "lock-free ring ready");
        let ring = Self {
            store,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
            initialized: AtomicBool::new(false),
            policy,
        };
        ring.initialized.store(true, Ordering::Release);
        Ok(ring)
    }

    /// The memory-ordering policy this ring was constructed with.
    #[must_use]
    pub fn policy(&self) -> OrderPolicy {
        self.policy
    }

    #[inline]
    fn ready(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Advances an index to the next slot, wrapping to 0 at capacity.
    #[inline]
    fn bump(&self, i: usize) -> usize {
        let next = i + 1;
        if next == self.store.capacity() { 0 } else { next }
    }

    /// Capacity in elements.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Estimate of the number of live elements.
    ///
    /// Zero if the ring is not initialized. Under concurrent producers the
    /// value may transiently exceed `capacity` (see the module docs on
    /// admission staleness).
    #[must_use]
    pub fn len(&self) -> usize {
        if !self.ready() {
            return 0;
        }
        self.count.load(self.policy.load())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the ring looks full. Reports full for an uninitialized
    /// descriptor, failing closed for producers.
    #[must_use]
    pub fn is_full(&self) -> bool {
        if !self.ready() {
            return true;
        }
        self.count.load(self.policy.load()) >= self.store.capacity()
    }

    /// True iff inserting `n` more elements would not fit, going by the
    /// current count estimate.
    #[must_use]
    pub fn will_full(&self, n: usize) -> bool {
        self.len() + n > self.store.capacity()
    }

    /// Appends an element, spinning through reservation races until the
    /// buffer is full.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` if the buffer is full (or the descriptor is not
    /// initialized), handing the element back.
    pub fn insert(&self, item: T) -> Result<(), T> {
        if !self.ready() {
            return Err(item);
        }
        let cap = self.store.capacity();
        loop {
            // Check: admission-control on the count estimate.
            if self.count.load(self.policy.load()) >= cap {
                return Err(item);
            }
            // Reserve: a successful CAS on tail grants exclusive ownership of
            // the pre-CAS index.
            let tail = self.tail.load(self.policy.load());
            let next = self.bump(tail);
            if self
                .tail
                .compare_exchange_weak(
                    tail,
                    next,
                    self.policy.cas_success(),
                    self.policy.cas_failure(),
                )
                .is_ok()
            {
                // Copy: the claimed slot belongs to this thread alone until
                // count is published.
                // SAFETY: the CAS above claimed index `tail` for this thread;
                // tail < capacity by the bump invariant.
                unsafe { self.store.write(tail, item) };
                // Publish.
                self.count.fetch_add(1, self.policy.publish());
                return Ok(());
            }
            // Lost the race on tail; another producer owns that index now.
            std::hint::spin_loop();
        }
    }

    /// Reserves one element via a guarded decrement on `count`.
    ///
    /// Returns false when the buffer is empty. A successful reservation
    /// entitles the caller to exactly one `head` claim.
    #[inline]
    fn reserve_element(&self) -> bool {
        loop {
            let count = self.count.load(self.policy.load());
            if count == 0 {
                return false;
            }
            if self
                .count
                .compare_exchange_weak(
                    count,
                    count - 1,
                    self.policy.cas_success(),
                    self.policy.cas_failure(),
                )
                .is_ok()
            {
                return true;
            }
            std::hint::spin_loop();
        }
    }

    /// Claims the index at `head`, spinning through races with other
    /// reservation holders, and moves the element out of its slot.
    #[inline]
    fn claim_head(&self) -> T {
        loop {
            let head = self.head.load(self.policy.load());
            let next = self.bump(head);
            if self
                .head
                .compare_exchange_weak(
                    head,
                    next,
                    self.policy.cas_success(),
                    self.policy.cas_failure(),
                )
                .is_ok()
            {
                // SAFETY: the CAS claimed index `head` for this thread, and
                // the element reservation taken from count pairs this claim
                // with one published element.
                return unsafe { self.store.read(head) };
            }
            // Another reservation holder advanced head first.
            std::hint::spin_loop();
        }
    }

    /// Removes and returns the oldest element, spinning through reservation
    /// races until the buffer is empty.
    ///
    /// Returns `None` if the buffer is empty or the descriptor is not
    /// initialized.
    #[must_use]
    pub fn retrieve(&self) -> Option<T> {
        if !self.ready() || !self.reserve_element() {
            return None;
        }
        Some(self.claim_head())
    }

    /// Copies the element at `head` without mutating anything.
    ///
    /// Best effort: a concurrent retrieve may advance `head` between the
    /// index load and the copy, so under concurrent consumers the result is
    /// advisory, not linearizable, and may observe a slot the consumer has
    /// already vacated. Callers needing a linearizable peek must serialize
    /// consumers externally.
    #[must_use]
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        if !self.ready() || self.count.load(self.policy.load()) == 0 {
            return None;
        }
        let head = self.head.load(self.policy.load());
        // SAFETY: the non-zero count published after the slot write makes the
        // slot at head initialized; quiescence of consumers is the caller's
        // contract per the advisory-peek documentation above.
        Some(unsafe { self.store.peek(head) }.clone())
    }

    /// [`Self::insert`] capped at `max_retries` reservation attempts, with
    /// exponential backoff between lost races.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` when the buffer is full or the retry budget is
    /// spent; the two causes are indistinguishable to the caller by design.
    pub fn try_insert(&self, item: T, max_retries: usize) -> Result<(), T> {
        if !self.ready() {
            return Err(item);
        }
        let cap = self.store.capacity();
        let mut backoff = Backoff::new();
        for _ in 0..max_retries {
            if self.count.load(self.policy.load()) >= cap {
                return Err(item);
            }
            let tail = self.tail.load(self.policy.load());
            let next = self.bump(tail);
            if self
                .tail
                .compare_exchange_weak(
                    tail,
                    next,
                    self.policy.cas_success(),
                    self.policy.cas_failure(),
                )
                .is_ok()
            {
                // SAFETY: same slot claim as in insert.
                unsafe { self.store.write(tail, item) };
                self.count.fetch_add(1, self.policy.publish());
                return Ok(());
            }
            backoff.spin();
        }
        trace!(max_retries, "insert retry budget exhausted");
        Err(item)
    }

    /// [`Self::retrieve`] capped at `max_retries` reservation attempts, with
    /// exponential backoff between lost races.
    ///
    /// Returns `None` when the buffer is empty or the retry budget is spent.
    #[must_use]
    pub fn try_retrieve(&self, max_retries: usize) -> Option<T> {
        if !self.ready() {
            return None;
        }
        let mut backoff = Backoff::new();
        let mut reserved = false;
        for _ in 0..max_retries {
            if !reserved {
                let count = self.count.load(self.policy.load());
                if count == 0 {
                    return None;
                }
                if self
                    .count
                    .compare_exchange_weak(
                        count,
                        count - 1,
                        self.policy.cas_success(),
                        self.policy.cas_failure(),
                    )
                    .is_err()
                {
                    backoff.spin();
                    continue;
                }
                reserved = true;
            }
            let head = self.head.load(self.policy.load());
            let next = self.bump(head);
            if self
                .head
                .compare_exchange_weak(
                    head,
                    next,
                    self.policy.cas_success(),
                    self.policy.cas_failure(),
                )
                .is_ok()
            {
                // SAFETY: same claim pairing as in retrieve.
                let item = unsafe { self.store.read(head) };
                return Some(item);
            }
            backoff.spin();
        }
        if reserved {
            // Hand the unused element reservation back.
            self.count.fetch_add(1, self.policy.publish());
        }
        trace!(max_retries, "retrieve retry budget exhausted");
        None
    }

    /// Spins on [`Self::insert`] until it succeeds or the deadline passes.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` on timeout.
    pub fn insert_blocking(&self, mut item: T, timeout: Timeout) -> Result<(), T> {
        let deadline = match timeout {
            Timeout::Infinite => None,
            Timeout::Duration(d) => Some(Instant::now() + d),
        };
        loop {
            match self.insert(item) {
                Ok(()) => return Ok(()),
                Err(returned) => {
                    item = returned;
                    if let Some(dl) = deadline
                        && Instant::now() > dl
                    {
                        return Err(item);
                    }
                    std::hint::spin_loop();
                }
            }
        }
    }

    /// Spins on [`Self::retrieve`] until an element arrives or the deadline
    /// passes.
    ///
    /// Returns `None` on timeout.
    #[must_use]
    pub fn retrieve_blocking(&self, timeout: Timeout) -> Option<T> {
        let deadline = match timeout {
            Timeout::Infinite => None,
            Timeout::Duration(d) => Some(Instant::now() + d),
        };
        loop {
            if let Some(item) = self.retrieve() {
                return Some(item);
            }
            if let Some(dl) = deadline
                && Instant::now() > dl
            {
                return None;
            }
            std::hint::spin_loop();
        }
    }

    /// Unconditionally resets head, tail and count to zero.
    ///
    /// Not coordinated with concurrent CAS loops: a producer mid-reservation
    /// may complete against stale indices. Live elements are not dropped
    /// here; they are released when the ring is dropped. Callers must
    /// quiesce all producers and consumers first.
    pub fn flush(&self) {
        if !self.ready() {
            return;
        }
        self.head.store(0, self.policy.publish());
        self.tail.store(0, self.policy.publish());
        self.count.store(0, self.policy.publish());
        debug!("lock-free ring flushed");
    }

    /// Drops every live element in place and resets the indices.
    ///
    /// # Safety
    ///
    /// No other thread may be inside any operation of this ring for the
    /// duration of the call.
    pub(crate) unsafe fn drain_in_place(&self) {
        let cap = self.store.capacity();
        let n = self.count.load(Ordering::Acquire).min(cap);
        let mut idx = self.head.load(Ordering::Acquire);
        for _ in 0..n {
            // SAFETY: quiescence (caller contract) plus the count/head
            // bookkeeping make these the live, initialized slots.
            unsafe { self.store.drop_in_place(idx) };
            idx = self.bump(idx);
        }
        self.head.store(0, self.policy.publish());
        self.tail.store(0, self.policy.publish());
        self.count.store(0, self.policy.publish());
    }
}

impl<T> Drop for LockFreeRing<'_, T> {
    fn drop(&mut self) {
        if !std::mem::needs_drop::<T>() {
            return;
        }
        // SAFETY: &mut self proves no other thread is inside the ring.
        unsafe { self.drain_in_place() };
    }
}
