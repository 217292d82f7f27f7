//! Runtime-selectable memory-ordering policy for the atomic ring variants.
//!
//! The aggressiveness of the orderings is a deployment-target tuning knob
//! (single-core embedded, multi-core, x86 with its strong model), carried as a
//! configuration value so the same binary can be exercised under every regime.
//! It is not a correctness switch for single-producer/single-consumer use.

use std::sync::atomic::Ordering;

/// Memory-ordering policy applied to every atomic operation of a ring.
///
/// [`OrderPolicy::AcquireRelease`] is the default and matches the canonical
/// insert/retrieve protocol: Acquire loads on the admission check and index
/// read, a Release/Relaxed CAS on the index reservation, and a Release
/// publish on the count update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderPolicy {
    /// All operations Relaxed. Maximum throughput; index and count reads may
    /// observe arbitrarily stale values. Intended for single-core targets
    /// where preemption is the only source of interleaving.
    Relaxed,
    /// Acquire loads, Release publications, Release/Relaxed CAS.
    #[default]
    AcquireRelease,
    /// Everything sequentially consistent. The conservative choice for
    /// targets with DMA or cache-coherency hazards.
    SeqCst,
}

impl OrderPolicy {
    /// Ordering for admission-check and index loads.
    #[inline]
    #[must_use]
    pub(crate) const fn load(self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::Acquire,
            Self::SeqCst => Ordering::SeqCst,
        }
    }

    /// Ordering for the success side of an index-reservation CAS.
    #[inline]
    #[must_use]
    pub(crate) const fn cas_success(self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::Release,
            Self::SeqCst => Ordering::SeqCst,
        }
    }

    /// Ordering for the failure side of an index-reservation CAS.
    #[inline]
    #[must_use]
    pub(crate) const fn cas_failure(self) -> Ordering {
        match self {
            Self::Relaxed | Self::AcquireRelease => Ordering::Relaxed,
            Self::SeqCst => Ordering::SeqCst,
        }
    }

    /// Ordering for count updates and index resets that publish a completed
    /// slot operation.
    #[inline]
    #[must_use]
    pub(crate) const fn publish(self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::Release,
            Self::SeqCst => Ordering::SeqCst,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_reproduces_canonical_orderings() {
        let policy = OrderPolicy::default();
        assert_eq!(policy, OrderPolicy::AcquireRelease);
        assert_eq!(policy.load(), Ordering::Acquire);
        assert_eq!(policy.cas_success(), Ordering::Release);
        assert_eq!(policy.cas_failure(), Ordering::Relaxed);
        assert_eq!(policy.publish(), Ordering::Release);
    }

    #[test]
    fn test_relaxed_policy_never_fences() {
        let policy = OrderPolicy::Relaxed;
        assert_eq!(policy.load(), Ordering::Relaxed);
        assert_eq!(policy.cas_success(), Ordering::Relaxed);
        assert_eq!(policy.cas_failure(), Ordering::Relaxed);
        assert_eq!(policy.publish(), Ordering::Relaxed);
    }
}
