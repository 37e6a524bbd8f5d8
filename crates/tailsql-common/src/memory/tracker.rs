//! Byte-level memory tracker with RAII reservations.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::error::ErrorCode;

/// Raised when a reservation would push usage past the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("memory limit exceeded: requested {requested} bytes with {used} of {limit} bytes in use")]
pub struct MemoryError {
    /// Bytes asked for.
    pub requested: usize,
    /// Bytes in use at the time of the request.
    pub used: usize,
    /// Configured limit.
    pub limit: usize,
}

impl MemoryError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::ResourcesExhausted
    }
}

/// Tracks bytes held by materialized and transient batches.
///
/// # Example
///
/// ```rust
/// use tailsql_common::memory::MemoryTracker;
///
/// let tracker = MemoryTracker::with_limit(1024);
/// let reservation = tracker.try_reserve(512).unwrap();
/// assert_eq!(tracker.used(), 512);
/// assert!(tracker.try_reserve(1024).is_err());
/// drop(reservation);
/// assert_eq!(tracker.used(), 0);
/// ```
pub struct MemoryTracker {
    used: AtomicUsize,
    peak: AtomicUsize,
    limit: Option<usize>,
}

impl MemoryTracker {
    /// Creates a tracker without a limit.
    #[must_use]
    pub fn unbounded() -> Arc<Self> {
        Arc::new(Self {
            used: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            limit: None,
        })
    }

    /// Creates a tracker that refuses reservations beyond `limit` bytes.
    #[must_use]
    pub fn with_limit(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            used: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            limit: Some(limit),
        })
    }

    /// Reserves `bytes`, failing if the limit would be exceeded.
    ///
    /// The reservation is released when the returned guard is dropped.
    pub fn try_reserve(self: &Arc<Self>, bytes: usize) -> Result<MemoryReservation, MemoryError> {
        let mut current = self.used.load(Ordering::Relaxed);
        loop {
            let next = current.saturating_add(bytes);
            if let Some(limit) = self.limit {
                if next > limit {
                    return Err(MemoryError {
                        requested: bytes,
                        used: current,
                        limit,
                    });
                }
            }
            match self
                .used
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => {
                    self.peak.fetch_max(next, Ordering::Relaxed);
                    return Ok(MemoryReservation {
                        tracker: Arc::clone(self),
                        bytes,
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Bytes currently reserved.
    #[must_use]
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }

    /// Highest usage observed.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    /// Configured limit, if any.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

impl fmt::Debug for MemoryTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTracker")
            .field("used", &self.used())
            .field("peak", &self.peak())
            .field("limit", &self.limit)
            .finish()
    }
}

/// Bytes held against a [`MemoryTracker`] until dropped.
pub struct MemoryReservation {
    tracker: Arc<MemoryTracker>,
    bytes: usize,
}

impl MemoryReservation {
    /// Reserved byte count.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes
    }
}

impl Drop for MemoryReservation {
    fn drop(&mut self) {
        self.tracker.release(self.bytes);
    }
}

impl fmt::Debug for MemoryReservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryReservation")
            .field("bytes", &self.bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_and_release() {
        let tracker = MemoryTracker::unbounded();
        let a = tracker.try_reserve(100).unwrap();
        let b = tracker.try_reserve(50).unwrap();
        assert_eq!(tracker.used(), 150);
        assert_eq!(a.size(), 100);

        drop(a);
        assert_eq!(tracker.used(), 50);
        drop(b);
        assert_eq!(tracker.used(), 0);
        assert_eq!(tracker.peak(), 150);
    }

    #[test]
    fn test_limit_enforced() {
        let tracker = MemoryTracker::with_limit(100);
        let _held = tracker.try_reserve(80).unwrap();

        let err = tracker.try_reserve(30).unwrap_err();
        assert_eq!(
            err,
            MemoryError {
                requested: 30,
                used: 80,
                limit: 100
            }
        );
        assert_eq!(err.code(), ErrorCode::ResourcesExhausted);
        assert!(tracker.try_reserve(20).is_ok());
    }

    #[test]
    fn test_concurrent_reservations() {
        let tracker = MemoryTracker::unbounded();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let r = tracker.try_reserve(8).unwrap();
                        drop(r);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.used(), 0);
    }
}
