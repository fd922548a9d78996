//! Counting semaphore with timed acquire.
//!
//! The releasing side never blocks, so [`Semaphore::release`] is safe to
//! call from an interrupt handler. The acquiring side polls the permit
//! count against a [`Timer`] deadline.

use core::sync::atomic::{AtomicUsize, Ordering};

use armino_hal::Timer;

/// Timeout value that waits without a deadline.
pub const WAIT_FOREVER: u32 = u32::MAX;

/// A counting semaphore.
///
/// The semaphore maintains a permit count. Callers acquire permits
/// (decrementing the count) or release permits (incrementing the count,
/// capped at the maximum).
///
/// # Example
///
/// ```
/// use armino_uart::sync::Semaphore;
///
/// // Binary semaphore, initially empty
/// let sem = Semaphore::with_max(0, 1);
/// assert!(!sem.try_acquire());
///
/// sem.release();
/// sem.release();
/// assert_eq!(sem.available_permits(), 1);
/// ```
#[derive(Debug)]
pub struct Semaphore {
    /// Current number of available permits.
    permits: AtomicUsize,
    /// Maximum permits (for bounds checking on release).
    max_permits: usize,
}

impl Semaphore {
    /// Create a new semaphore with the given number of initial permits.
    ///
    /// The `permits` value is both the initial count and the maximum.
    pub const fn new(permits: usize) -> Self {
        Self {
            permits: AtomicUsize::new(permits),
            max_permits: permits,
        }
    }

    /// Create a new semaphore with separate initial and maximum permit counts.
    pub const fn with_max(initial: usize, max: usize) -> Self {
        debug_assert!(initial <= max, "initial permits cannot exceed max");
        Self {
            permits: AtomicUsize::new(initial),
            max_permits: max,
        }
    }

    /// Get the current number of available permits.
    pub fn available_permits(&self) -> usize {
        self.permits.load(Ordering::Relaxed)
    }

    /// Attempt to acquire a permit without blocking.
    ///
    /// Returns `true` if a permit was acquired, `false` if none available.
    pub fn try_acquire(&self) -> bool {
        loop {
            let current = self.permits.load(Ordering::Relaxed);
            if current == 0 {
                return false;
            }
            if self
                .permits
                .compare_exchange_weak(current, current - 1, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
            // CAS failed, retry
        }
    }

    /// Acquire a permit, waiting up to `timeout_ms` milliseconds of `clock`.
    ///
    /// A timeout of 0 tries once. [`WAIT_FOREVER`] waits with no deadline.
    /// Returns `true` if a permit was acquired.
    pub fn acquire_timeout(&self, timeout_ms: u32, clock: &dyn Timer) -> bool {
        if self.try_acquire() {
            return true;
        }
        if timeout_ms == 0 {
            return false;
        }

        let deadline = (timeout_ms != WAIT_FOREVER)
            .then(|| clock.current_ticks().saturating_add(clock.ms_to_ticks(timeout_ms)));
        loop {
            if self.try_acquire() {
                return true;
            }
            if let Some(deadline) = deadline {
                if clock.current_ticks() >= deadline {
                    return false;
                }
            }
            core::hint::spin_loop();
        }
    }

    /// Release a permit back to the semaphore.
    ///
    /// The permit count will not exceed the maximum.
    pub fn release(&self) {
        loop {
            let current = self.permits.load(Ordering::Relaxed);
            let new_val = core::cmp::min(current + 1, self.max_permits);
            if current == new_val {
                // Already at max
                break;
            }
            if self
                .permits
                .compare_exchange_weak(current, new_val, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
            // CAS failed, retry
        }
    }

    /// Drops every outstanding permit.
    pub fn reset(&self) {
        self.permits.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armino_hal::mock::MockClock;

    #[test]
    fn test_semaphore_try_acquire() {
        let sem = Semaphore::new(2);

        // Should succeed twice
        assert!(sem.try_acquire());
        assert!(sem.try_acquire());

        // Third should fail
        assert!(!sem.try_acquire());
    }

    #[test]
    fn test_semaphore_release() {
        let sem = Semaphore::new(1);

        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());

        sem.release();
        assert!(sem.try_acquire());
    }

    #[test]
    fn test_semaphore_max_permits() {
        let sem = Semaphore::with_max(0, 1);

        // Release without acquiring should not exceed max
        sem.release();
        sem.release();
        sem.release();

        assert_eq!(sem.available_permits(), 1);
    }

    #[test]
    fn test_semaphore_acquire_timeout_expires() {
        let clock = MockClock::new();
        let sem = Semaphore::with_max(0, 1);

        assert!(!sem.acquire_timeout(50, &clock));
        assert!(clock.peek() >= 50);
    }

    #[test]
    fn test_semaphore_acquire_timeout_zero_polls_once() {
        let clock = MockClock::new();
        let sem = Semaphore::with_max(0, 1);

        assert!(!sem.acquire_timeout(0, &clock));
        assert_eq!(clock.peek(), 0);

        sem.release();
        assert!(sem.acquire_timeout(0, &clock));
    }

    #[test]
    fn test_semaphore_reset() {
        let sem = Semaphore::with_max(1, 1);
        sem.reset();
        assert_eq!(sem.available_permits(), 0);
        assert!(!sem.try_acquire());
    }
}
