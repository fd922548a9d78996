//! Mock tick source.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::Timer;

/// Tick source that advances by a fixed step on every read.
///
/// The auto-advance lets polling loops with a deadline terminate without a
/// second thread driving time.
#[derive(Debug)]
pub struct MockClock {
    ticks: AtomicU64,
    step: AtomicU64,
    hz: u32,
}

impl MockClock {
    /// 1 kHz clock advancing one tick per read.
    pub fn new() -> Self {
        Self::with_step(1000, 1)
    }

    /// Clock of `hz` advancing `step` ticks per read.
    pub fn with_step(hz: u32, step: u64) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            step: AtomicU64::new(step),
            hz,
        }
    }

    /// Moves time forward by `ticks`.
    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    /// Changes the auto-advance step.
    pub fn set_step(&self, step: u64) {
        self.step.store(step, Ordering::Relaxed);
    }

    /// Current tick count without advancing.
    pub fn peek(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for MockClock {
    fn current_ticks(&self) -> u64 {
        let step = self.step.load(Ordering::Relaxed);
        self.ticks.fetch_add(step, Ordering::Relaxed)
    }

    fn tick_hz(&self) -> u32 {
        self.hz
    }
}
