//! Mock interrupt controller.

use alloc::vec::Vec;
use spin::Mutex;

use crate::{IntSource, InterruptController};

/// Records ISR registrations and the enable state of each source.
#[derive(Debug, Default)]
pub struct MockInterruptController {
    handlers: Mutex<Vec<(IntSource, fn())>>,
    enabled: Mutex<Vec<IntSource>>,
}

impl MockInterruptController {
    /// Creates a controller with nothing registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler installed for `source`, if any.
    pub fn handler(&self, source: IntSource) -> Option<fn()> {
        self.handlers
            .lock()
            .iter()
            .rev()
            .find(|(s, _)| *s == source)
            .map(|(_, h)| *h)
    }

    /// True if `source` is currently unmasked.
    pub fn is_enabled(&self, source: IntSource) -> bool {
        self.enabled.lock().contains(&source)
    }
}

impl InterruptController for MockInterruptController {
    fn register_isr(&self, source: IntSource, handler: fn()) {
        self.handlers.lock().push((source, handler));
    }

    fn enable(&self, source: IntSource) {
        let mut enabled = self.enabled.lock();
        if !enabled.contains(&source) {
            enabled.push(source);
        }
    }

    fn disable(&self, source: IntSource) {
        self.enabled.lock().retain(|s| *s != source);
    }
}
