//! Mock power manager.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};
use spin::Mutex;

use crate::{PmDeviceId, PmHook, PmMode, PowerManager, PowerModule};

#[derive(Debug, Clone, Copy)]
struct Registration {
    mode: PmMode,
    dev: PmDeviceId,
    enter: Option<PmHook>,
    exit: Option<PmHook>,
}

/// Keeps hook registrations, pending low-voltage restores and power votes.
#[derive(Debug, Default)]
pub struct MockPowerManager {
    registrations: Mutex<Vec<Registration>>,
    lv_pending: Mutex<Vec<PmDeviceId>>,
    votes: Mutex<Vec<(PowerModule, bool)>>,
    lv_queries: AtomicUsize,
}

impl MockPowerManager {
    /// Creates a power manager with nothing registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry and exit hooks registered for `dev` in `mode`.
    pub fn hooks(&self, mode: PmMode, dev: PmDeviceId) -> Option<(Option<PmHook>, Option<PmHook>)> {
        self.registrations
            .lock()
            .iter()
            .find(|r| r.mode == mode && r.dev == dev)
            .map(|r| (r.enter, r.exit))
    }

    /// Entry hooks for every device registered in `mode`.
    pub fn enter_hooks(&self, mode: PmMode) -> Vec<PmHook> {
        self.registrations
            .lock()
            .iter()
            .filter(|r| r.mode == mode)
            .filter_map(|r| r.enter)
            .collect()
    }

    /// Exit hooks for every device registered in `mode`.
    pub fn exit_hooks(&self, mode: PmMode) -> Vec<PmHook> {
        self.registrations
            .lock()
            .iter()
            .filter(|r| r.mode == mode)
            .filter_map(|r| r.exit)
            .collect()
    }

    /// Marks `dev` as having slept in low-voltage mode.
    pub fn set_lv_sleep_state(&self, dev: PmDeviceId) {
        let mut pending = self.lv_pending.lock();
        if !pending.contains(&dev) {
            pending.push(dev);
        }
    }

    /// Number of `lv_sleep_state` calls so far.
    pub fn lv_state_queries(&self) -> usize {
        self.lv_queries.load(Ordering::Relaxed)
    }

    /// Last vote cast for `module`.
    pub fn vote(&self, module: PowerModule) -> Option<bool> {
        self.votes
            .lock()
            .iter()
            .rev()
            .find(|(m, _)| *m == module)
            .map(|(_, on)| *on)
    }
}

impl PowerManager for MockPowerManager {
    fn register(&self, mode: PmMode, dev: PmDeviceId, enter: Option<PmHook>, exit: Option<PmHook>) {
        let mut regs = self.registrations.lock();
        regs.retain(|r| !(r.mode == mode && r.dev == dev));
        regs.push(Registration {
            mode,
            dev,
            enter,
            exit,
        });
    }

    fn unregister(&self, mode: PmMode, dev: PmDeviceId, enter: bool, exit: bool) {
        let mut regs = self.registrations.lock();
        for r in regs.iter_mut().filter(|r| r.mode == mode && r.dev == dev) {
            if enter {
                r.enter = None;
            }
            if exit {
                r.exit = None;
            }
        }
        regs.retain(|r| r.enter.is_some() || r.exit.is_some());
    }

    fn lv_sleep_state(&self, dev: PmDeviceId) -> bool {
        self.lv_queries.fetch_add(1, Ordering::Relaxed);
        self.lv_pending.lock().contains(&dev)
    }

    fn clear_lv_sleep_state(&self, dev: PmDeviceId) {
        self.lv_pending.lock().retain(|d| *d != dev);
    }

    fn vote_power(&self, module: PowerModule, on: bool) {
        self.votes.lock().push((module, on));
    }
}
