//! Power manager interface.
//!
//! Drivers register [`PmHook`] descriptors for a (mode, device) pair. When
//! the system crosses a sleep transition the power manager hands each hook
//! back to the owning driver through [`PmHandler::on_pm_event`].

/// Sleep state a hook is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PmMode {
    /// Low-voltage sleep: register contents are lost on some domains.
    LowVoltage,
    /// Deep sleep: the peripheral is powered off.
    DeepSleep,
}

/// Logical device id known to the power manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PmDeviceId(pub u8);

impl PmDeviceId {
    /// UART port 0.
    pub const UART1: PmDeviceId = PmDeviceId(1);
    /// UART port 1.
    pub const UART2: PmDeviceId = PmDeviceId(2);
    /// UART port 2.
    pub const UART3: PmDeviceId = PmDeviceId(3);
}

/// Power sub-modules a driver can vote on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerModule {
    /// Backup domain for UART port 1.
    BakpUart1,
    /// Backup domain for UART port 2.
    BakpUart2,
}

/// What a hook asks the driver to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PmAction {
    /// Save registers before power is lowered.
    Backup,
    /// Restore registers after power returns.
    Restore,
    /// Quiesce the peripheral before power is cut.
    Suspend,
}

/// A registered callback descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PmHook {
    /// Requested action.
    pub action: PmAction,
    /// Driver-defined argument, typically a port index.
    pub arg: usize,
}

impl PmHook {
    /// Creates a hook descriptor.
    pub const fn new(action: PmAction, arg: usize) -> Self {
        Self { action, arg }
    }
}

/// Power manager operations used by drivers.
pub trait PowerManager: Sync {
    /// Registers entry and exit hooks for `dev` in `mode`.
    fn register(&self, mode: PmMode, dev: PmDeviceId, enter: Option<PmHook>, exit: Option<PmHook>);
    /// Removes the entry and/or exit hooks for `dev` in `mode`.
    fn unregister(&self, mode: PmMode, dev: PmDeviceId, enter: bool, exit: bool);
    /// True if `dev` went through low-voltage sleep and has not been restored.
    fn lv_sleep_state(&self, dev: PmDeviceId) -> bool;
    /// Clears the pending-restore state for `dev`.
    fn clear_lv_sleep_state(&self, dev: PmDeviceId);
    /// Votes a power sub-module on or off.
    fn vote_power(&self, module: PowerModule, on: bool);
}

/// Implemented by drivers that receive power-manager hooks.
pub trait PmHandler {
    /// Error reported back to the power manager.
    type Error;

    /// Runs `hook` for a transition expected to last `sleep_time` microseconds.
    fn on_pm_event(&self, hook: PmHook, sleep_time: u64) -> Result<(), Self::Error>;
}
