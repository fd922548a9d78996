//! Power-manager integration.
//!
//! Ports 1 and 2 sit in a power domain that loses its registers in
//! low-voltage sleep. Their hooks snapshot the registers on entry and the
//! snapshot is written back either by the exit hook or lazily by the next
//! register-touching call, whichever comes first.
//!
//! Every port also gets a deep-sleep entry hook that drains the
//! transmitter and switches both directions off.

use armino_common::{Result, UartError, UartId};
use armino_hal::{
    PmAction, PmDeviceId, PmHandler, PmHook, PmMode, PowerModule, UartHal, UART_PM_BACKUP_REG_NUM,
};
use critical_section::CriticalSection;
use log::{debug, info};

use super::port::Port;
use super::UartDriver;

/// Power-manager device for port `id`.
pub(crate) fn pm_device(id: UartId) -> PmDeviceId {
    match id.0 {
        1 => PmDeviceId::UART2,
        2 => PmDeviceId::UART3,
        _ => PmDeviceId::UART1,
    }
}

/// Low-voltage backup domain for port `id`, if it has one.
pub(crate) fn lv_domain(id: UartId) -> Option<(PmDeviceId, PowerModule)> {
    match id.0 {
        1 => Some((PmDeviceId::UART2, PowerModule::BakpUart1)),
        2 => Some((PmDeviceId::UART3, PowerModule::BakpUart2)),
        _ => None,
    }
}

impl<H: UartHal> UartDriver<'_, H> {
    pub(super) fn register_pm_hooks(&self, id: UartId) {
        let pm = self.platform.pm;
        let arg = id.index();
        if self.config.pm_backup {
            if let Some((dev, _)) = lv_domain(id) {
                pm.register(
                    PmMode::LowVoltage,
                    dev,
                    Some(PmHook::new(PmAction::Backup, arg)),
                    Some(PmHook::new(PmAction::Restore, arg)),
                );
                pm.clear_lv_sleep_state(dev);
            }
        }
        pm.register(
            PmMode::DeepSleep,
            pm_device(id),
            Some(PmHook::new(PmAction::Suspend, arg)),
            None,
        );
    }

    pub(super) fn unregister_pm_hooks(&self, id: UartId) {
        let pm = self.platform.pm;
        if self.config.pm_backup {
            if let Some((dev, _)) = lv_domain(id) {
                pm.unregister(PmMode::LowVoltage, dev, true, true);
            }
        }
        pm.unregister(PmMode::DeepSleep, pm_device(id), true, false);
    }

    pub(super) fn vote_lv_power(&self, id: UartId, on: bool) {
        if !self.config.pm_backup {
            return;
        }
        if let Some((_, module)) = lv_domain(id) {
            self.platform.pm.vote_power(module, on);
        }
    }

    /// Restores the registers of a port whose domain went through
    /// low-voltage sleep since it was last touched.
    pub(super) fn pm_check_restore(&self, port: &Port<H>) {
        if !self.config.pm_backup {
            return;
        }
        let Some((dev, module)) = lv_domain(port.id) else {
            return;
        };
        let pm = self.platform.pm;
        critical_section::with(|cs| {
            if pm.lv_sleep_state(dev) {
                pm.vote_power(module, true);
                Self::restore_registers(cs, port);
                pm.clear_lv_sleep_state(dev);
            }
        });
    }

    fn backup_registers(cs: CriticalSection<'_>, port: &Port<H>) -> bool {
        let mut state = port.state.borrow_ref_mut(cs);
        if state.pm_backup.is_some() {
            return false;
        }
        let mut regs = [0u32; UART_PM_BACKUP_REG_NUM];
        port.hal.backup(&mut regs);
        state.pm_backup = Some(regs);
        true
    }

    fn restore_registers(cs: CriticalSection<'_>, port: &Port<H>) -> bool {
        let regs = port.state.borrow_ref_mut(cs).pm_backup.take();
        match regs {
            Some(regs) => {
                port.hal.restore(&regs);
                true
            }
            None => false,
        }
    }

    fn lv_backup(&self, id: UartId) -> Result<()> {
        let port = self.port_initialized(id)?;
        if critical_section::with(|cs| Self::backup_registers(cs, port)) {
            debug!("{}: registers saved", id);
        }
        Ok(())
    }

    fn lv_restore(&self, id: UartId) -> Result<()> {
        let port = self.port_initialized(id)?;
        if critical_section::with(|cs| Self::restore_registers(cs, port)) {
            debug!("{}: registers restored", id);
        }
        Ok(())
    }

    /// Snapshots port `id`'s registers ahead of low-voltage sleep.
    ///
    /// Only ports 1 and 2 have a low-voltage domain. A second call without
    /// an intervening restore keeps the first snapshot.
    pub fn pm_backup(&self, id: UartId) -> Result<()> {
        if lv_domain(id).is_none() {
            return Err(UartError::LowVoltageUnsupported);
        }
        if !self.config.pm_backup {
            return Ok(());
        }
        self.lv_backup(id)
    }

    /// Drains the transmitter and turns port `id` off ahead of deep sleep.
    ///
    /// Busy-waits until the hardware reports the TX path empty. The wait
    /// reads the TX status register only.
    pub fn enter_deep_sleep(&self, id: UartId) -> Result<()> {
        self.disable_tx_interrupt(id)?;
        let port = self.port(id)?;
        while !port.hal.is_tx_fifo_empty() {
            core::hint::spin_loop();
        }
        self.set_enable_tx(id, false)?;
        self.set_enable_rx(id, false)?;
        info!("{}: entering deep sleep", id);
        Ok(())
    }
}

impl<H: UartHal> PmHandler for UartDriver<'_, H> {
    type Error = UartError;

    fn on_pm_event(&self, hook: PmHook, _sleep_time: u64) -> Result<()> {
        let id = UartId(u8::try_from(hook.arg).map_err(|_| UartError::InvalidId)?);
        match hook.action {
            PmAction::Backup => self.lv_backup(id),
            PmAction::Restore => self.lv_restore(id),
            PmAction::Suspend => self.enter_deep_sleep(id),
        }
    }
}
