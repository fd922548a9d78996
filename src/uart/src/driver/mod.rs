//! UART driver context.
//!
//! [`UartDriver`] owns the state of every hardware UART port together with
//! references to the platform collaborators it needs: the power manager,
//! the DMA controller, the interrupt controller and a tick source.
//!
//! # Layout
//!
//! - `port`: per-port state shared with interrupt context
//! - `isr`: interrupt dispatch
//! - `dma`: DMA receive setup and per-frame accounting
//! - `io`: blocking read and polled write
//! - `pm`: low-voltage backup/restore and deep-sleep entry
//!
//! # Error checks
//!
//! Port operations validate in a fixed order: driver initialised
//! ([`UartError::NotInit`]), id in range ([`UartError::InvalidId`]), and
//! for data-path operations port initialised ([`UartError::IdNotInit`]).

mod dma;
mod io;
mod isr;
mod pm;
mod port;

#[cfg(test)]
mod tests;

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use armino_common::config::is_baud_rate_supported;
use armino_common::{
    DataBits, FlowControl, Parity, Result, RxStopDetectTime, SourceClock, StopBits, UartConfig,
    UartError, UartId, UartInterrupt, UART_PORT_COUNT,
};
use armino_hal::{DmaController, IntSource, InterruptController, PowerManager, Timer, UartHal};
use log::{debug, error, info, warn};

use crate::fifo::RingBuffer;
use crate::stats::UartStats;
use port::Port;

pub use port::UartCallback;

/// RX FIFO level at which RTS is deasserted when `init` enables flow control.
pub const DEFAULT_FLOW_CTRL_THRESHOLD: u8 = 64;

/// Platform collaborators the driver calls into.
#[derive(Clone, Copy)]
pub struct Platform<'a> {
    /// Sleep hook registry and power votes.
    pub pm: &'a dyn PowerManager,
    /// DMA channel allocator for receive.
    pub dma: &'a dyn DmaController,
    /// Interrupt controller the per-port service routines are installed in.
    pub irq: &'a dyn InterruptController,
    /// Tick source for blocking-read timeouts.
    pub clock: &'a dyn Timer,
}

/// Driver-wide build options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Software FIFO size for interrupt-driven receive.
    pub kfifo_size: usize,
    /// Software FIFO size when receiving through DMA.
    pub dma_kfifo_size: usize,
    /// Register low-voltage backup/restore hooks for ports 1 and 2.
    pub pm_backup: bool,
    /// Also unmask parity, stop-bit and overflow interrupts on receive.
    pub rx_error_interrupt: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            kfifo_size: 128,
            dma_kfifo_size: 1024,
            pm_backup: true,
            rx_error_interrupt: false,
        }
    }
}

/// Driver for the SoC's UART ports.
///
/// One instance serves every port. Task-context methods take `&self`;
/// interrupt context enters through [`UartDriver::handle_interrupt`].
pub struct UartDriver<'a, H: UartHal> {
    initialized: AtomicBool,
    ports: [Port<H>; UART_PORT_COUNT],
    platform: Platform<'a>,
    /// Service routine installed for each port. Each entry must forward to
    /// `handle_interrupt` for its port.
    isr_table: [fn(); UART_PORT_COUNT],
    config: DriverConfig,
}

impl<'a, H: UartHal> UartDriver<'a, H> {
    /// Creates a driver over one HAL instance per port.
    pub fn new(
        hals: [H; UART_PORT_COUNT],
        platform: Platform<'a>,
        isr_table: [fn(); UART_PORT_COUNT],
        config: DriverConfig,
    ) -> Self {
        let mut next_id = 0u8;
        let ports = hals.map(|hal| {
            let port = Port::new(UartId(next_id), hal);
            next_id += 1;
            port
        });
        Self {
            initialized: AtomicBool::new(false),
            ports,
            platform,
            isr_table,
            config,
        }
    }

    /// Marks the driver usable and clears every callback slot.
    ///
    /// Calling it again while initialised does nothing.
    pub fn driver_init(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        critical_section::with(|cs| {
            for port in &self.ports {
                let mut state = port.state.borrow_ref_mut(cs);
                state.rx_callback = None;
                state.tx_callback = None;
                state.saved_rx_callback = None;
            }
        });
        self.initialized.store(true, Ordering::Release);
        info!("uart driver init");
        Ok(())
    }

    /// Shuts every port down and marks the driver unusable.
    pub fn driver_deinit(&self) -> Result<()> {
        if !self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        for port in &self.ports {
            self.rx_dma_deinit(port);
            self.deinit_common(port);
            self.unregister_pm_hooks(port.id);
        }
        self.initialized.store(false, Ordering::Release);
        info!("uart driver deinit");
        Ok(())
    }

    /// Brings up port `id` with `config` and starts it.
    ///
    /// A DMA channel that cannot be set up is logged and the port falls
    /// back to interrupt-driven receive.
    pub fn init(&self, id: UartId, config: &UartConfig) -> Result<()> {
        let port = self.port(id)?;
        if !is_baud_rate_supported(config.baud_rate) {
            warn!("{}: baud rate {} not supported", id, config.baud_rate);
            return Err(UartError::BaudRateNotSupported);
        }

        self.register_pm_hooks(id);
        self.platform
            .irq
            .register_isr(IntSource::Uart(id.0), self.isr_table[id.index()]);

        self.rx_dma_deinit(port);
        self.init_common(port, config);
        if config.rx_dma_enable {
            if let Err(err) = self.rx_dma_init(port) {
                error!("{}: rx dma init failed ({}), using interrupt receive", id, err);
            }
        }

        port.hal.select_source_clock(config.src_clk);
        port.hal.configure(port.hal.source_clock_hz(), config);
        match config.flow_ctrl {
            FlowControl::RtsCts => port.hal.set_hw_flow_control(DEFAULT_FLOW_CTRL_THRESHOLD),
            FlowControl::Disabled => port.hal.disable_hw_flow_control(),
        }
        port.hal.start();

        info!("{}: init, baud {}", id, config.baud_rate);
        Ok(())
    }

    /// Stops port `id`, frees its receive resources and drops its hooks.
    pub fn deinit(&self, id: UartId) -> Result<()> {
        let port = self.port(id)?;
        self.rx_dma_deinit(port);
        self.deinit_common(port);
        self.unregister_pm_hooks(id);
        info!("{}: deinit", id);
        Ok(())
    }

    /// Returns true if port `id` is initialised.
    pub fn is_in_use(&self, id: UartId) -> bool {
        self.ports
            .get(id.index())
            .map(Port::is_initialized)
            .unwrap_or(false)
    }

    fn init_common(&self, port: &Port<H>, config: &UartConfig) {
        port.hal.set_clock_enabled(true);
        port.hal.select_source_clock(SourceClock::Xtal26M);
        self.vote_lv_power(port.id, true);

        let fifo_size = if config.rx_dma_enable {
            self.config.dma_kfifo_size
        } else {
            self.config.kfifo_size
        };
        let needs_fifo = critical_section::with(|cs| port.state.borrow_ref(cs).rx_fifo.is_none());
        let mut fifo = needs_fifo.then(|| Arc::new(RingBuffer::new(fifo_size)));

        port.stats.reset();
        port.rx_sema.reset();
        critical_section::with(|cs| {
            let mut state = port.state.borrow_ref_mut(cs);
            if state.rx_fifo.is_none() {
                state.rx_fifo = fifo.take();
            }
            state.rx_blocked = false;
            state.sw_fifo_enabled = true;
            state.pm_backup = None;
            state.initialized = true;
        });
        debug!("{}: rx fifo ready", port.id);
    }

    fn deinit_common(&self, port: &Port<H>) {
        let fifo = critical_section::with(|cs| {
            let mut state = port.state.borrow_ref_mut(cs);
            state.initialized = false;
            state.rx_blocked = false;
            state.pm_backup = None;
            state.rx_fifo.take()
        });
        port.hal.stop();
        port.hal.reset_to_default();
        self.platform.irq.disable(IntSource::Uart(port.id.0));
        port.hal.set_clock_enabled(false);
        self.vote_lv_power(port.id, false);
        port.rx_sema.reset();
        drop(fifo);
    }

    /// Validates driver state and id.
    fn port(&self, id: UartId) -> Result<&Port<H>> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(UartError::NotInit);
        }
        self.ports.get(id.index()).ok_or(UartError::InvalidId)
    }

    /// Validates driver state and id, and that the port is initialised.
    fn port_initialized(&self, id: UartId) -> Result<&Port<H>> {
        let port = self.port(id)?;
        if !port.is_initialized() {
            return Err(UartError::IdNotInit);
        }
        Ok(port)
    }

    /// Validates the id only.
    fn port_any(&self, id: UartId) -> Result<&Port<H>> {
        self.ports.get(id.index()).ok_or(UartError::InvalidId)
    }

    /// Validates, restores lost registers, then runs `f` on the port's HAL.
    fn with_hal<R>(&self, id: UartId, f: impl FnOnce(&H) -> R) -> Result<R> {
        let port = self.port(id)?;
        self.pm_check_restore(port);
        Ok(f(&port.hal))
    }

    // Line configuration

    /// Changes the baud rate of port `id`.
    pub fn set_baud_rate(&self, id: UartId, baud_rate: u32) -> Result<()> {
        let port = self.port(id)?;
        self.pm_check_restore(port);
        if !is_baud_rate_supported(baud_rate) {
            return Err(UartError::BaudRateNotSupported);
        }
        port.hal.set_baud_rate(port.hal.source_clock_hz(), baud_rate);
        Ok(())
    }

    /// Sets the data bits per frame.
    pub fn set_data_bits(&self, id: UartId, data_bits: DataBits) -> Result<()> {
        self.with_hal(id, |hal| hal.set_data_bits(data_bits))
    }

    /// Sets the stop bits per frame.
    pub fn set_stop_bits(&self, id: UartId, stop_bits: StopBits) -> Result<()> {
        self.with_hal(id, |hal| hal.set_stop_bits(stop_bits))
    }

    /// Sets the parity mode.
    pub fn set_parity(&self, id: UartId, parity: Parity) -> Result<()> {
        self.with_hal(id, |hal| hal.set_parity(parity))
    }

    /// Sets the RX FIFO level that raises `RX_FIFO_NEED_READ`.
    pub fn set_rx_full_threshold(&self, id: UartId, threshold: u8) -> Result<()> {
        self.with_hal(id, |hal| hal.set_rx_fifo_threshold(threshold))
    }

    /// Sets the TX FIFO level that raises `TX_FIFO_NEED_WRITE`.
    pub fn set_tx_empty_threshold(&self, id: UartId, threshold: u8) -> Result<()> {
        self.with_hal(id, |hal| hal.set_tx_fifo_threshold(threshold))
    }

    /// Sets the idle time after which `RX_FINISH` fires.
    pub fn set_rx_timeout(&self, id: UartId, time: RxStopDetectTime) -> Result<()> {
        self.with_hal(id, |hal| hal.set_rx_stop_detect_time(time))
    }

    /// Enables RTS/CTS, deasserting RTS at `rx_threshold` bytes.
    pub fn set_hw_flow_ctrl(&self, id: UartId, rx_threshold: u8) -> Result<()> {
        self.with_hal(id, |hal| hal.set_hw_flow_control(rx_threshold))
    }

    /// Disables RTS/CTS.
    pub fn disable_hw_flow_ctrl(&self, id: UartId) -> Result<()> {
        self.with_hal(id, |hal| hal.disable_hw_flow_control())
    }

    // Path control

    /// Enables or disables the receiver.
    pub fn set_enable_rx(&self, id: UartId, enable: bool) -> Result<()> {
        self.with_hal(id, |hal| hal.set_rx_enabled(enable))
    }

    /// Enables or disables the transmitter.
    pub fn set_enable_tx(&self, id: UartId, enable: bool) -> Result<()> {
        self.with_hal(id, |hal| hal.set_tx_enabled(enable))
    }

    /// Turns the receiver off and masks its interrupts.
    pub fn disable_rx(&self, id: UartId) -> Result<()> {
        self.with_hal(id, |hal| {
            hal.disable_interrupt(UartInterrupt::RX_TRIGGER);
            hal.set_rx_enabled(false);
        })
    }

    /// Turns the transmitter off and masks its interrupts.
    pub fn disable_tx(&self, id: UartId) -> Result<()> {
        self.with_hal(id, |hal| {
            hal.disable_interrupt(UartInterrupt::TX_TRIGGER);
            hal.set_tx_enabled(false);
        })
    }

    /// Unmasks the TX-FIFO-needs-write interrupt.
    pub fn enable_tx_interrupt(&self, id: UartId) -> Result<()> {
        self.with_hal(id, |hal| {
            self.platform.irq.enable(IntSource::Uart(id.0));
            hal.enable_interrupt(UartInterrupt::TX_FIFO_NEED_WRITE);
        })
    }

    /// Masks the TX-FIFO-needs-write interrupt and clears it if pending.
    pub fn disable_tx_interrupt(&self, id: UartId) -> Result<()> {
        self.with_hal(id, |hal| {
            hal.disable_interrupt(UartInterrupt::TX_FIFO_NEED_WRITE);
            hal.clear_interrupt_status(UartInterrupt::TX_FIFO_NEED_WRITE);
        })
    }

    /// Unmasks the receive interrupts.
    pub fn enable_rx_interrupt(&self, id: UartId) -> Result<()> {
        let mask = self.rx_interrupt_mask();
        self.with_hal(id, |hal| {
            self.platform.irq.enable(IntSource::Uart(id.0));
            hal.enable_interrupt(mask);
        })
    }

    /// Masks the receive interrupts and clears them if pending.
    pub fn disable_rx_interrupt(&self, id: UartId) -> Result<()> {
        self.with_hal(id, |hal| {
            hal.disable_interrupt(UartInterrupt::RX_TRIGGER);
            hal.clear_interrupt_status(UartInterrupt::RX_TRIGGER);
        })
    }

    fn rx_interrupt_mask(&self) -> UartInterrupt {
        let mask = UartInterrupt::RX_FIFO_NEED_READ | UartInterrupt::RX_FINISH;
        if self.config.rx_error_interrupt {
            mask | UartInterrupt::RX_ERRORS
        } else {
            mask
        }
    }

    /// Routes received bytes into the software FIFO.
    pub fn enable_sw_fifo(&self, id: UartId) -> Result<()> {
        let port = self.port_any(id)?;
        critical_section::with(|cs| port.state.borrow_ref_mut(cs).sw_fifo_enabled = true);
        Ok(())
    }

    /// Routes received bytes to the RX callback (or discards them).
    pub fn disable_sw_fifo(&self, id: UartId) -> Result<()> {
        let port = self.port_any(id)?;
        critical_section::with(|cs| port.state.borrow_ref_mut(cs).sw_fifo_enabled = false);
        Ok(())
    }

    // Callbacks

    /// Installs the RX callback, used while the software FIFO is disabled.
    pub fn register_rx_isr(&self, id: UartId, callback: Option<UartCallback>) -> Result<()> {
        let port = self.port(id)?;
        critical_section::with(|cs| port.state.borrow_ref_mut(cs).rx_callback = callback);
        Ok(())
    }

    /// Installs the TX callback.
    pub fn register_tx_isr(&self, id: UartId, callback: Option<UartCallback>) -> Result<()> {
        let port = self.port(id)?;
        critical_section::with(|cs| port.state.borrow_ref_mut(cs).tx_callback = callback);
        Ok(())
    }

    /// Takes over receive: saves the current RX callback, disables the
    /// software FIFO and installs `callback`.
    pub fn take_rx_isr(&self, id: UartId, callback: Option<UartCallback>) -> Result<()> {
        let port = self.port(id)?;
        critical_section::with(|cs| {
            let mut state = port.state.borrow_ref_mut(cs);
            state.saved_rx_callback = state.rx_callback;
            state.sw_fifo_enabled = false;
            state.rx_callback = callback;
        });
        Ok(())
    }

    /// Undoes [`UartDriver::take_rx_isr`].
    pub fn recover_rx_isr(&self, id: UartId) -> Result<()> {
        let port = self.port(id)?;
        critical_section::with(|cs| {
            let mut state = port.state.borrow_ref_mut(cs);
            state.rx_callback = state.saved_rx_callback.take();
            state.sw_fifo_enabled = true;
        });
        Ok(())
    }

    // Diagnostics

    /// Snapshot of port `id`'s receive counters.
    pub fn stats(&self, id: UartId) -> Result<UartStats> {
        Ok(self.port_any(id)?.stats.snapshot())
    }

    /// Returns true while a reader is parked waiting for data on port `id`.
    pub fn is_rx_blocked(&self, id: UartId) -> Result<bool> {
        let port = self.port_any(id)?;
        Ok(critical_section::with(|cs| port.state.borrow_ref(cs).rx_blocked))
    }

    /// The HAL instance behind port `id`.
    pub fn hal(&self, id: UartId) -> Result<&H> {
        Ok(&self.port_any(id)?.hal)
    }
}
