//! Armino Hardware Abstraction Layer (HAL) traits.
//!
//! This crate defines the collaborators the UART driver is written against:
//! per-port register access, the DMA channel allocator, the power manager,
//! the interrupt controller and a tick source. Board support code provides
//! the real implementations; the `mock` feature provides in-memory ones for
//! host tests.
//!
//! All trait methods take `&self`. Register blocks are shared between task
//! and interrupt context, so implementations use volatile MMIO or interior
//! mutability rather than exclusive borrows.

#![no_std]

#[cfg(feature = "mock")]
extern crate alloc;

pub mod dma;
pub mod pm;
pub mod uart;

#[cfg(feature = "mock")]
pub mod mock;

pub use dma::{DmaChannel, DmaConfig, DmaController, DmaDevice, DmaError, DmaMode, DmaPort, DmaWidth};
pub use pm::{PmAction, PmDeviceId, PmHandler, PmHook, PmMode, PowerManager, PowerModule};
pub use uart::{UartHal, UART_PM_BACKUP_REG_NUM};

/// Interrupt sources routed through the interrupt controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntSource {
    /// UART port interrupt, by port index.
    Uart(u8),
}

/// Trait for controlling interrupts.
pub trait InterruptController: Sync {
    /// Installs `handler` as the service routine for `source`.
    fn register_isr(&self, source: IntSource, handler: fn());
    /// Unmasks `source` at the controller.
    fn enable(&self, source: IntSource);
    /// Masks `source` at the controller.
    fn disable(&self, source: IntSource);
}

/// Trait for a system timer.
pub trait Timer: Sync {
    /// Returns the number of ticks since the system started.
    fn current_ticks(&self) -> u64;
    /// Tick frequency in Hz.
    fn tick_hz(&self) -> u32;

    /// Converts milliseconds into ticks of this timer.
    fn ms_to_ticks(&self, ms: u32) -> u64 {
        u64::from(ms) * u64::from(self.tick_hz()) / 1000
    }
}
