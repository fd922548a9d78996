//! Per-port receive counters.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// Snapshot of a port's receive counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UartStats {
    /// Interrupts serviced.
    pub isr_count: u32,
    /// Interrupts that carried a receive cause.
    pub rx_isr_count: u32,
    /// Bytes stored into the software FIFO by the interrupt handler.
    pub fifo_put_count: u32,
    /// Bytes lost to a full software FIFO while flow control was off.
    /// Saturates.
    pub fifo_full_count: u32,
    /// Blocking reads that timed out.
    pub rx_timeout_count: u32,
    /// Reads that found the FIFO empty after a wake-up.
    pub fifo_empty_count: u32,
    /// Hardware RX FIFO level seen by the last receive interrupt.
    pub rx_fifo_count: u32,
    /// Last byte stored by the interrupt handler.
    pub last_value: u8,
}

#[derive(Debug, Default)]
pub(crate) struct PortStats {
    isr: AtomicU32,
    rx_isr: AtomicU32,
    put: AtomicU32,
    full: AtomicU32,
    rx_timeout: AtomicU32,
    empty: AtomicU32,
    rx_fifo: AtomicU32,
    last_value: AtomicU8,
}

impl PortStats {
    pub(crate) fn record_isr(&self) {
        self.isr.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rx_isr(&self, hw_fifo_level: u32) {
        self.rx_isr.fetch_add(1, Ordering::Relaxed);
        self.rx_fifo.store(hw_fifo_level, Ordering::Relaxed);
    }

    pub(crate) fn record_put(&self, byte: u8) {
        self.put.fetch_add(1, Ordering::Relaxed);
        self.last_value.store(byte, Ordering::Relaxed);
    }

    pub(crate) fn record_put_bulk(&self, count: usize) {
        self.put.fetch_add(count as u32, Ordering::Relaxed);
    }

    pub(crate) fn record_full(&self) {
        let _ = self
            .full
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1));
    }

    pub(crate) fn record_timeout(&self) {
        self.rx_timeout.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_empty(&self) {
        self.empty.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> UartStats {
        UartStats {
            isr_count: self.isr.load(Ordering::Relaxed),
            rx_isr_count: self.rx_isr.load(Ordering::Relaxed),
            fifo_put_count: self.put.load(Ordering::Relaxed),
            fifo_full_count: self.full.load(Ordering::Relaxed),
            rx_timeout_count: self.rx_timeout.load(Ordering::Relaxed),
            fifo_empty_count: self.empty.load(Ordering::Relaxed),
            rx_fifo_count: self.rx_fifo.load(Ordering::Relaxed),
            last_value: self.last_value.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        for counter in [
            &self.isr,
            &self.rx_isr,
            &self.put,
            &self.full,
            &self.rx_timeout,
            &self.empty,
            &self.rx_fifo,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.last_value.store(0, Ordering::Relaxed);
    }
}
