//! Interrupt dispatch.

use armino_common::{UartId, UartInterrupt};
use armino_hal::UartHal;
use critical_section::CriticalSection;
use log::{debug, warn};

use super::port::{Port, RxConsumer};
use super::UartDriver;
use crate::fifo::RingBuffer;

impl<H: UartHal> UartDriver<'_, H> {
    /// Services a pending interrupt on port `id`.
    ///
    /// Call from the service routine installed for that port. Ids out of
    /// range are ignored.
    pub fn handle_interrupt(&self, id: UartId) {
        let Some(port) = self.ports.get(id.index()) else {
            return;
        };
        critical_section::with(|cs| self.isr_common(cs, port));
    }

    fn isr_common(&self, cs: CriticalSection<'_>, port: &Port<H>) {
        let hal = &port.hal;
        let int_status = hal.interrupt_status();
        let status = int_status & hal.interrupt_enable_status();
        hal.clear_interrupt_status(int_status);
        port.stats.record_isr();

        if status.is_rx_triggered() {
            if int_status.has_rx_error() {
                self.discard_on_rx_error(cs, port, int_status);
            }
            port.stats.record_rx_isr(hal.rx_fifo_count());

            let consumer = port.state.borrow_ref(cs).rx_consumer();
            match consumer {
                RxConsumer::SoftwareFifo { fifo, dma } => {
                    let stored = match dma {
                        Some(ch) => {
                            self.platform.dma.flush_src_buffer(ch);
                            self.dma_read_fifo_frame(port, &fifo, ch)
                        }
                        None => Self::read_fifo_frame(port, &fifo),
                    };
                    if stored > 0 {
                        port.wake_reader(cs);
                    }
                }
                RxConsumer::Callback(callback) => callback(port.id),
                RxConsumer::Discard => {
                    port.drain_hw_fifo();
                }
            }
        }

        if status.is_tx_triggered() {
            let callback = port.state.borrow_ref(cs).tx_callback;
            if let Some(callback) = callback {
                callback(port.id);
            }
        }
    }

    /// Drops everything received up to and including the frame that
    /// carried a line error.
    fn discard_on_rx_error(&self, cs: CriticalSection<'_>, port: &Port<H>, int_status: UartInterrupt) {
        let errors = int_status & UartInterrupt::RX_ERRORS;
        let (fifo, dma) = {
            let state = port.state.borrow_ref(cs);
            (state.rx_fifo.clone(), state.rx_dma)
        };
        match (fifo, dma) {
            (Some(fifo), Some(ch)) => {
                // Publish the frame first so the write cursor stays on the
                // DMA engine's position, then drop it with everything else.
                self.platform.dma.flush_src_buffer(ch);
                self.dma_read_fifo_frame(port, &fifo, ch);
                let dropped = fifo.discard();
                warn!("{}: rx error {:?}, dropped {} buffered bytes", port.id, errors, dropped);
            }
            _ => {
                let dropped = port.drain_hw_fifo();
                warn!("{}: rx error {:?}, drained {} bytes", port.id, errors, dropped);
            }
        }
    }

    /// Moves bytes from the hardware RX FIFO into the software FIFO.
    ///
    /// Returns the number of bytes stored. Bytes that find the software
    /// FIFO full are lost, and counted only when flow control is off.
    fn read_fifo_frame(port: &Port<H>, fifo: &RingBuffer) -> usize {
        let hal = &port.hal;
        let mut stored = 0;
        while hal.is_fifo_read_ready() {
            let byte = hal.read_byte();
            if fifo.unused() == 0 {
                if !hal.is_flow_control_enabled() {
                    port.stats.record_full();
                    warn!("{}: rx fifo full, dropped {:#04x}", port.id, byte);
                }
                continue;
            }
            stored += fifo.put(&[byte]);
            port.stats.record_put(byte);
        }
        if stored > 0 {
            debug!("{}: rx {} bytes", port.id, stored);
        }
        stored
    }
}
