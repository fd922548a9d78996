//! DMA receive path.
//!
//! The channel copies bytes from the UART RX data register straight into
//! the software FIFO's storage, wrapping at its end. On every receive
//! interrupt the driver stops the channel, publishes what it wrote by
//! advancing the FIFO head, and restarts it.

use alloc::sync::Arc;
use core::fmt;

use armino_common::{Result, UartError};
use armino_hal::{DmaChannel, DmaConfig, DmaDevice, DmaMode, DmaPort, DmaWidth, UartHal};
use log::{error, info};

use super::port::Port;
use super::UartDriver;
use crate::fifo::RingBuffer;

fn log_on_err<E: fmt::Display>(what: &str, result: core::result::Result<(), E>) {
    if let Err(err) = result {
        error!("{}: {}", what, err);
    }
}

/// Channel configuration for receive on `port` into `fifo`.
pub(crate) fn rx_dma_config(rx_data_addr: usize, port: u8, fifo: &RingBuffer) -> DmaConfig {
    let start = fifo.as_mut_ptr() as usize;
    DmaConfig {
        src: DmaPort {
            dev: DmaDevice::UartRx(port),
            width: DmaWidth::Bits8,
            addr_inc: false,
            addr_loop: false,
            start_addr: rx_data_addr & !0x3,
            end_addr: rx_data_addr & !0x3,
        },
        dst: DmaPort {
            dev: DmaDevice::Dtcm,
            width: DmaWidth::Bits32,
            addr_inc: true,
            addr_loop: true,
            start_addr: start,
            end_addr: start + fifo.capacity(),
        },
        mode: DmaMode::Single,
        priority: 0,
    }
}

impl<H: UartHal> UartDriver<'_, H> {
    pub(super) fn rx_dma_init(&self, port: &Port<H>) -> Result<()> {
        let dma = self.platform.dma;
        let dev = DmaDevice::UartRx(port.id.0);

        let fifo = critical_section::with(|cs| {
            let mut state = port.state.borrow_ref_mut(cs);
            state.sw_fifo_enabled = true;
            state.rx_fifo.clone()
        });
        let fifo = match fifo {
            Some(fifo) => fifo,
            None => {
                let fifo = Arc::new(RingBuffer::new(self.config.dma_kfifo_size));
                critical_section::with(|cs| {
                    port.state.borrow_ref_mut(cs).rx_fifo = Some(fifo.clone());
                });
                fifo
            }
        };

        let ch = dma.alloc(dev).ok_or(UartError::DmaUnavailable)?;
        let config = rx_dma_config(port.hal.rx_data_addr(), port.id.0, &fifo);
        log_on_err("rx dma configure", dma.configure(ch, &config));
        log_on_err("rx dma transfer len", dma.set_transfer_len(ch, fifo.capacity() as u32));
        log_on_err("rx dma start", dma.start(ch));

        critical_section::with(|cs| port.state.borrow_ref_mut(cs).rx_dma = Some(ch));
        info!("{}: rx dma on channel {}, {} byte fifo", port.id, ch.0, fifo.capacity());
        Ok(())
    }

    pub(super) fn rx_dma_deinit(&self, port: &Port<H>) {
        let ch = critical_section::with(|cs| port.state.borrow_ref_mut(cs).rx_dma.take());
        if let Some(ch) = ch {
            log_on_err("rx dma stop", self.platform.dma.stop(ch));
            log_on_err("rx dma free", self.platform.dma.free(DmaDevice::UartRx(port.id.0), ch));
        }
    }

    /// Publishes the bytes the channel wrote since its last start.
    ///
    /// # Panics
    ///
    /// If the channel reports more bytes than the FIFO holds.
    pub(super) fn dma_read_fifo_frame(
        &self,
        port: &Port<H>,
        fifo: &RingBuffer,
        ch: DmaChannel,
    ) -> usize {
        let dma = self.platform.dma;
        log_on_err("rx dma stop", dma.stop(ch));

        let capacity = fifo.capacity();
        let remaining = dma.remaining_len(ch) as usize;
        let transferred = capacity.wrapping_sub(remaining);
        assert!(
            transferred <= capacity,
            "{}: rx dma reported {} bytes for a {} byte fifo",
            port.id,
            transferred,
            capacity
        );
        assert!(
            transferred <= fifo.unused(),
            "{}: rx dma overran the reader ({} new bytes, {} free)",
            port.id,
            transferred,
            fifo.unused()
        );
        fifo.advance_head(transferred);
        port.stats.record_put_bulk(transferred);

        log_on_err("rx dma start", dma.start(ch));
        transferred
    }
}
