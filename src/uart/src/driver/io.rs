//! Data path: blocking read and polled write.

use armino_common::{Result, UartError, UartId};
use armino_hal::UartHal;
use log::{debug, warn};

use super::port::Port;
use super::UartDriver;
use crate::fifo::RingBuffer;

impl<H: UartHal> UartDriver<'_, H> {
    /// Writes `data` to port `id`, spinning while the TX FIFO is full.
    pub fn write_bytes(&self, id: UartId, data: &[u8]) -> Result<()> {
        let port = self.port_initialized(id)?;
        self.pm_check_restore(port);
        for &byte in data {
            Self::write_byte(&port.hal, byte);
        }
        Ok(())
    }

    /// Writes `s`, expanding a bare `\n` to `\r\n`.
    pub fn write_string(&self, id: UartId, s: &str) -> Result<()> {
        let port = self.port_initialized(id)?;
        self.pm_check_restore(port);
        let mut prev = 0u8;
        for byte in s.bytes() {
            if byte == b'\n' && prev != b'\r' {
                Self::write_byte(&port.hal, b'\r');
            }
            Self::write_byte(&port.hal, byte);
            prev = byte;
        }
        Ok(())
    }

    fn write_byte(hal: &H, byte: u8) {
        while !hal.is_fifo_write_ready() {
            core::hint::spin_loop();
        }
        hal.write_byte(byte);
    }

    /// Reads up to `buf.len()` bytes from port `id`.
    ///
    /// With the software FIFO enabled, blocks until at least one byte has
    /// been buffered or `timeout_ms` elapses ([`crate::WAIT_FOREVER`] waits
    /// indefinitely, 0 does not wait). Returns the number of bytes copied,
    /// or [`UartError::RxTimeout`].
    ///
    /// With the software FIFO disabled, copies whatever the hardware FIFO
    /// holds without waiting.
    pub fn read_bytes(&self, id: UartId, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
        let port = self.port_initialized(id)?;
        self.pm_check_restore(port);

        let fifo = critical_section::with(|cs| {
            let state = port.state.borrow_ref(cs);
            state.rx_fifo.clone().filter(|_| state.sw_fifo_enabled)
        });
        match fifo {
            Some(fifo) => self.read_from_fifo(port, &fifo, buf, timeout_ms),
            None => Ok(Self::read_from_hw(&port.hal, buf)),
        }
    }

    fn read_from_fifo(
        &self,
        port: &Port<H>,
        fifo: &RingBuffer,
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> Result<usize> {
        let must_wait = critical_section::with(|cs| {
            if fifo.is_empty() {
                port.state.borrow_ref_mut(cs).rx_blocked = true;
                true
            } else {
                false
            }
        });

        if must_wait && !port.rx_sema.acquire_timeout(timeout_ms, self.platform.clock) {
            critical_section::with(|cs| {
                let mut state = port.state.borrow_ref_mut(cs);
                if !state.rx_blocked {
                    // Woken after the deadline passed: consume the stale permit.
                    let _ = port.rx_sema.try_acquire();
                }
                state.rx_blocked = false;
            });
            port.stats.record_timeout();
            warn!("{}: rx timeout after {}ms", port.id, timeout_ms);
            return Err(UartError::RxTimeout);
        }

        let copied = critical_section::with(|_| {
            let len = buf.len().min(fifo.len());
            fifo.get(&mut buf[..len])
        });
        if copied == 0 {
            port.stats.record_empty();
            debug!("{}: rx fifo empty", port.id);
        }
        Ok(copied)
    }

    fn read_from_hw(hal: &H, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() && hal.is_fifo_read_ready() {
            buf[n] = hal.read_byte();
            n += 1;
        }
        n
    }

    /// Reads one byte straight from the hardware RX FIFO, if one is ready.
    pub fn read_byte(&self, id: UartId) -> Result<Option<u8>> {
        self.with_hal(id, |hal| hal.is_fifo_read_ready().then(|| hal.read_byte()))
    }

    /// Returns true if the hardware RX FIFO holds data.
    pub fn read_ready(&self, id: UartId) -> Result<bool> {
        self.with_hal(id, |hal| hal.is_fifo_read_ready())
    }

    /// Returns true if the hardware TX FIFO has room.
    pub fn write_ready(&self, id: UartId) -> Result<bool> {
        self.with_hal(id, |hal| hal.is_fifo_write_ready())
    }

    /// Returns true once every queued byte has left the transmitter.
    pub fn is_tx_over(&self, id: UartId) -> Result<bool> {
        self.with_hal(id, |hal| hal.is_tx_fifo_empty())
    }

    /// Number of bytes waiting in the software FIFO.
    pub fn length_in_buffer(&self, id: UartId) -> Result<usize> {
        let port = self.port(id)?;
        let fifo = critical_section::with(|cs| port.state.borrow_ref(cs).rx_fifo.clone());
        Ok(fifo.map(|fifo| fifo.len()).unwrap_or(0))
    }
}
