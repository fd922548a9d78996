//! Mock DMA controller.

use alloc::vec::Vec;
use spin::Mutex;

use crate::{DmaChannel, DmaConfig, DmaController, DmaDevice, DmaError};

#[derive(Debug, Clone, Copy)]
struct Channel {
    dev: DmaDevice,
    config: Option<DmaConfig>,
    transfer_len: u32,
    remaining: u32,
    running: bool,
    write_offset: usize,
}

#[derive(Debug)]
struct State {
    channels: Vec<Option<Channel>>,
    flushes: u32,
    starts: u32,
}

/// DMA controller with a fixed number of channels.
///
/// Transfers are simulated with [`transfer`](Self::transfer), which writes
/// straight into the configured destination region the way the engine would.
#[derive(Debug)]
pub struct MockDma {
    state: Mutex<State>,
}

impl MockDma {
    /// Creates a controller with `channels` free channels.
    pub fn new(channels: usize) -> Self {
        Self {
            state: Mutex::new(State {
                channels: alloc::vec![None; channels],
                flushes: 0,
                starts: 0,
            }),
        }
    }

    /// Configuration applied to `ch`.
    pub fn config(&self, ch: DmaChannel) -> Option<DmaConfig> {
        self.channel(ch).and_then(|c| c.config)
    }

    /// True if `ch` is allocated.
    pub fn is_allocated(&self, ch: DmaChannel) -> bool {
        self.channel(ch).is_some()
    }

    /// True if `ch` is started.
    pub fn is_running(&self, ch: DmaChannel) -> bool {
        self.channel(ch).is_some_and(|c| c.running)
    }

    /// Number of allocated channels.
    pub fn allocated(&self) -> usize {
        self.state.lock().channels.iter().flatten().count()
    }

    /// Number of `flush_src_buffer` calls.
    pub fn flush_count(&self) -> u32 {
        self.state.lock().flushes
    }

    /// Number of `start` calls across all channels.
    pub fn start_count(&self) -> u32 {
        self.state.lock().starts
    }

    /// Overrides the remaining-length register of `ch`.
    pub fn force_remaining(&self, ch: DmaChannel, remaining: u32) {
        if let Some(Some(c)) = self.state.lock().channels.get_mut(ch.0 as usize) {
            c.remaining = remaining;
        }
    }

    /// Moves `data` into the destination region of `ch`, wrapping at its end.
    ///
    /// # Safety
    ///
    /// The destination region configured on `ch` must be valid for writes
    /// for its whole length and not be concurrently accessed through a
    /// reference for the same bytes.
    pub unsafe fn transfer(&self, ch: DmaChannel, data: &[u8]) {
        let mut st = self.state.lock();
        let Some(Some(c)) = st.channels.get_mut(ch.0 as usize) else {
            return;
        };
        let Some(config) = c.config else {
            return;
        };
        let region = config.dst.end_addr - config.dst.start_addr;
        if region == 0 {
            return;
        }
        for &byte in data {
            let addr = config.dst.start_addr + c.write_offset;
            // SAFETY: `addr` lies inside the destination region, which the
            // caller guarantees is writable.
            unsafe { core::ptr::write_volatile(addr as *mut u8, byte) };
            c.write_offset = (c.write_offset + 1) % region;
        }
        c.remaining = c.remaining.saturating_sub(data.len() as u32);
    }

    fn channel(&self, ch: DmaChannel) -> Option<Channel> {
        self.state.lock().channels.get(ch.0 as usize).copied().flatten()
    }
}

impl DmaController for MockDma {
    fn alloc(&self, dev: DmaDevice) -> Option<DmaChannel> {
        let mut st = self.state.lock();
        let idx = st.channels.iter().position(Option::is_none)?;
        st.channels[idx] = Some(Channel {
            dev,
            config: None,
            transfer_len: 0,
            remaining: 0,
            running: false,
            write_offset: 0,
        });
        Some(DmaChannel(idx as u8))
    }

    fn configure(&self, ch: DmaChannel, config: &DmaConfig) -> Result<(), DmaError> {
        if config.dst.end_addr < config.dst.start_addr {
            return Err(DmaError::InvalidConfig);
        }
        let mut st = self.state.lock();
        let c = st
            .channels
            .get_mut(ch.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(DmaError::InvalidChannel)?;
        c.config = Some(*config);
        c.write_offset = 0;
        Ok(())
    }

    fn set_transfer_len(&self, ch: DmaChannel, len: u32) -> Result<(), DmaError> {
        let mut st = self.state.lock();
        let c = st
            .channels
            .get_mut(ch.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(DmaError::InvalidChannel)?;
        c.transfer_len = len;
        c.remaining = len;
        Ok(())
    }

    fn start(&self, ch: DmaChannel) -> Result<(), DmaError> {
        let mut st = self.state.lock();
        st.starts += 1;
        let c = st
            .channels
            .get_mut(ch.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(DmaError::InvalidChannel)?;
        c.running = true;
        c.remaining = c.transfer_len;
        Ok(())
    }

    fn stop(&self, ch: DmaChannel) -> Result<(), DmaError> {
        let mut st = self.state.lock();
        let c = st
            .channels
            .get_mut(ch.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(DmaError::InvalidChannel)?;
        c.running = false;
        Ok(())
    }

    fn remaining_len(&self, ch: DmaChannel) -> u32 {
        self.channel(ch).map_or(0, |c| c.remaining)
    }

    fn flush_src_buffer(&self, _ch: DmaChannel) {
        self.state.lock().flushes += 1;
    }

    fn free(&self, dev: DmaDevice, ch: DmaChannel) -> Result<(), DmaError> {
        let mut st = self.state.lock();
        let slot = st
            .channels
            .get_mut(ch.0 as usize)
            .ok_or(DmaError::InvalidChannel)?;
        match slot {
            Some(c) if c.dev == dev => {
                *slot = None;
                Ok(())
            }
            Some(_) => Err(DmaError::NotOwner),
            None => Err(DmaError::InvalidChannel),
        }
    }
}
