//! Per-port driver state.

use alloc::sync::Arc;
use core::cell::RefCell;

use armino_common::UartId;
use armino_hal::{DmaChannel, UartHal, UART_PM_BACKUP_REG_NUM};
use critical_section::{CriticalSection, Mutex};

use crate::fifo::RingBuffer;
use crate::stats::PortStats;
use crate::sync::Semaphore;

/// Callback invoked from interrupt context with the port that fired.
pub type UartCallback = &'static (dyn Fn(UartId) + Send + Sync);

/// Mutable state shared between task and interrupt context.
///
/// Only touched inside a critical section.
#[derive(Default)]
pub(crate) struct PortState {
    pub initialized: bool,
    pub sw_fifo_enabled: bool,
    pub rx_fifo: Option<Arc<RingBuffer>>,
    pub rx_dma: Option<DmaChannel>,
    /// A reader is parked on the semaphore.
    pub rx_blocked: bool,
    pub rx_callback: Option<UartCallback>,
    pub tx_callback: Option<UartCallback>,
    /// Callback displaced by `take_rx_isr`.
    pub saved_rx_callback: Option<UartCallback>,
    /// Low-voltage register snapshot; `Some` while a backup is outstanding.
    pub pm_backup: Option<[u32; UART_PM_BACKUP_REG_NUM]>,
}

/// Where received bytes go when the receive interrupt fires.
pub(crate) enum RxConsumer {
    SoftwareFifo { fifo: Arc<RingBuffer>, dma: Option<DmaChannel> },
    Callback(UartCallback),
    Discard,
}

impl PortState {
    pub fn rx_consumer(&self) -> RxConsumer {
        if self.sw_fifo_enabled {
            if let Some(fifo) = &self.rx_fifo {
                return RxConsumer::SoftwareFifo {
                    fifo: fifo.clone(),
                    dma: self.rx_dma,
                };
            }
        }
        match self.rx_callback {
            Some(cb) => RxConsumer::Callback(cb),
            None => RxConsumer::Discard,
        }
    }
}

pub(crate) struct Port<H> {
    pub id: UartId,
    pub hal: H,
    pub state: Mutex<RefCell<PortState>>,
    /// Binary semaphore a blocked reader waits on.
    pub rx_sema: Semaphore,
    pub stats: PortStats,
}

impl<H: UartHal> Port<H> {
    pub fn new(id: UartId, hal: H) -> Self {
        Self {
            id,
            hal,
            state: Mutex::new(RefCell::new(PortState::default())),
            rx_sema: Semaphore::with_max(0, 1),
            stats: PortStats::default(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).initialized)
    }

    /// Hands the semaphore to a parked reader, if any.
    pub fn wake_reader(&self, cs: CriticalSection<'_>) {
        let mut state = self.state.borrow_ref_mut(cs);
        if state.rx_blocked {
            self.rx_sema.release();
            state.rx_blocked = false;
        }
    }

    /// Drains the hardware RX FIFO, returning the number of bytes dropped.
    pub fn drain_hw_fifo(&self) -> usize {
        let mut drained = 0;
        while self.hal.is_fifo_read_ready() {
            let _ = self.hal.read_byte();
            drained += 1;
        }
        drained
    }
}
