//! UART interrupt status and enable bits.

use bitflags::bitflags;

bitflags! {
    /// Bits of the UART interrupt enable and status registers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct UartInterrupt: u32 {
        /// TX FIFO dropped below the empty threshold.
        const TX_FIFO_NEED_WRITE = 1 << 0;
        /// RX FIFO reached the full threshold.
        const RX_FIFO_NEED_READ  = 1 << 1;
        /// RX FIFO overflow.
        const RX_FIFO_OVERFLOW   = 1 << 2;
        /// RX parity error.
        const RX_PARITY_ERR      = 1 << 3;
        /// RX stop bit (framing) error.
        const RX_STOP_ERR        = 1 << 4;
        /// TX path finished.
        const TX_FINISH          = 1 << 5;
        /// RX line idle for the stop-detect time.
        const RX_FINISH          = 1 << 6;
        /// Wakeup on RXD edge.
        const RXD_WAKEUP         = 1 << 7;

        /// The three receive error causes.
        const RX_ERRORS = Self::RX_FIFO_OVERFLOW.bits()
            | Self::RX_PARITY_ERR.bits()
            | Self::RX_STOP_ERR.bits();
        /// Causes that route to the receive path of the dispatcher.
        const RX_TRIGGER = Self::RX_FIFO_NEED_READ.bits()
            | Self::RX_FINISH.bits()
            | Self::RX_ERRORS.bits();
        /// Causes that route to the transmit callback.
        const TX_TRIGGER = Self::TX_FIFO_NEED_WRITE.bits();
    }
}

impl UartInterrupt {
    /// Returns true if any receive cause is asserted.
    #[inline]
    pub fn is_rx_triggered(self) -> bool {
        self.intersects(Self::RX_TRIGGER)
    }

    /// Returns true if the transmit FIFO wants more data.
    #[inline]
    pub fn is_tx_triggered(self) -> bool {
        self.intersects(Self::TX_TRIGGER)
    }

    /// Returns true if any receive error bit is asserted.
    #[inline]
    pub fn has_rx_error(self) -> bool {
        self.intersects(Self::RX_ERRORS)
    }
}
