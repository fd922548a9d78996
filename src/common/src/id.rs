//! Port identity.

use core::fmt;

/// Number of UART ports in one SoC unit.
pub const UART_PORT_COUNT: usize = 3;

/// Identifies one physical UART port.
///
/// Any `u8` can be wrapped; the driver rejects ids at or above
/// [`UART_PORT_COUNT`] with [`UartError::InvalidId`](crate::UartError::InvalidId).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UartId(pub u8);

impl UartId {
    /// First UART (console on most boards).
    pub const UART0: UartId = UartId(0);
    /// Second UART.
    pub const UART1: UartId = UartId(1);
    /// Third UART.
    pub const UART2: UartId = UartId(2);

    /// Table index for this port.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns true if the id names a port that exists on this SoC.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.index() < UART_PORT_COUNT
    }
}

impl From<u8> for UartId {
    fn from(id: u8) -> Self {
        UartId(id)
    }
}

impl fmt::Display for UartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uart{}", self.0)
    }
}
