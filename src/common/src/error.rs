//! Error taxonomy for the UART driver.

use core::fmt;

/// Result type returned by every fallible UART driver operation.
pub type Result<T> = core::result::Result<T, UartError>;

/// UART driver error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UartError {
    /// `driver_init` was never called.
    NotInit,
    /// Port id is out of range.
    InvalidId,
    /// Port id is valid but that port was never initialized.
    IdNotInit,
    /// Baud rate outside the range derivable from the source clock.
    BaudRateNotSupported,
    /// Blocking read expired with no data.
    RxTimeout,
    /// Port has no low-voltage power domain to back up.
    LowVoltageUnsupported,
    /// No DMA channel could be allocated for receive.
    DmaUnavailable,
}

impl fmt::Display for UartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UartError::NotInit => write!(f, "uart driver not initialized"),
            UartError::InvalidId => write!(f, "uart id is invalid"),
            UartError::IdNotInit => write!(f, "uart port not initialized"),
            UartError::BaudRateNotSupported => write!(f, "baud rate not supported"),
            UartError::RxTimeout => write!(f, "uart receive timed out"),
            UartError::LowVoltageUnsupported => {
                write!(f, "port has no low-voltage backup domain")
            }
            UartError::DmaUnavailable => write!(f, "no rx dma channel available"),
        }
    }
}
