//! In-memory collaborator implementations for host tests.
//!
//! Each mock records what the driver did to it and lets the test inject
//! hardware events (received bytes, interrupt causes, DMA transfers,
//! sleep transitions).
//!
//! # Example
//!
//! ```
//! use armino_hal::mock::MockUartHal;
//! use armino_hal::UartHal;
//!
//! let uart = MockUartHal::new();
//! uart.inject_rx(b"hi");
//! assert!(uart.is_fifo_read_ready());
//! assert_eq!(uart.read_byte(), b'h');
//! ```

mod clock;
mod dma;
mod interrupt;
mod pm;
mod uart;

pub use clock::MockClock;
pub use dma::MockDma;
pub use interrupt::MockInterruptController;
pub use pm::MockPowerManager;
pub use uart::MockUartHal;
