//! Armino UART driver
//!
//! Interrupt-driven receive buffering for the SoC's UART ports, written
//! against the collaborator traits in `armino-hal`.
//!
//! # Architecture
//!
//! - `fifo`: single-producer/single-consumer byte ring buffer shared between
//!   the interrupt handler (producer) and the reading task (consumer)
//! - `sync`: counting semaphore the reading task parks on
//! - `stats`: per-port receive counters
//! - `driver`: the [`UartDriver`] context: port table, interrupt dispatch,
//!   DMA receive, blocking reads and power-manager hooks
//!
//! # Execution contexts
//!
//! [`UartDriver::handle_interrupt`] runs in interrupt context. Everything
//! else runs in task context and takes a `critical_section` only around
//! cursor and flag inspection.

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod driver;
pub mod fifo;
pub mod stats;
pub mod sync;

pub use armino_common::{Result, UartConfig, UartError, UartId, UART_PORT_COUNT};
pub use driver::{DriverConfig, Platform, UartCallback, UartDriver};
pub use stats::UartStats;
pub use sync::WAIT_FOREVER;
