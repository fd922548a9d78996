//! Types shared between the Armino UART HAL traits and the UART driver.
//!
//! Nothing in here touches hardware: port identities, line configuration,
//! interrupt-status bits and the driver error taxonomy.

#![no_std]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod id;
pub mod int;

pub use config::{
    DataBits, FlowControl, Parity, RxStopDetectTime, SourceClock, StopBits, UartConfig,
};
pub use error::{Result, UartError};
pub use id::{UartId, UART_PORT_COUNT};
pub use int::UartInterrupt;
