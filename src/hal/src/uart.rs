//! Per-port UART register facade.

use armino_common::{
    DataBits, Parity, RxStopDetectTime, SourceClock, StopBits, UartConfig, UartInterrupt,
};

/// Number of 32-bit registers saved across low-voltage sleep.
pub const UART_PM_BACKUP_REG_NUM: usize = 8;

/// Register operations for one UART port.
///
/// One implementation instance owns exactly one register block.
pub trait UartHal: Sync {
    /// Programs baud rate and frame format from `config`, using a functional
    /// clock of `clk_hz`.
    fn configure(&self, clk_hz: u32, config: &UartConfig);
    /// Enables the TX and RX paths after `configure`.
    fn start(&self);
    /// Disables the TX and RX paths.
    fn stop(&self);
    /// Returns every register to its reset value.
    fn reset_to_default(&self);

    /// Gates the peripheral clock.
    fn set_clock_enabled(&self, enable: bool);
    /// Selects the baud generator clock.
    fn select_source_clock(&self, clk: SourceClock);
    /// Frequency of the currently selected functional clock.
    fn source_clock_hz(&self) -> u32;

    /// Reprograms the baud divider.
    fn set_baud_rate(&self, clk_hz: u32, baud_rate: u32);
    /// Sets data bits per frame.
    fn set_data_bits(&self, data_bits: DataBits);
    /// Sets stop bits.
    fn set_stop_bits(&self, stop_bits: StopBits);
    /// Sets parity mode.
    fn set_parity(&self, parity: Parity);

    /// RX FIFO holds at least one byte.
    fn is_fifo_read_ready(&self) -> bool;
    /// TX FIFO can accept one byte.
    fn is_fifo_write_ready(&self) -> bool;
    /// Pops one byte from the RX FIFO. Only valid when read-ready.
    fn read_byte(&self) -> u8;
    /// Pushes one byte into the TX FIFO. Only valid when write-ready.
    fn write_byte(&self, byte: u8);
    /// Number of bytes waiting in the RX FIFO.
    fn rx_fifo_count(&self) -> u32;
    /// TX FIFO and shift register are both empty.
    fn is_tx_fifo_empty(&self) -> bool;

    /// Raw interrupt status.
    fn interrupt_status(&self) -> UartInterrupt;
    /// Interrupt enable mask.
    fn interrupt_enable_status(&self) -> UartInterrupt;
    /// Write-one-to-clear of status bits.
    fn clear_interrupt_status(&self, status: UartInterrupt);
    /// Sets bits in the interrupt enable mask.
    fn enable_interrupt(&self, int: UartInterrupt);
    /// Clears bits in the interrupt enable mask.
    fn disable_interrupt(&self, int: UartInterrupt);

    /// RX FIFO level that raises `RX_FIFO_NEED_READ`.
    fn set_rx_fifo_threshold(&self, threshold: u8);
    /// TX FIFO level that raises `TX_FIFO_NEED_WRITE`.
    fn set_tx_fifo_threshold(&self, threshold: u8);
    /// Idle time that raises `RX_FINISH`.
    fn set_rx_stop_detect_time(&self, time: RxStopDetectTime);

    /// Enables or disables the receiver.
    fn set_rx_enabled(&self, enable: bool);
    /// Enables or disables the transmitter.
    fn set_tx_enabled(&self, enable: bool);

    /// Enables RTS/CTS, deasserting RTS at `rx_threshold` bytes.
    fn set_hw_flow_control(&self, rx_threshold: u8);
    /// Disables RTS/CTS.
    fn disable_hw_flow_control(&self);
    /// RTS/CTS is currently active.
    fn is_flow_control_enabled(&self) -> bool;

    /// Bus address of the RX data register, used as DMA source.
    fn rx_data_addr(&self) -> usize;

    /// Copies the configuration registers into `regs`.
    fn backup(&self, regs: &mut [u32; UART_PM_BACKUP_REG_NUM]);
    /// Writes `regs` back into the configuration registers.
    fn restore(&self, regs: &[u32; UART_PM_BACKUP_REG_NUM]);
}
