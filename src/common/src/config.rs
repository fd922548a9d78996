//! Line configuration for one UART port.

/// UART functional clock in Hz (26 MHz crystal).
pub const UART_CLOCK_HZ: u32 = 26_000_000;

/// Lowest baud rate reachable with the 13-bit divider.
pub const MIN_BAUD_RATE: u32 = UART_CLOCK_HZ / (0x1fff + 1);

/// Highest baud rate the divider supports.
pub const MAX_BAUD_RATE: u32 = UART_CLOCK_HZ / (4 + 1);

/// Returns true if `baud_rate` lies within the divider range.
#[inline]
pub const fn is_baud_rate_supported(baud_rate: u32) -> bool {
    baud_rate >= MIN_BAUD_RATE && baud_rate <= MAX_BAUD_RATE
}

/// Number of data bits per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataBits {
    /// 5 data bits.
    Five,
    /// 6 data bits.
    Six,
    /// 7 data bits.
    Seven,
    /// 8 data bits.
    #[default]
    Eight,
}

/// Parity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopBits {
    /// 1 stop bit.
    #[default]
    One,
    /// 2 stop bits.
    Two,
}

/// Hardware flow control selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlowControl {
    /// No flow control.
    #[default]
    Disabled,
    /// RTS/CTS handshake.
    RtsCts,
}

/// Functional clock source for the baud generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceClock {
    /// 26 MHz crystal.
    #[default]
    Xtal26M,
    /// Audio PLL.
    Apll,
}

/// Idle time on RX, in bit periods, before `RX_FINISH` fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RxStopDetectTime {
    /// 32 bit periods.
    #[default]
    Bits32,
    /// 64 bit periods.
    Bits64,
    /// 128 bit periods.
    Bits128,
    /// 256 bit periods.
    Bits256,
}

/// Configuration applied by `UartDriver::init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UartConfig {
    /// Baud rate in bits per second.
    pub baud_rate: u32,
    /// Data bits per frame.
    pub data_bits: DataBits,
    /// Parity mode.
    pub parity: Parity,
    /// Stop bits.
    pub stop_bits: StopBits,
    /// Hardware flow control.
    pub flow_ctrl: FlowControl,
    /// Baud generator clock source.
    pub src_clk: SourceClock,
    /// Receive through DMA instead of byte-wise ISR reads.
    pub rx_dma_enable: bool,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_ctrl: FlowControl::Disabled,
            src_clk: SourceClock::Xtal26M,
            rx_dma_enable: false,
        }
    }
}

impl UartConfig {
    /// Sets the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Sets the parity mode.
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Sets the flow control mode.
    pub fn with_flow_ctrl(mut self, flow_ctrl: FlowControl) -> Self {
        self.flow_ctrl = flow_ctrl;
        self
    }

    /// Sets the clock source.
    pub fn with_src_clk(mut self, src_clk: SourceClock) -> Self {
        self.src_clk = src_clk;
        self
    }

    /// Enables or disables DMA receive.
    pub fn with_rx_dma(mut self, enable: bool) -> Self {
        self.rx_dma_enable = enable;
        self
    }
}
