//! DMA channel allocator interface.

use core::fmt;

/// Handle to an allocated DMA channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DmaChannel(pub u8);

/// Peripheral or memory endpoint of a DMA transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DmaDevice {
    /// Tightly coupled data memory.
    Dtcm,
    /// UART transmit request line, by port index.
    UartTx(u8),
    /// UART receive request line, by port index.
    UartRx(u8),
}

/// Bus width of one DMA beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DmaWidth {
    /// 8-bit.
    Bits8,
    /// 16-bit.
    Bits16,
    /// 32-bit.
    Bits32,
}

/// Transfer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DmaMode {
    /// Stop after one transfer length.
    Single,
    /// Restart automatically.
    Repeat,
}

/// One side of a DMA transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaPort {
    /// Request line or memory type.
    pub dev: DmaDevice,
    /// Beat width.
    pub width: DmaWidth,
    /// Increment the address after each beat.
    pub addr_inc: bool,
    /// Wrap from `end_addr` back to `start_addr`.
    pub addr_loop: bool,
    /// First address of the region.
    pub start_addr: usize,
    /// One past the last address of the region.
    pub end_addr: usize,
}

/// Channel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaConfig {
    /// Source endpoint.
    pub src: DmaPort,
    /// Destination endpoint.
    pub dst: DmaPort,
    /// Transfer mode.
    pub mode: DmaMode,
    /// Channel priority, 0 is lowest.
    pub priority: u8,
}

/// DMA collaborator errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaError {
    /// Channel handle does not name an allocated channel.
    InvalidChannel,
    /// Configuration rejected by the controller.
    InvalidConfig,
    /// Channel is owned by another device.
    NotOwner,
}

impl fmt::Display for DmaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DmaError::InvalidChannel => write!(f, "invalid dma channel"),
            DmaError::InvalidConfig => write!(f, "invalid dma configuration"),
            DmaError::NotOwner => write!(f, "dma channel owned by another device"),
        }
    }
}

/// DMA controller operations.
pub trait DmaController: Sync {
    /// Allocates a free channel for `dev`.
    fn alloc(&self, dev: DmaDevice) -> Option<DmaChannel>;
    /// Applies `config` to `ch`.
    fn configure(&self, ch: DmaChannel, config: &DmaConfig) -> Result<(), DmaError>;
    /// Sets the transfer length in bytes.
    fn set_transfer_len(&self, ch: DmaChannel, len: u32) -> Result<(), DmaError>;
    /// Starts the channel; the remaining length reloads to the transfer length.
    fn start(&self, ch: DmaChannel) -> Result<(), DmaError>;
    /// Stops the channel, keeping the remaining length.
    fn stop(&self, ch: DmaChannel) -> Result<(), DmaError>;
    /// Bytes left before the current transfer completes.
    fn remaining_len(&self, ch: DmaChannel) -> u32;
    /// Forces any bytes still held by the source peripheral into the channel.
    fn flush_src_buffer(&self, ch: DmaChannel);
    /// Releases `ch`, previously allocated for `dev`.
    fn free(&self, dev: DmaDevice, ch: DmaChannel) -> Result<(), DmaError>;
}
