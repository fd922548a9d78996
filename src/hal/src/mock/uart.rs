//! Mock UART register block.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use spin::Mutex;

use armino_common::{
    DataBits, Parity, RxStopDetectTime, SourceClock, StopBits, UartConfig, UartInterrupt,
};

use crate::{UartHal, UART_PM_BACKUP_REG_NUM};

/// Fake RX data register address handed to the DMA engine.
const MOCK_RX_DATA_ADDR: usize = 0x4480_2008;

#[derive(Debug, Clone)]
struct Registers {
    clock_enabled: bool,
    src_clk: SourceClock,
    started: bool,
    baud_rate: u32,
    data_bits: DataBits,
    parity: Parity,
    stop_bits: StopBits,
    int_enable: UartInterrupt,
    rx_threshold: u8,
    tx_threshold: u8,
    stop_detect: RxStopDetectTime,
    rx_enabled: bool,
    tx_enabled: bool,
    flow_ctrl: Option<u8>,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            clock_enabled: false,
            src_clk: SourceClock::Xtal26M,
            started: false,
            baud_rate: 0,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            int_enable: UartInterrupt::empty(),
            rx_threshold: 0,
            tx_threshold: 0,
            stop_detect: RxStopDetectTime::Bits32,
            rx_enabled: false,
            tx_enabled: false,
            flow_ctrl: None,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    regs: Registers,
    int_status: UartInterrupt,
    rx_fifo: VecDeque<u8>,
    tx: Vec<u8>,
    tx_busy_polls: u32,
    tx_empty_polls: u32,
    write_busy_polls: u32,
    backups: u32,
    restores: u32,
}

/// UART register block backed by plain memory.
///
/// Received bytes are injected with [`inject_rx`](Self::inject_rx); written
/// bytes accumulate in [`tx_data`](Self::tx_data).
#[derive(Debug, Default)]
pub struct MockUartHal {
    state: Mutex<State>,
}

impl MockUartHal {
    /// Creates a register block in its reset state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes bytes into the RX FIFO and raises `RX_FIFO_NEED_READ`.
    pub fn inject_rx(&self, data: &[u8]) {
        let mut st = self.state.lock();
        st.rx_fifo.extend(data.iter().copied());
        st.int_status |= UartInterrupt::RX_FIFO_NEED_READ;
    }

    /// Raises arbitrary status bits.
    pub fn raise(&self, int: UartInterrupt) {
        self.state.lock().int_status |= int;
    }

    /// Current raw status without side effects.
    pub fn pending(&self) -> UartInterrupt {
        self.state.lock().int_status
    }

    /// Bytes written to the TX FIFO so far.
    pub fn tx_data(&self) -> Vec<u8> {
        self.state.lock().tx.clone()
    }

    /// Makes the next `polls` calls to `is_tx_fifo_empty` report busy.
    pub fn set_tx_busy_polls(&self, polls: u32) {
        self.state.lock().tx_busy_polls = polls;
    }

    /// Number of times `is_tx_fifo_empty` was polled.
    pub fn tx_empty_polls(&self) -> u32 {
        self.state.lock().tx_empty_polls
    }

    /// Makes the next `polls` calls to `is_fifo_write_ready` report full.
    pub fn set_write_busy_polls(&self, polls: u32) {
        self.state.lock().write_busy_polls = polls;
    }

    /// Number of register snapshots taken.
    pub fn backup_count(&self) -> u32 {
        self.state.lock().backups
    }

    /// Number of register restores performed.
    pub fn restore_count(&self) -> u32 {
        self.state.lock().restores
    }

    /// Programmed baud rate.
    pub fn baud_rate(&self) -> u32 {
        self.state.lock().regs.baud_rate
    }

    /// Programmed parity.
    pub fn parity(&self) -> Parity {
        self.state.lock().regs.parity
    }

    /// Selected clock source.
    pub fn src_clk(&self) -> SourceClock {
        self.state.lock().regs.src_clk
    }

    /// Peripheral clock gate state.
    pub fn is_clock_enabled(&self) -> bool {
        self.state.lock().regs.clock_enabled
    }

    /// `start` was called more recently than `stop`.
    pub fn is_started(&self) -> bool {
        self.state.lock().regs.started
    }

    /// Receiver enable state.
    pub fn is_rx_enabled(&self) -> bool {
        self.state.lock().regs.rx_enabled
    }

    /// Transmitter enable state.
    pub fn is_tx_enabled(&self) -> bool {
        self.state.lock().regs.tx_enabled
    }

    /// Programmed RX FIFO threshold.
    pub fn rx_threshold(&self) -> u8 {
        self.state.lock().regs.rx_threshold
    }

    /// Programmed TX FIFO threshold.
    pub fn tx_threshold(&self) -> u8 {
        self.state.lock().regs.tx_threshold
    }

    /// Programmed RX stop-detect time.
    pub fn stop_detect_time(&self) -> RxStopDetectTime {
        self.state.lock().regs.stop_detect
    }

    /// Simulates the register contents being lost in sleep.
    pub fn lose_power(&self) {
        self.state.lock().regs = Registers::default();
    }

    fn clock_hz(src_clk: SourceClock) -> u32 {
        match src_clk {
            SourceClock::Xtal26M => armino_common::config::UART_CLOCK_HZ,
            SourceClock::Apll => 120_000_000,
        }
    }
}

impl UartHal for MockUartHal {
    fn configure(&self, _clk_hz: u32, config: &UartConfig) {
        let mut st = self.state.lock();
        st.regs.baud_rate = config.baud_rate;
        st.regs.data_bits = config.data_bits;
        st.regs.parity = config.parity;
        st.regs.stop_bits = config.stop_bits;
    }

    fn start(&self) {
        let mut st = self.state.lock();
        st.regs.started = true;
        st.regs.rx_enabled = true;
        st.regs.tx_enabled = true;
    }

    fn stop(&self) {
        let mut st = self.state.lock();
        st.regs.started = false;
        st.regs.rx_enabled = false;
        st.regs.tx_enabled = false;
    }

    fn reset_to_default(&self) {
        let mut st = self.state.lock();
        let clock_enabled = st.regs.clock_enabled;
        st.regs = Registers {
            clock_enabled,
            ..Registers::default()
        };
        st.int_status = UartInterrupt::empty();
    }

    fn set_clock_enabled(&self, enable: bool) {
        self.state.lock().regs.clock_enabled = enable;
    }

    fn select_source_clock(&self, clk: SourceClock) {
        self.state.lock().regs.src_clk = clk;
    }

    fn source_clock_hz(&self) -> u32 {
        Self::clock_hz(self.state.lock().regs.src_clk)
    }

    fn set_baud_rate(&self, _clk_hz: u32, baud_rate: u32) {
        self.state.lock().regs.baud_rate = baud_rate;
    }

    fn set_data_bits(&self, data_bits: DataBits) {
        self.state.lock().regs.data_bits = data_bits;
    }

    fn set_stop_bits(&self, stop_bits: StopBits) {
        self.state.lock().regs.stop_bits = stop_bits;
    }

    fn set_parity(&self, parity: Parity) {
        self.state.lock().regs.parity = parity;
    }

    fn is_fifo_read_ready(&self) -> bool {
        !self.state.lock().rx_fifo.is_empty()
    }

    fn is_fifo_write_ready(&self) -> bool {
        let mut st = self.state.lock();
        if st.write_busy_polls > 0 {
            st.write_busy_polls -= 1;
            return false;
        }
        true
    }

    fn read_byte(&self) -> u8 {
        self.state.lock().rx_fifo.pop_front().unwrap_or(0)
    }

    fn write_byte(&self, byte: u8) {
        self.state.lock().tx.push(byte);
    }

    fn rx_fifo_count(&self) -> u32 {
        self.state.lock().rx_fifo.len() as u32
    }

    fn is_tx_fifo_empty(&self) -> bool {
        let mut st = self.state.lock();
        st.tx_empty_polls += 1;
        if st.tx_busy_polls > 0 {
            st.tx_busy_polls -= 1;
            return false;
        }
        true
    }

    fn interrupt_status(&self) -> UartInterrupt {
        self.state.lock().int_status
    }

    fn interrupt_enable_status(&self) -> UartInterrupt {
        self.state.lock().regs.int_enable
    }

    fn clear_interrupt_status(&self, status: UartInterrupt) {
        self.state.lock().int_status.remove(status);
    }

    fn enable_interrupt(&self, int: UartInterrupt) {
        self.state.lock().regs.int_enable.insert(int);
    }

    fn disable_interrupt(&self, int: UartInterrupt) {
        self.state.lock().regs.int_enable.remove(int);
    }

    fn set_rx_fifo_threshold(&self, threshold: u8) {
        self.state.lock().regs.rx_threshold = threshold;
    }

    fn set_tx_fifo_threshold(&self, threshold: u8) {
        self.state.lock().regs.tx_threshold = threshold;
    }

    fn set_rx_stop_detect_time(&self, time: RxStopDetectTime) {
        self.state.lock().regs.stop_detect = time;
    }

    fn set_rx_enabled(&self, enable: bool) {
        self.state.lock().regs.rx_enabled = enable;
    }

    fn set_tx_enabled(&self, enable: bool) {
        self.state.lock().regs.tx_enabled = enable;
    }

    fn set_hw_flow_control(&self, rx_threshold: u8) {
        self.state.lock().regs.flow_ctrl = Some(rx_threshold);
    }

    fn disable_hw_flow_control(&self) {
        self.state.lock().regs.flow_ctrl = None;
    }

    fn is_flow_control_enabled(&self) -> bool {
        self.state.lock().regs.flow_ctrl.is_some()
    }

    fn rx_data_addr(&self) -> usize {
        MOCK_RX_DATA_ADDR
    }

    fn backup(&self, regs: &mut [u32; UART_PM_BACKUP_REG_NUM]) {
        let mut st = self.state.lock();
        st.backups += 1;
        let r = &st.regs;
        *regs = [
            r.baud_rate,
            r.data_bits as u32,
            r.parity as u32,
            r.stop_bits as u32,
            r.int_enable.bits(),
            r.flow_ctrl.map_or(0, |t| 0x100 | u32::from(t)),
            u32::from(r.rx_threshold) | (u32::from(r.tx_threshold) << 8),
            u32::from(r.rx_enabled) | (u32::from(r.tx_enabled) << 1) | (u32::from(r.started) << 2),
        ];
    }

    fn restore(&self, regs: &[u32; UART_PM_BACKUP_REG_NUM]) {
        let mut st = self.state.lock();
        st.restores += 1;
        let r = &mut st.regs;
        r.baud_rate = regs[0];
        r.data_bits = match regs[1] {
            0 => DataBits::Five,
            1 => DataBits::Six,
            2 => DataBits::Seven,
            _ => DataBits::Eight,
        };
        r.parity = match regs[2] {
            1 => Parity::Odd,
            2 => Parity::Even,
            _ => Parity::None,
        };
        r.stop_bits = if regs[3] == 1 { StopBits::Two } else { StopBits::One };
        r.int_enable = UartInterrupt::from_bits_truncate(regs[4]);
        r.flow_ctrl = (regs[5] & 0x100 != 0).then_some(regs[5] as u8);
        r.rx_threshold = regs[6] as u8;
        r.tx_threshold = (regs[6] >> 8) as u8;
        r.rx_enabled = regs[7] & 1 != 0;
        r.tx_enabled = regs[7] & 2 != 0;
        r.started = regs[7] & 4 != 0;
    }
}
