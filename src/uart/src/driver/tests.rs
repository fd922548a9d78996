extern crate std;

use core::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::vec::Vec;

use armino_common::{Parity, UartConfig, UartError, UartId, UartInterrupt};
use armino_hal::mock::{MockClock, MockDma, MockInterruptController, MockPowerManager, MockUartHal};
use armino_hal::{
    DmaChannel, DmaDevice, IntSource, PmAction, PmDeviceId, PmHandler, PmHook, PmMode,
    PowerManager, PowerModule, UartHal,
};

use super::{DriverConfig, Platform, UartDriver};
use crate::WAIT_FOREVER;

struct Board {
    pm: MockPowerManager,
    dma: MockDma,
    irq: MockInterruptController,
    clock: MockClock,
}

impl Board {
    fn new() -> Self {
        Self::with_dma_channels(2)
    }

    fn with_dma_channels(channels: usize) -> Self {
        Self {
            pm: MockPowerManager::new(),
            dma: MockDma::new(channels),
            irq: MockInterruptController::new(),
            clock: MockClock::new(),
        }
    }

    fn platform(&self) -> Platform<'_> {
        Platform {
            pm: &self.pm,
            dma: &self.dma,
            irq: &self.irq,
            clock: &self.clock,
        }
    }
}

fn uart0_isr() {}
fn uart1_isr() {}
fn uart2_isr() {}

fn driver_with(board: &Board, config: DriverConfig) -> UartDriver<'_, MockUartHal> {
    let driver = UartDriver::new(
        [MockUartHal::new(), MockUartHal::new(), MockUartHal::new()],
        board.platform(),
        [uart0_isr, uart1_isr, uart2_isr],
        config,
    );
    driver.driver_init().unwrap();
    driver
}

fn driver(board: &Board) -> UartDriver<'_, MockUartHal> {
    driver_with(board, DriverConfig::default())
}

/// Initialises `id` with defaults and unmasks its receive interrupts.
fn open(driver: &UartDriver<'_, MockUartHal>, id: UartId, config: &UartConfig) {
    driver.init(id, config).unwrap();
    driver.enable_rx_interrupt(id).unwrap();
}

fn receive(driver: &UartDriver<'_, MockUartHal>, id: UartId, data: &[u8]) {
    driver.hal(id).unwrap().inject_rx(data);
    driver.handle_interrupt(id);
}

#[test]
fn test_error_check_order() {
    let board = Board::new();
    let driver = UartDriver::new(
        [MockUartHal::new(), MockUartHal::new(), MockUartHal::new()],
        board.platform(),
        [uart0_isr, uart1_isr, uart2_isr],
        DriverConfig::default(),
    );
    let mut buf = [0u8; 4];

    assert_eq!(driver.read_bytes(UartId(9), &mut buf, 0), Err(UartError::NotInit));
    driver.driver_init().unwrap();
    assert_eq!(driver.read_bytes(UartId(9), &mut buf, 0), Err(UartError::InvalidId));
    assert_eq!(driver.read_bytes(UartId::UART0, &mut buf, 0), Err(UartError::IdNotInit));
    assert_eq!(driver.write_bytes(UartId::UART0, b"x"), Err(UartError::IdNotInit));
    assert_eq!(
        driver.init(UartId::UART0, &UartConfig::default().with_baud_rate(1200)),
        Err(UartError::BaudRateNotSupported)
    );
}

#[test]
fn test_init_configures_and_starts_port() {
    let board = Board::new();
    let driver = driver(&board);
    let config = UartConfig::default().with_baud_rate(921_600).with_parity(Parity::Odd);
    driver.init(UartId::UART1, &config).unwrap();

    let hal = driver.hal(UartId::UART1).unwrap();
    assert!(driver.is_in_use(UartId::UART1));
    assert!(!driver.is_in_use(UartId::UART0));
    assert!(hal.is_clock_enabled());
    assert!(hal.is_started());
    assert_eq!(hal.baud_rate(), 921_600);
    assert_eq!(hal.parity(), Parity::Odd);
    assert!(board.irq.handler(IntSource::Uart(1)).is_some());
    assert_eq!(board.pm.vote(PowerModule::BakpUart1), Some(true));
}

#[test]
fn test_deinit_releases_port() {
    let board = Board::new();
    let driver = driver(&board);
    open(&driver, UartId::UART2, &UartConfig::default().with_rx_dma(true));
    assert_eq!(board.dma.allocated(), 1);

    driver.deinit(UartId::UART2).unwrap();
    let hal = driver.hal(UartId::UART2).unwrap();
    assert!(!driver.is_in_use(UartId::UART2));
    assert!(!hal.is_clock_enabled());
    assert!(!board.irq.is_enabled(IntSource::Uart(2)));
    assert_eq!(board.dma.allocated(), 0);
    assert_eq!(board.pm.vote(PowerModule::BakpUart2), Some(false));
    assert!(board.pm.hooks(PmMode::LowVoltage, PmDeviceId::UART3).is_none());
    assert!(board.pm.hooks(PmMode::DeepSleep, PmDeviceId::UART3).is_none());
    assert_eq!(driver.length_in_buffer(UartId::UART2), Ok(0));
}

#[test]
fn test_read_times_out_and_clears_blocked_flag() {
    let board = Board::new();
    let driver = driver(&board);
    open(&driver, UartId::UART0, &UartConfig::default());

    let mut buf = [0u8; 8];
    assert_eq!(driver.read_bytes(UartId::UART0, &mut buf, 20), Err(UartError::RxTimeout));
    assert_eq!(driver.is_rx_blocked(UartId::UART0), Ok(false));
    assert_eq!(driver.stats(UartId::UART0).unwrap().rx_timeout_count, 1);

    // Data arriving after the timeout is still delivered.
    receive(&driver, UartId::UART0, b"late");
    assert_eq!(driver.read_bytes(UartId::UART0, &mut buf, 20), Ok(4));
    assert_eq!(&buf[..4], b"late");
}

#[test]
fn test_partial_reads_preserve_order() {
    let board = Board::new();
    let driver = driver(&board);
    open(&driver, UartId::UART0, &UartConfig::default());

    receive(&driver, UartId::UART0, b"hello");
    receive(&driver, UartId::UART0, b" world");
    assert_eq!(driver.length_in_buffer(UartId::UART0), Ok(11));

    let mut out = Vec::new();
    let mut buf = [0u8; 4];
    while out.len() < 11 {
        let n = driver.read_bytes(UartId::UART0, &mut buf, 0).unwrap();
        assert!(n <= 4);
        out.extend_from_slice(&buf[..n]);
    }
    assert_eq!(out, b"hello world");
    assert_eq!(driver.stats(UartId::UART0).unwrap().fifo_put_count, 11);
    assert_eq!(driver.stats(UartId::UART0).unwrap().last_value, b'd');
}

#[test]
fn test_full_fifo_drops_and_counts() {
    let board = Board::new();
    let driver = driver_with(
        &board,
        DriverConfig {
            kfifo_size: 4,
            ..DriverConfig::default()
        },
    );
    open(&driver, UartId::UART0, &UartConfig::default());

    receive(&driver, UartId::UART0, b"abcdef");
    let stats = driver.stats(UartId::UART0).unwrap();
    assert_eq!(stats.fifo_put_count, 4);
    assert_eq!(stats.fifo_full_count, 2);
    assert!(!driver.read_ready(UartId::UART0).unwrap());

    let mut buf = [0u8; 8];
    assert_eq!(driver.read_bytes(UartId::UART0, &mut buf, 0), Ok(4));
    assert_eq!(&buf[..4], b"abcd");
}

#[test]
fn test_full_fifo_with_flow_control_is_not_counted() {
    let board = Board::new();
    let driver = driver_with(
        &board,
        DriverConfig {
            kfifo_size: 4,
            ..DriverConfig::default()
        },
    );
    open(&driver, UartId::UART0, &UartConfig::default());
    driver.set_hw_flow_ctrl(UartId::UART0, 32).unwrap();

    receive(&driver, UartId::UART0, b"abcdef");
    let stats = driver.stats(UartId::UART0).unwrap();
    assert_eq!(stats.fifo_put_count, 4);
    assert_eq!(stats.fifo_full_count, 0);
    assert_eq!(driver.length_in_buffer(UartId::UART0), Ok(4));
}

#[test]
fn test_blocked_reader_is_woken_by_interrupt() {
    let board = Board::new();
    let driver = driver(&board);
    open(&driver, UartId::UART1, &UartConfig::default());

    thread::scope(|s| {
        let reader = s.spawn(|| {
            let mut buf = [0u8; 16];
            driver
                .read_bytes(UartId::UART1, &mut buf, WAIT_FOREVER)
                .map(|n| buf[..n].to_vec())
        });

        while !driver.is_rx_blocked(UartId::UART1).unwrap() {
            thread::yield_now();
        }
        receive(&driver, UartId::UART1, b"ping");

        assert_eq!(reader.join().unwrap(), Ok(b"ping".to_vec()));
    });
    assert_eq!(driver.is_rx_blocked(UartId::UART1), Ok(false));
}

#[test]
fn test_rx_error_without_dma_drains_hardware() {
    let board = Board::new();
    let driver = driver(&board);
    open(&driver, UartId::UART0, &UartConfig::default());

    let hal = driver.hal(UartId::UART0).unwrap();
    hal.inject_rx(b"garbage");
    hal.raise(UartInterrupt::RX_PARITY_ERR);
    driver.handle_interrupt(UartId::UART0);

    assert!(!hal.is_fifo_read_ready());
    assert_eq!(driver.length_in_buffer(UartId::UART0), Ok(0));
    assert!(hal.pending().is_empty());
}

#[test]
fn test_dma_receive_publishes_frames() {
    let board = Board::new();
    let driver = driver(&board);
    open(&driver, UartId::UART1, &UartConfig::default().with_rx_dma(true));

    let ch = DmaChannel(0);
    let config = board.dma.config(ch).unwrap();
    assert_eq!(config.src.dev, DmaDevice::UartRx(1));
    assert_eq!(config.dst.end_addr - config.dst.start_addr, 1024);
    assert!(board.dma.is_running(ch));

    let hal = driver.hal(UartId::UART1).unwrap();
    // SAFETY: the channel targets the port's live receive FIFO.
    unsafe { board.dma.transfer(ch, b"dma frame") };
    hal.raise(UartInterrupt::RX_FINISH);
    driver.handle_interrupt(UartId::UART1);

    assert_eq!(board.dma.flush_count(), 1);
    assert!(board.dma.is_running(ch));
    let mut buf = [0u8; 32];
    assert_eq!(driver.read_bytes(UartId::UART1, &mut buf, 0), Ok(9));
    assert_eq!(&buf[..9], b"dma frame");
}

#[test]
fn test_dma_rx_error_discards_buffered_bytes() {
    let board = Board::new();
    let driver = driver(&board);
    open(&driver, UartId::UART1, &UartConfig::default().with_rx_dma(true));
    let ch = DmaChannel(0);
    let hal = driver.hal(UartId::UART1).unwrap();

    // SAFETY: the channel targets the port's live receive FIFO.
    unsafe { board.dma.transfer(ch, b"abcd") };
    hal.raise(UartInterrupt::RX_FINISH);
    driver.handle_interrupt(UartId::UART1);
    assert_eq!(driver.length_in_buffer(UartId::UART1), Ok(4));

    // SAFETY: as above.
    unsafe { board.dma.transfer(ch, b"xyz") };
    hal.raise(UartInterrupt::RX_FINISH | UartInterrupt::RX_STOP_ERR);
    driver.handle_interrupt(UartId::UART1);
    assert_eq!(driver.length_in_buffer(UartId::UART1), Ok(0));

    // Later frames land where the reader expects them.
    // SAFETY: as above.
    unsafe { board.dma.transfer(ch, b"ok") };
    hal.raise(UartInterrupt::RX_FINISH);
    driver.handle_interrupt(UartId::UART1);
    let mut buf = [0u8; 8];
    assert_eq!(driver.read_bytes(UartId::UART1, &mut buf, 0), Ok(2));
    assert_eq!(&buf[..2], b"ok");
}

#[test]
#[should_panic]
fn test_dma_over_length_transfer_panics() {
    let board = Board::new();
    let driver = driver(&board);
    open(&driver, UartId::UART1, &UartConfig::default().with_rx_dma(true));
    let ch = DmaChannel(0);

    // A remaining count above the transfer length means the engine
    // reported more bytes than the FIFO can hold.
    board.dma.force_remaining(ch, 1025);
    driver.hal(UartId::UART1).unwrap().raise(UartInterrupt::RX_FINISH);
    driver.handle_interrupt(UartId::UART1);
}

#[test]
#[should_panic(expected = "overran the reader")]
fn test_dma_overrun_of_unread_bytes_panics() {
    let board = Board::new();
    let driver = driver(&board);
    open(&driver, UartId::UART1, &UartConfig::default().with_rx_dma(true));
    let ch = DmaChannel(0);
    let hal = driver.hal(UartId::UART1).unwrap();

    // SAFETY: the channel targets the port's live receive FIFO.
    unsafe { board.dma.transfer(ch, &[b'a'; 1000]) };
    hal.raise(UartInterrupt::RX_FINISH);
    driver.handle_interrupt(UartId::UART1);
    assert_eq!(driver.length_in_buffer(UartId::UART1), Ok(1000));

    // Only 24 bytes are free; the next frame overwrites unread data.
    // SAFETY: as above.
    unsafe { board.dma.transfer(ch, &[b'b'; 100]) };
    hal.raise(UartInterrupt::RX_FINISH);
    driver.handle_interrupt(UartId::UART1);
}

#[test]
fn test_dma_unavailable_falls_back_to_interrupt_receive() {
    let board = Board::with_dma_channels(0);
    let driver = driver(&board);
    open(&driver, UartId::UART0, &UartConfig::default().with_rx_dma(true));

    receive(&driver, UartId::UART0, b"xy");
    let mut buf = [0u8; 4];
    assert_eq!(driver.read_bytes(UartId::UART0, &mut buf, 0), Ok(2));
    assert_eq!(&buf[..2], b"xy");
}

static RX_HITS: AtomicUsize = AtomicUsize::new(0);
static TAKEN_HITS: AtomicUsize = AtomicUsize::new(0);
static TX_HITS: AtomicUsize = AtomicUsize::new(0);

fn count_rx(_id: UartId) {
    RX_HITS.fetch_add(1, Ordering::SeqCst);
}

fn count_taken(_id: UartId) {
    TAKEN_HITS.fetch_add(1, Ordering::SeqCst);
}

fn count_tx(_id: UartId) {
    TX_HITS.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn test_take_and_recover_rx_isr() {
    let board = Board::new();
    let driver = driver(&board);
    open(&driver, UartId::UART2, &UartConfig::default());
    driver.register_rx_isr(UartId::UART2, Some(&count_rx)).unwrap();

    driver.take_rx_isr(UartId::UART2, Some(&count_taken)).unwrap();
    receive(&driver, UartId::UART2, b"q");
    assert_eq!(TAKEN_HITS.load(Ordering::SeqCst), 1);
    assert_eq!(RX_HITS.load(Ordering::SeqCst), 0);
    assert_eq!(driver.length_in_buffer(UartId::UART2), Ok(0));
    // The callback owns the hardware FIFO while it is installed.
    driver.hal(UartId::UART2).unwrap().read_byte();

    driver.recover_rx_isr(UartId::UART2).unwrap();
    receive(&driver, UartId::UART2, b"r");
    assert_eq!(TAKEN_HITS.load(Ordering::SeqCst), 1);
    assert_eq!(driver.length_in_buffer(UartId::UART2), Ok(1));

    // With the software FIFO off the restored callback runs again.
    driver.disable_sw_fifo(UartId::UART2).unwrap();
    receive(&driver, UartId::UART2, b"s");
    assert_eq!(RX_HITS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_rx_without_consumer_is_drained() {
    let board = Board::new();
    let driver = driver(&board);
    open(&driver, UartId::UART0, &UartConfig::default());
    driver.disable_sw_fifo(UartId::UART0).unwrap();

    receive(&driver, UartId::UART0, b"noise");
    assert!(!driver.read_ready(UartId::UART0).unwrap());

    // Reads go straight to hardware while the software FIFO is off.
    driver.hal(UartId::UART0).unwrap().inject_rx(b"raw");
    let mut buf = [0u8; 8];
    assert_eq!(driver.read_bytes(UartId::UART0, &mut buf, 100), Ok(3));
    assert_eq!(&buf[..3], b"raw");
}

#[test]
fn test_tx_interrupt_runs_callback() {
    let board = Board::new();
    let driver = driver(&board);
    open(&driver, UartId::UART0, &UartConfig::default());
    driver.register_tx_isr(UartId::UART0, Some(&count_tx)).unwrap();

    // Masked: no callback.
    let hal = driver.hal(UartId::UART0).unwrap();
    hal.raise(UartInterrupt::TX_FIFO_NEED_WRITE);
    driver.handle_interrupt(UartId::UART0);
    assert_eq!(TX_HITS.load(Ordering::SeqCst), 0);

    driver.enable_tx_interrupt(UartId::UART0).unwrap();
    hal.raise(UartInterrupt::TX_FIFO_NEED_WRITE);
    driver.handle_interrupt(UartId::UART0);
    assert_eq!(TX_HITS.load(Ordering::SeqCst), 1);
    assert!(board.irq.is_enabled(IntSource::Uart(0)));
}

#[test]
fn test_write_string_expands_newlines() {
    let board = Board::new();
    let driver = driver(&board);
    driver.init(UartId::UART0, &UartConfig::default()).unwrap();
    let hal = driver.hal(UartId::UART0).unwrap();
    hal.set_write_busy_polls(3);

    driver.write_string(UartId::UART0, "a\nb\r\nc").unwrap();
    driver.write_bytes(UartId::UART0, b"\n").unwrap();
    assert_eq!(hal.tx_data(), b"a\r\nb\r\nc\n");
}

#[test]
fn test_lv_hooks_registered_for_ports_1_and_2_only() {
    let board = Board::new();
    let driver = driver(&board);
    driver.init(UartId::UART0, &UartConfig::default()).unwrap();
    driver.init(UartId::UART1, &UartConfig::default()).unwrap();

    assert!(board.pm.hooks(PmMode::LowVoltage, PmDeviceId::UART1).is_none());
    assert_eq!(
        board.pm.hooks(PmMode::LowVoltage, PmDeviceId::UART2),
        Some((
            Some(PmHook::new(PmAction::Backup, 1)),
            Some(PmHook::new(PmAction::Restore, 1))
        ))
    );
    assert_eq!(
        board.pm.hooks(PmMode::DeepSleep, PmDeviceId::UART1),
        Some((Some(PmHook::new(PmAction::Suspend, 0)), None))
    );
    assert_eq!(driver.pm_backup(UartId::UART0), Err(UartError::LowVoltageUnsupported));
}

#[test]
fn test_lv_backup_is_idempotent() {
    let board = Board::new();
    let driver = driver(&board);
    driver.init(UartId::UART1, &UartConfig::default()).unwrap();
    let hal = driver.hal(UartId::UART1).unwrap();

    for hook in board.pm.enter_hooks(PmMode::LowVoltage) {
        driver.on_pm_event(hook, 0).unwrap();
        driver.on_pm_event(hook, 0).unwrap();
    }
    driver.pm_backup(UartId::UART1).unwrap();
    assert_eq!(hal.backup_count(), 1);

    hal.lose_power();
    for hook in board.pm.exit_hooks(PmMode::LowVoltage) {
        driver.on_pm_event(hook, 0).unwrap();
        driver.on_pm_event(hook, 0).unwrap();
    }
    assert_eq!(hal.restore_count(), 1);
    assert_eq!(hal.baud_rate(), 115_200);
    assert!(hal.is_started());
}

#[test]
fn test_pending_lv_restore_runs_before_register_access() {
    let board = Board::new();
    let driver = driver(&board);
    driver.init(UartId::UART2, &UartConfig::default().with_baud_rate(460_800)).unwrap();
    let hal = driver.hal(UartId::UART2).unwrap();

    driver.pm_backup(UartId::UART2).unwrap();
    hal.lose_power();
    board.pm.set_lv_sleep_state(PmDeviceId::UART3);

    driver.set_parity(UartId::UART2, Parity::Even).unwrap();
    assert_eq!(hal.restore_count(), 1);
    assert_eq!(hal.baud_rate(), 460_800);
    assert_eq!(hal.parity(), Parity::Even);
    assert!(!board.pm.lv_sleep_state(PmDeviceId::UART3));

    // Nothing pending any more.
    driver.set_parity(UartId::UART2, Parity::None).unwrap();
    assert_eq!(hal.restore_count(), 1);
}

#[test]
fn test_deep_sleep_waits_for_tx_drain() {
    let board = Board::new();
    let driver = driver(&board);
    driver.init(UartId::UART0, &UartConfig::default()).unwrap();
    driver.enable_tx_interrupt(UartId::UART0).unwrap();
    let hal = driver.hal(UartId::UART0).unwrap();
    hal.set_tx_busy_polls(5);

    let hook = board.pm.enter_hooks(PmMode::DeepSleep)[0];
    driver.on_pm_event(hook, 1000).unwrap();

    assert_eq!(hal.tx_empty_polls(), 6);
    assert!(!hal.is_tx_enabled());
    assert!(!hal.is_rx_enabled());
    assert!(!hal
        .interrupt_enable_status()
        .contains(UartInterrupt::TX_FIFO_NEED_WRITE));
}

#[test]
fn test_deep_sleep_drain_polls_hardware_only() {
    let board = Board::new();
    let driver = driver(&board);
    driver.init(UartId::UART1, &UartConfig::default()).unwrap();
    let hal = driver.hal(UartId::UART1).unwrap();
    hal.set_tx_busy_polls(50);

    let before = board.pm.lv_state_queries();
    driver.enter_deep_sleep(UartId::UART1).unwrap();

    assert_eq!(hal.tx_empty_polls(), 51);
    // One lazy-restore check each for the interrupt mask and both path switches.
    assert_eq!(board.pm.lv_state_queries() - before, 3);
    assert!(!hal.is_tx_enabled());
}

#[test]
fn test_init_clears_stale_lv_sleep_state() {
    let board = Board::new();
    let driver = driver(&board);
    board.pm.set_lv_sleep_state(PmDeviceId::UART2);

    driver.init(UartId::UART1, &UartConfig::default()).unwrap();
    assert!(!board.pm.lv_sleep_state(PmDeviceId::UART2));

    let hal = driver.hal(UartId::UART1).unwrap();
    driver.set_parity(UartId::UART1, Parity::Even).unwrap();
    assert_eq!(hal.restore_count(), 0);
    assert_eq!(hal.parity(), Parity::Even);
}

#[test]
fn test_pm_event_with_bad_arg_is_rejected() {
    let board = Board::new();
    let driver = driver(&board);
    assert_eq!(
        driver.on_pm_event(PmHook::new(PmAction::Backup, 300), 0),
        Err(UartError::InvalidId)
    );
    assert_eq!(
        driver.on_pm_event(PmHook::new(PmAction::Backup, 1), 0),
        Err(UartError::IdNotInit)
    );
}

#[test]
fn test_line_setters_reach_hardware() {
    let board = Board::new();
    let driver = driver(&board);
    driver.init(UartId::UART0, &UartConfig::default()).unwrap();
    let hal = driver.hal(UartId::UART0).unwrap();

    driver.set_baud_rate(UartId::UART0, 57_600).unwrap();
    driver.set_rx_full_threshold(UartId::UART0, 32).unwrap();
    driver.set_tx_empty_threshold(UartId::UART0, 8).unwrap();
    driver.set_hw_flow_ctrl(UartId::UART0, 96).unwrap();
    assert_eq!(hal.baud_rate(), 57_600);
    assert_eq!(hal.rx_threshold(), 32);
    assert_eq!(hal.tx_threshold(), 8);
    assert!(hal.is_flow_control_enabled());

    driver.disable_hw_flow_ctrl(UartId::UART0).unwrap();
    assert!(!hal.is_flow_control_enabled());
    assert_eq!(
        driver.set_baud_rate(UartId::UART0, 6_000_000),
        Err(UartError::BaudRateNotSupported)
    );
}

#[test]
fn test_driver_deinit_resets_every_port() {
    let board = Board::new();
    let driver = driver(&board);
    driver.init(UartId::UART0, &UartConfig::default()).unwrap();
    driver.init(UartId::UART1, &UartConfig::default().with_rx_dma(true)).unwrap();

    driver.driver_deinit().unwrap();
    assert!(!driver.is_in_use(UartId::UART0));
    assert!(!driver.is_in_use(UartId::UART1));
    assert_eq!(board.dma.allocated(), 0);
    assert_eq!(driver.write_bytes(UartId::UART0, b"x"), Err(UartError::NotInit));
}
