#![cfg(feature = "hardware-tests")]

mod config;

use baudprobe::{printable, probe_rate, CancelToken, SystemSerial};
use config::{hw_config, HardwareConfig};
use rstest::rstest;
use rstest_reuse::{self, apply, template};
use std::io::Write;
use std::thread;
use std::time::Duration;

const MESSAGE: &[u8] = b"0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ\r\n";

/// Send `MESSAGE` on `port` at `baud_rate` shortly after the probe opened
/// the other end.
fn send_later(port: &str, baud_rate: u32) -> thread::JoinHandle<()> {
    let mut sender = serialport::new(port, baud_rate).open().unwrap();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        sender.write_all(MESSAGE).unwrap();
        sender.flush().unwrap();
    })
}

#[template]
#[rstest]
#[case(9600)]
#[case(19200)]
#[case(57600)]
#[case(115200)]
fn standard_rates(#[case] baud_rate: u32) {}

#[apply(standard_rates)]
fn test_matching_rate_reads_intact(hw_config: HardwareConfig, #[case] baud_rate: u32) {
    let sender = send_later(&hw_config.port_1, baud_rate);

    let sample = probe_rate(
        &mut SystemSerial,
        &hw_config.port_2,
        baud_rate,
        Duration::from_secs(1),
        &CancelToken::new(),
    )
    .unwrap();
    sender.join().unwrap();

    assert_eq!(sample.data, MESSAGE);
}

#[rstest]
#[case(9600, 115200)]
#[case(115200, 9600)]
#[case(19200, 57600)]
fn test_wrong_rate_does_not_read_the_message(
    hw_config: HardwareConfig,
    #[case] sent_at: u32,
    #[case] probed_at: u32,
) {
    let sender = send_later(&hw_config.port_1, sent_at);

    let sample = probe_rate(
        &mut SystemSerial,
        &hw_config.port_2,
        probed_at,
        Duration::from_secs(1),
        &CancelToken::new(),
    )
    .unwrap();
    sender.join().unwrap();

    assert_ne!(printable(&sample.data), printable(MESSAGE));
}

#[rstest]
fn test_port_is_released_between_rates(hw_config: HardwareConfig) {
    for baud_rate in [9600, 115200, 9600] {
        probe_rate(
            &mut SystemSerial,
            &hw_config.port_2,
            baud_rate,
            Duration::from_millis(50),
            &CancelToken::new(),
        )
        .unwrap();
    }
}
