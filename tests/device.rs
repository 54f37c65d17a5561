//! State machine, device information and auto cleaning interval

mod common;

use common::*;
use sps30_i2c::sps30::StatusRegister;
use sps30_i2c::{Sps30Error, State};

fn ascii_packets(text: &str, packets_total: usize) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(packets_total * 2, 0);
    let words: Vec<[u8; 2]> = bytes.chunks(2).map(|c| [c[0], c[1]]).collect();
    packets(&words)
}

#[test]
fn auto_cleaning_interval_round_trip() {
    let mut sps = session();
    for seconds in [0, 86_400, 604_800, u32::MAX] {
        sps.set_auto_cleaning_interval(seconds).unwrap();
        // the device answers with the halves it was given
        let stored = sps.bus().last_write()[2..8].to_vec();
        sps.bus_mut().reply(stored);

        assert_eq!(sps.auto_cleaning_interval().unwrap(), Some(seconds));
    }
}

#[test]
fn auto_cleaning_interval_is_sent_low_half_first() {
    let mut sps = session();
    sps.set_auto_cleaning_interval(604_800).unwrap();
    assert_eq!(
        sps.bus().last_write(),
        &[0x80, 0x04, 0x3A, 0x80, 0xA7, 0x00, 0x09, 0x09]
    );
}

#[test]
fn auto_cleaning_interval_days_reads_back() {
    let mut sps = session();
    sps.bus_mut().reply(packets(&[[0x3A, 0x80], [0x00, 0x09]]));

    assert_eq!(sps.set_auto_cleaning_interval_days(7).unwrap(), Some(604_800));
    assert_eq!(sps.bus().writes.len(), 3);
}

#[test]
fn auto_cleaning_interval_days_overflow() {
    let mut sps = session();
    assert!(matches!(
        sps.set_auto_cleaning_interval_days(50_000),
        Err(Sps30Error::InvalidArgument(_))
    ));
    // nothing but the probe went out
    assert_eq!(sps.bus().writes.len(), 1);
}

#[test]
fn corrupt_interval_reads_as_none() {
    let mut sps = session();
    let mut reply = packets(&[[0x3A, 0x80], [0x00, 0x09]]);
    reply[5] ^= 0x01;
    sps.bus_mut().reply(reply);

    assert_eq!(sps.auto_cleaning_interval().unwrap(), None);
    assert_eq!(sps.checksum_stats().total, 1);
}

#[test]
fn device_info_collects_everything() {
    let mut sps = session();
    sps.bus_mut().reply(packets(&[[0x3A, 0x80], [0x00, 0x09]]));
    sps.bus_mut().reply(ascii_packets("00080000", 4));
    sps.bus_mut().reply(ascii_packets("ABCDEF0123456789", 16));
    sps.bus_mut().reply(firmware(2, 3));
    sps.bus_mut().reply(packets(&[[0x00, 0x20], [0x00, 0x10]]));

    let info = sps.device_info().unwrap();

    assert_eq!(info.product_type.as_deref(), Some("00080000"));
    assert_eq!(info.serial_number.as_deref(), Some("ABCDEF0123456789"));
    assert_eq!(info.firmware_version.unwrap().to_string(), "2.3");
    assert_eq!(info.address, 0x69);
    assert_eq!(info.auto_cleaning_interval, Some(604_800));
    assert_eq!(info.auto_cleaning_days, 7);
    assert!(!info.is_measuring);
    assert_eq!(info.checksum_stats.total, 0);

    let status = info.status.unwrap();
    assert_eq!(status, StatusRegister(0x0020_0010));
    assert!(status.fan_speed_warning());
    assert!(!status.laser_current_out_of_range());
    assert!(status.fan_stalled());
}

#[test]
fn corrupt_serial_number_is_none() {
    let mut sps = session();
    let mut reply = ascii_packets("ABCDEF0123456789", 16);
    reply[20] ^= 0x01;
    sps.bus_mut().reply(reply);

    assert_eq!(sps.serial_number().unwrap(), None);
    assert_eq!(sps.checksum_stats().total, 1);
}

#[test]
fn corrupt_firmware_version_is_none() {
    let mut sps = session();
    let mut reply = firmware(2, 3);
    reply[2] ^= 0x01;
    sps.bus_mut().reply(reply);

    assert_eq!(sps.firmware_version().unwrap(), None);
    assert_eq!(sps.checksum_stats().total, 1);
}

#[test]
fn corrupt_status_register_is_none() {
    let mut sps = session();
    let mut reply = packets(&[[0x00, 0x20], [0x00, 0x10]]);
    reply[4] ^= 0x01;
    sps.bus_mut().reply(reply);

    assert_eq!(sps.read_status_register().unwrap(), None);
    assert_eq!(sps.checksum_stats().total, 1);
}

#[test]
fn sleep_and_wakeup() {
    let mut sps = session();
    sps.sleep().unwrap();
    assert_eq!(sps.state(), State::Sleeping);
    assert_eq!(sps.bus().last_write(), &[0x10, 0x01]);

    assert!(matches!(
        sps.read_status_register(),
        Err(Sps30Error::InvalidState {
            state: State::Sleeping,
            ..
        })
    ));
    assert!(sps.start_measurement().is_err());

    sps.wakeup().unwrap();
    assert_eq!(sps.state(), State::Idle);
    assert_eq!(sps.bus().last_write(), &[0x11, 0x03]);
}

#[test]
fn sleep_from_measuring() {
    let mut sps = measuring(config());
    sps.sleep().unwrap();
    assert_eq!(sps.state(), State::Sleeping);
    assert!(sps.read_measurement().unwrap().is_none());
}

#[test]
fn wakeup_needs_sleep() {
    let mut sps = session();
    assert!(matches!(
        sps.wakeup(),
        Err(Sps30Error::InvalidState {
            state: State::Idle,
            ..
        })
    ));
}

#[test]
fn start_twice_is_rejected() {
    let mut sps = measuring(config());
    assert!(matches!(
        sps.start_measurement(),
        Err(Sps30Error::InvalidState {
            state: State::Measuring,
            ..
        })
    ));
}

#[test]
fn stop_returns_to_idle() {
    let mut sps = measuring(config());
    sps.stop_measurement().unwrap();
    assert_eq!(sps.state(), State::Idle);
    assert_eq!(sps.bus().last_write(), &[0x01, 0x04]);
}

#[test]
fn fan_cleaning_needs_measurement() {
    let mut sps = session();
    assert!(matches!(
        sps.start_fan_cleaning(),
        Err(Sps30Error::NotMeasuring { .. })
    ));

    let mut sps = measuring(config());
    sps.start_fan_cleaning().unwrap();
    assert_eq!(sps.bus().last_write(), &[0x56, 0x07]);
}

#[test]
fn reset_clears_state_and_counters() {
    let mut sps = measuring(config());
    let mut bad = flat_frame(1.0);
    bad[2] ^= 0x01;
    queue_frame(&mut sps, bad);
    assert!(sps.read_measurement().unwrap().is_none());
    assert_eq!(sps.checksum_stats().total, 1);

    sps.reset().unwrap();

    assert_eq!(sps.state(), State::Idle);
    assert_eq!(sps.checksum_stats().total, 0);
    assert_eq!(sps.checksum_stats().last_measurement, 0);
    assert_eq!(sps.bus().last_write(), &[0xD3, 0x04]);
}

#[test]
fn reset_wakes_from_sleep() {
    let mut sps = session();
    sps.sleep().unwrap();
    sps.reset().unwrap();
    assert_eq!(sps.state(), State::Idle);
}

#[test]
fn clear_status_register() {
    let mut sps = session();
    sps.clear_status_register().unwrap();
    assert_eq!(sps.bus().last_write(), &[0xD2, 0x10]);
}

#[test]
fn bad_data_ready_flag_reads_as_not_ready() {
    let mut sps = session();
    let mut reply = ready(true);
    reply[2] ^= 0x01;
    sps.bus_mut().reply(reply);

    assert!(!sps.read_data_ready().unwrap());
    assert_eq!(sps.checksum_stats().total, 1);
}
