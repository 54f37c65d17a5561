//! Scripted bus and frame builders shared by the integration tests

// Not every test file uses every helper
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use sps30_i2c::checksum::crc8;
use sps30_i2c::{Bus, Config, Sps30};

/// One scripted answer to a read.
pub enum Reply {
    Bytes(Vec<u8>),
    Fail,
}

/// Fake bus: records writes, replays queued replies and counts the
/// recovery steps.
#[derive(Default)]
pub struct ScriptedBus {
    pub writes: Vec<Vec<u8>>,
    pub replies: VecDeque<Reply>,
    pub clock_cycles: usize,
    pub reinits: usize,
    pub fail_next_write: bool,
    pub fail_reinit: bool,
    /// Behave like an adapter without a controllable clock line
    pub no_clock_line: bool,
}

impl ScriptedBus {
    /// Bus with the firmware reply for the connection probe queued.
    pub fn connected() -> ScriptedBus {
        let mut bus = ScriptedBus::default();
        bus.reply(firmware(2, 2));
        bus
    }

    pub fn reply(&mut self, bytes: Vec<u8>) {
        self.replies.push_back(Reply::Bytes(bytes));
    }

    pub fn fail_read(&mut self) {
        self.replies.push_back(Reply::Fail);
    }

    pub fn last_write(&self) -> &[u8] {
        self.writes.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Bus for ScriptedBus {
    fn drives_clock(&self) -> bool {
        !self.no_clock_line
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(io::Error::other("write nack"));
        }
        self.writes.push(bytes.to_vec());
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.replies.pop_front() {
            Some(Reply::Bytes(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(Reply::Fail) => Err(io::Error::other("read nack")),
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "no scripted reply")),
        }
    }

    fn clock_cycle(&mut self) -> io::Result<()> {
        self.clock_cycles += 1;
        Ok(())
    }

    fn reinit(&mut self) -> io::Result<()> {
        if self.fail_reinit {
            return Err(io::Error::other("adapter gone"));
        }
        self.reinits += 1;
        Ok(())
    }
}

pub fn config() -> Config {
    Config::default().burn_in(Duration::ZERO)
}

/// Connected session without burn-in.
pub fn session() -> Sps30<ScriptedBus> {
    Sps30::with_bus(ScriptedBus::connected(), config()).expect("probe failed")
}

/// Connected session that is already measuring.
pub fn measuring(config: Config) -> Sps30<ScriptedBus> {
    let mut sps = Sps30::with_bus(ScriptedBus::connected(), config).expect("probe failed");
    sps.start_measurement().expect("start failed");
    sps
}

pub fn packets(words: &[[u8; 2]]) -> Vec<u8> {
    words.iter().flat_map(|w| [w[0], w[1], crc8(*w)]).collect()
}

pub fn firmware(major: u8, minor: u8) -> Vec<u8> {
    packets(&[[major, minor]])
}

pub fn ready(flag: bool) -> Vec<u8> {
    packets(&[[0x00, flag as u8]])
}

/// 60-byte float response for the ten values in wire order.
pub fn float_frame(values: [f32; 10]) -> Vec<u8> {
    let words: Vec<[u8; 2]> = values
        .iter()
        .flat_map(|v| {
            let b = v.to_bits().to_be_bytes();
            [[b[0], b[1]], [b[2], b[3]]]
        })
        .collect();
    packets(&words)
}

/// Frame with all ten values set to `value`.
pub fn flat_frame(value: f32) -> Vec<u8> {
    float_frame([value; 10])
}

/// Queues a ready flag and a measured values response.
pub fn queue_frame(sps: &mut Sps30<ScriptedBus>, frame: Vec<u8>) {
    sps.bus_mut().reply(ready(true));
    sps.bus_mut().reply(frame);
}
