// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! SPS30 command table and the byte layout of outgoing commands.
//!
//! Opcodes, response lengths and execution times from the
//! [datasheet](https://sensirion.com/media/documents/8600FF88/616542B5/Sensirion_PM_Sensors_Datasheet_SPS30.pdf)

use std::time::Duration;

use crate::checksum::crc8;

/// Order in which the two halves of a 32-bit argument travel on the wire.
/// Bytes inside each half are always big endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfOrder {
    /// Most significant half first (measured values, status register)
    HighFirst,
    /// Least significant half first (auto cleaning interval)
    LowFirst,
}

impl HalfOrder {
    /// Splits `value` into the two halves in wire order.
    pub fn split(self, value: u32) -> [u16; 2] {
        let high = (value >> 16) as u16;
        let low = value as u16;
        match self {
            HalfOrder::HighFirst => [high, low],
            HalfOrder::LowFirst => [low, high],
        }
    }

    /// Inverse of [`HalfOrder::split`].
    pub fn join(self, first: u16, second: u16) -> u32 {
        let (high, low) = match self {
            HalfOrder::HighFirst => (first, second),
            HalfOrder::LowFirst => (second, first),
        };
        (u32::from(high) << 16) | u32::from(low)
    }
}

/// Output format argument of the start measurement command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Big endian IEEE754 floats, two packets per value
    #[default]
    Float,
    /// Unsigned 16 bit integers, one packet per value
    Integer,
}

impl OutputFormat {
    pub fn argument(self) -> u16 {
        match self {
            OutputFormat::Float => 0x0300,
            OutputFormat::Integer => 0x0500,
        }
    }

    /// Packets used by one measured value.
    pub fn packets_per_value(self) -> usize {
        match self {
            OutputFormat::Float => 2,
            OutputFormat::Integer => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartMeasurement,
    StopMeasurement,
    ReadDataReady,
    ReadMeasuredValues,
    Sleep,
    Wakeup,
    StartFanCleaning,
    AutoCleaningInterval,
    ProductType,
    SerialNumber,
    FirmwareVersion,
    ReadStatusRegister,
    ClearStatusRegister,
    Reset,
}

impl Command {
    pub fn opcode(self) -> [u8; 2] {
        match self {
            Command::StartMeasurement => [0x00, 0x10],
            Command::StopMeasurement => [0x01, 0x04],
            Command::ReadDataReady => [0x02, 0x02],
            Command::ReadMeasuredValues => [0x03, 0x00],
            Command::Sleep => [0x10, 0x01],
            Command::Wakeup => [0x11, 0x03],
            Command::StartFanCleaning => [0x56, 0x07],
            Command::AutoCleaningInterval => [0x80, 0x04],
            Command::ProductType => [0xD0, 0x02],
            Command::SerialNumber => [0xD0, 0x33],
            Command::FirmwareVersion => [0xD1, 0x00],
            Command::ReadStatusRegister => [0xD2, 0x06],
            Command::ClearStatusRegister => [0xD2, 0x10],
            Command::Reset => [0xD3, 0x04],
        }
    }

    /// Bytes the device answers with. Measured values depend on the
    /// output format the measurement was started with.
    pub fn response_len(self, format: OutputFormat) -> usize {
        match self {
            Command::ReadDataReady | Command::FirmwareVersion => 3,
            Command::AutoCleaningInterval | Command::ReadStatusRegister => 6,
            Command::ProductType => 12,
            Command::SerialNumber => 48,
            Command::ReadMeasuredValues => 10 * format.packets_per_value() * 3,
            _ => 0,
        }
    }

    /// Minimum wait after the write before the next command is legal.
    pub fn settle_time(self) -> Duration {
        match self {
            Command::Wakeup => Duration::from_millis(50),
            Command::Reset => Duration::from_millis(100),
            _ => Duration::from_millis(20),
        }
    }
}

/// Opcode only.
pub fn encode(command: Command) -> Vec<u8> {
    command.opcode().to_vec()
}

/// Opcode followed by one checksummed half word.
pub fn encode_word(command: Command, word: u16) -> Vec<u8> {
    let mut buffer = encode(command);
    push_word(&mut buffer, word);
    buffer
}

/// Opcode followed by a 32-bit value as two checksummed half words.
pub fn encode_dword(command: Command, value: u32, order: HalfOrder) -> Vec<u8> {
    let mut buffer = encode(command);
    for half in order.split(value) {
        push_word(&mut buffer, half);
    }
    buffer
}

fn push_word(buffer: &mut Vec<u8>, word: u16) {
    let bytes = word.to_be_bytes();
    buffer.extend_from_slice(&bytes);
    buffer.push(crc8(bytes));
}
