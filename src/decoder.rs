// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Response decoding. Every 3-byte packet carries its own checksum and
//! is validated on its own; a value spanning two packets is only
//! reconstructed when both are intact.

use log::warn;
use std::fmt;

use crate::checksum::crc8;
use crate::command::HalfOrder;
use crate::error::Sps30Error;

/// Bytes per packet, two data bytes and the checksum
pub const PACKET_SIZE: usize = 3;

/// Two data bytes and the checksum the device sent for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub data: [u8; 2],
    pub checksum: u8,
}

impl Packet {
    pub fn is_valid(&self) -> bool {
        crc8(self.data) == self.checksum
    }

    pub fn word(&self) -> u16 {
        u16::from_be_bytes(self.data)
    }
}

/// A packet whose checksum did not match its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumMismatch {
    /// Packet index inside the response
    pub packet: usize,
    pub calculated: u8,
    pub received: u8,
}

impl fmt::Display for ChecksumMismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "checksum mismatch in packet {}: calculated {:#04x}, received {:#04x}",
            self.packet, self.calculated, self.received
        )
    }
}

/// Big endian IEEE754 single precision from the assembled word.
pub fn decode_f32(word: u32) -> f32 {
    f32::from_bits(word)
}

/// Raw response of one command, split into packets.
///
/// Field getters validate only the packets of that field and count
/// every failure in [`Response::checksum_errors`].
#[derive(Debug)]
pub struct Response<'a> {
    bytes: &'a [u8],
    checksum_errors: usize,
}

impl<'a> Response<'a> {
    /// Fails if `bytes` is not exactly `packets` packets long.
    pub fn new(bytes: &'a [u8], packets: usize) -> Result<Response<'a>, Sps30Error> {
        let expected = packets * PACKET_SIZE;
        if bytes.len() != expected {
            return Err(Sps30Error::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Response {
            bytes,
            checksum_errors: 0,
        })
    }

    pub fn packet_count(&self) -> usize {
        self.bytes.len() / PACKET_SIZE
    }

    pub fn checksum_errors(&self) -> usize {
        self.checksum_errors
    }

    /// Packet `index`, `None` past the end of the response.
    pub fn packet(&self, index: usize) -> Option<Packet> {
        let offset = index.checked_mul(PACKET_SIZE)?;
        match self.bytes.get(offset..offset.checked_add(PACKET_SIZE)?)? {
            &[a, b, checksum] => Some(Packet {
                data: [a, b],
                checksum,
            }),
            _ => None,
        }
    }

    // Callers index inside the length checked by `new`.
    fn checked(&mut self, index: usize) -> Result<Packet, ChecksumMismatch> {
        let offset = index * PACKET_SIZE;
        let packet = Packet {
            data: [self.bytes[offset], self.bytes[offset + 1]],
            checksum: self.bytes[offset + 2],
        };
        if packet.is_valid() {
            return Ok(packet);
        }
        self.checksum_errors += 1;
        let mismatch = ChecksumMismatch {
            packet: index,
            calculated: crc8(packet.data),
            received: packet.checksum,
        };
        warn!("{} (data {:02X?})", mismatch, packet.data);
        Err(mismatch)
    }

    /// 16-bit word from a single packet.
    pub(crate) fn word(&mut self, index: usize) -> Result<u16, ChecksumMismatch> {
        self.checked(index).map(|p| p.word())
    }

    /// 32-bit word from packets `first` and `first + 1`. Stops at the
    /// first bad packet.
    pub(crate) fn dword(
        &mut self,
        first: usize,
        order: HalfOrder,
    ) -> Result<u32, ChecksumMismatch> {
        let a = self.word(first)?;
        let b = self.word(first + 1)?;
        Ok(order.join(a, b))
    }

    /// Float from packets `first` and `first + 1`.
    pub(crate) fn float(&mut self, first: usize) -> Result<f32, ChecksumMismatch> {
        self.dword(first, HalfOrder::HighFirst).map(decode_f32)
    }

    /// All packets as ASCII, NUL bytes dropped and whitespace trimmed.
    pub fn ascii(&mut self) -> Result<String, ChecksumMismatch> {
        let mut text = String::with_capacity(self.packet_count() * 2);
        for index in 0..self.packet_count() {
            let packet = self.checked(index)?;
            for byte in packet.data {
                if byte != 0 {
                    text.push(char::from(byte));
                }
            }
        }
        Ok(text.trim().to_string())
    }
}
