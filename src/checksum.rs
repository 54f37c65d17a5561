// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Sensirion CRC-8 over one 2-byte packet payload.
//!
//! More info regarding the [algorithm](https://en.wikipedia.org/wiki/Computation_of_cyclic_redundancy_checks)

use crate::error::Sps30Error;

const POLYNOMIAL: u8 = 0x31;
const INIT: u8 = 0xFF;

/// Checksum of a single packet payload.
pub fn crc8(data: [u8; 2]) -> u8 {
    let mut rem = INIT;
    for byte in data {
        rem ^= byte;
        for _ in 0..8 {
            if (rem & 0x80) != 0 {
                rem = (rem << 1) ^ POLYNOMIAL;
            } else {
                rem <<= 1;
            }
        }
    }
    rem
}

/// Checksum over a byte slice, which must hold exactly the two
/// data bytes of one packet.
pub fn checksum(data: &[u8]) -> Result<u8, Sps30Error> {
    match *data {
        [b0, b1] => Ok(crc8([b0, b1])),
        _ => Err(Sps30Error::ChecksumInput { len: data.len() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datasheet_vector() {
        assert_eq!(crc8([0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn start_measurement_argument() {
        assert_eq!(crc8([0x03, 0x00]), 0xAC);
        assert_eq!(crc8([0x00, 0x00]), 0x81);
    }

    #[test]
    fn deterministic_over_all_pairs() {
        for b0 in 0..=255u8 {
            for b1 in (0..=255u8).step_by(17) {
                assert_eq!(crc8([b0, b1]), crc8([b0, b1]));
                assert_eq!(checksum(&[b0, b1]).unwrap(), crc8([b0, b1]));
            }
        }
    }

    #[test]
    fn wrong_input_length_is_an_error() {
        for data in [&[][..], &[0x01][..], &[0x01, 0x02, 0x03][..]] {
            match checksum(data) {
                Err(Sps30Error::ChecksumInput { len }) => assert_eq!(len, data.len()),
                other => panic!("expected ChecksumInput, got {:?}", other),
            }
        }
    }
}
