// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;
use thiserror::Error;

use crate::sps30::State;

///
///SPS30 error enum. Transport errors wrap the Io error
///returned by the bus, after a bus reset has been attempted.
///Checksum failures of single packets are not listed here,
///they only invalidate the field they belong to.
///
#[derive(Error, Debug)]
pub enum Sps30Error {
    /// The sensor did not answer the connection probe
    #[error("SPS30 not found at address {address:#04x}: {reason}")]
    Connection { address: u16, reason: String },

    /// Write or read on the bus failed
    #[error("I2C transport error: {0}")]
    Transport(#[from] io::Error),

    /// The clock toggle recovery itself failed, nothing left to try
    #[error("I2C bus reset failed: {0}")]
    BusReset(io::Error),

    /// The checksum is only defined over exactly two bytes
    #[error("checksum needs exactly 2 bytes, got {len}")]
    ChecksumInput { len: usize },

    #[error("response length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Operation needs a running measurement
    #[error("{operation} requires the sensor to be measuring")]
    NotMeasuring { operation: &'static str },

    #[error("{operation} is not allowed while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: State,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
