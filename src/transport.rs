// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use log::{debug, error, log, warn, Level};
use std::io;
use std::{thread, time};

use crate::bus::Bus;
use crate::error::Sps30Error;

/// Clock cycles of the bus unstick sequence
pub const RESET_CLOCK_CYCLES: usize = 9;

/// Command/response channel to the sensor.
///
/// Any failed write or read resets the bus before the error is handed
/// back. Nothing is retried here.
pub struct Transport<B> {
    bus: B,
    dump_level: Level,
}

impl<B: Bus> Transport<B> {
    /// Wraps `bus`. With `verbose`, frame dumps are logged at debug
    /// level instead of trace.
    pub fn new(bus: B, verbose: bool) -> Transport<B> {
        Transport {
            bus,
            dump_level: if verbose { Level::Debug } else { Level::Trace },
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Sends `bytes` and then blocks for `settle` before returning.
    pub fn write(&mut self, bytes: &[u8], settle: time::Duration) -> Result<(), Sps30Error> {
        log!(
            self.dump_level,
            "-> {:02X?} (settle {} ms)",
            bytes,
            settle.as_millis()
        );
        if let Err(e) = self.bus.write(bytes) {
            error!("I2C write error: {}", e);
            self.bus_reset()?;
            return Err(Sps30Error::Transport(e));
        }
        if !settle.is_zero() {
            thread::sleep(settle);
        }
        Ok(())
    }

    /// Reads exactly `length` bytes.
    pub fn read(&mut self, length: usize) -> Result<Vec<u8>, Sps30Error> {
        let mut buffer = vec![0u8; length];
        let result = match self.bus.read(&mut buffer) {
            Ok(n) if n == length => Ok(()),
            Ok(n) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read: {} of {} bytes", n, length),
            )),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!("I2C read error: {}", e);
            self.bus_reset()?;
            return Err(Sps30Error::Transport(e));
        }
        log!(self.dump_level, "<- {:02X?}", buffer);
        Ok(buffer)
    }

    /// Frees a stuck bus by toggling the clock line nine times and
    /// reopening the channel. A bus that cannot drive the clock line
    /// is only reopened.
    pub fn bus_reset(&mut self) -> Result<(), Sps30Error> {
        warn!("Resetting I2C bus");
        if self.bus.drives_clock() {
            for _ in 0..RESET_CLOCK_CYCLES {
                self.bus.clock_cycle().map_err(Sps30Error::BusReset)?;
            }
        } else {
            warn!(
                "No clock line available, skipping {} clock cycles",
                RESET_CLOCK_CYCLES
            );
        }
        self.bus.reinit().map_err(Sps30Error::BusReset)?;
        debug!("I2C bus reinitialised");
        Ok(())
    }
}
