// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Raw bus access. The [`Bus`] trait is everything the driver needs from
//! the wire, [`LinuxBus`] implements it on top of `/dev/i2c-*`.

use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::{thread, time};

use crate::error::Sps30Error;

/// Default I2C character device
pub const DEFAULT_DEVICE: &str = "/dev/i2c-1";
/// Fixed SPS30 I2C address
pub const ADDRESS: u16 = 0x69;

/// Half-duplex bus with a single device at a fixed address.
pub trait Bus {
    /// Writes the whole buffer to the device.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Reads into `buf`, returning how many bytes the device delivered.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Whether [`Bus::clock_cycle`] can actually drive the clock line.
    fn drives_clock(&self) -> bool {
        true
    }

    /// Drives the clock line low then high once.
    fn clock_cycle(&mut self) -> io::Result<()>;

    /// Releases the lines and reopens the channel.
    fn reinit(&mut self) -> io::Result<()>;
}

fn to_io(e: LinuxI2CError) -> io::Error {
    io::Error::other(e.to_string())
}

/// Clock line exported through the sysfs GPIO interface.
#[derive(Debug)]
struct SysfsLine {
    root: PathBuf,
}

impl SysfsLine {
    fn new(line: u32) -> SysfsLine {
        SysfsLine::at(PathBuf::from(format!("/sys/class/gpio/gpio{}", line)))
    }

    fn at(root: PathBuf) -> SysfsLine {
        SysfsLine { root }
    }

    fn set(&self, high: bool) -> io::Result<()> {
        fs::write(self.root.join("direction"), "out")?;
        fs::write(self.root.join("value"), if high { "1" } else { "0" })
    }

    fn release(&self) -> io::Result<()> {
        fs::write(self.root.join("direction"), "in")
    }

    fn pulse(&self) -> io::Result<()> {
        let half_period = time::Duration::from_micros(10);
        self.set(false)?;
        thread::sleep(half_period);
        self.set(true)?;
        thread::sleep(half_period);
        Ok(())
    }
}

/// SPS30 on a Linux I2C adapter, wraps a LinuxI2CDevice.
///
/// Without a clock GPIO the bus reset can only reopen the adapter;
/// set one with [`LinuxBus::with_scl_gpio`] when the SCL pin is also
/// reachable as a GPIO line.
pub struct LinuxBus {
    path: PathBuf,
    address: u16,
    i2cdev: LinuxI2CDevice,
    scl: Option<SysfsLine>,
}

impl LinuxBus {
    /// Opens the adapter at `path` for the device at `address`.
    pub fn open<P: AsRef<Path>>(path: P, address: u16) -> Result<LinuxBus, Sps30Error> {
        let path = path.as_ref().to_path_buf();
        let i2cdev = LinuxI2CDevice::new(&path, address).map_err(|e| Sps30Error::Connection {
            address,
            reason: e.to_string(),
        })?;
        debug!("Opened {} for address {:#04x}", path.display(), address);
        Ok(LinuxBus {
            path,
            address,
            i2cdev,
            scl: None,
        })
    }

    /// Uses the sysfs GPIO `line` to toggle SCL during bus resets.
    /// The line must already be exported.
    pub fn with_scl_gpio(mut self, line: u32) -> Self {
        self.scl = Some(SysfsLine::new(line));
        self
    }
}

impl Bus for LinuxBus {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.i2cdev.write(bytes).map_err(to_io)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.i2cdev.read(buf).map_err(to_io)?;
        Ok(buf.len())
    }

    fn drives_clock(&self) -> bool {
        self.scl.is_some()
    }

    fn clock_cycle(&mut self) -> io::Result<()> {
        match &self.scl {
            Some(scl) => scl.pulse(),
            None => Err(io::Error::new(io::ErrorKind::Unsupported, "no SCL line")),
        }
    }

    fn reinit(&mut self) -> io::Result<()> {
        if let Some(scl) = &self.scl {
            scl.release()?;
        }
        self.i2cdev = LinuxI2CDevice::new(&self.path, self.address).map_err(to_io)?;
        Ok(())
    }
}
