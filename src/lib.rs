// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! SPS30 driver implementing the Sensirion SPS30 particulate matter sensor
//! I2C protocol
//!
//! Operations taken from the [datasheet](https://sensirion.com/media/documents/8600FF88/616542B5/Sensirion_PM_Sensors_Datasheet_SPS30.pdf)
//!
//! Every response packet (two data bytes and a CRC-8) is checked on its own.
//! A measurement is only handed out when all three of its sections (mass
//! density, particle count, particle size) passed, optionally averaged over
//! the last N good frames.
//!
//! ## Basic Example
//!
//! Obtaining mass density, particle count and typical particle size
//!
//!
//!```no_run
//!use sps30_i2c::{Config, Sps30};
//!use std::thread;
//!use std::time::Duration;
//!
//!fn main() {
//!    // Open the I2C device, average over 3 frames
//!    let config = Config::default().rolling_window(3);
//!    let mut sps = Sps30::open("/dev/i2c-1", config).unwrap();
//!    sps.start_measurement().unwrap();
//!    thread::sleep(Duration::from_secs(8));
//!
//!    loop {
//!        match sps.read_measurement() {
//!            Ok(Some(m)) => {
//!                println!(
//!                    "PM2.5: {:.2} {} PC2.5: {:.0} {} size: {:.2} {}",
//!                    m.frame.mass_density.pm2_5,
//!                    m.units.mass_density,
//!                    m.frame.particle_count.pm2_5,
//!                    m.units.particle_count,
//!                    m.frame.particle_size,
//!                    m.units.particle_size
//!                );
//!            }
//!            Ok(None) => println!("No frame yet"),
//!            Err(e) => {
//!                println!(
//!                    "Error obtaining measurements. More details: {}. Waiting 10 seconds for recovering",
//!                    e
//!                );
//!                thread::sleep(Duration::from_secs(10));
//!            }
//!        }
//!        thread::sleep(Duration::from_secs(30));
//!    }
//!}
//!```
//!

pub mod bus;
pub mod checksum;
pub mod command;
pub mod config;
pub mod decoder;
pub mod error;
pub mod measurement;
pub mod rolling;
/// SPS30 device session and its public operations
pub mod sps30;
pub mod transport;

pub use bus::{Bus, LinuxBus};
pub use command::OutputFormat;
pub use config::Config;
pub use error::Sps30Error;
pub use measurement::{MassDensity, MeasurementFrame, ParticleCount, SectionValidity};
pub use sps30::{DeviceInfo, Measurement, Sps30, State};
