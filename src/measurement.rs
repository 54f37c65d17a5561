// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Measured values frame and its decoding from the read measured values
//! response.
//!
//! The response holds ten values in three sections: mass density (4),
//! particle count (5) and typical particle size (1). Each section is
//! validated on its own.

use log::debug;
use std::ops::{Add, Div};

use crate::command::OutputFormat;
use crate::decoder::{ChecksumMismatch, Response};
use crate::error::Sps30Error;

pub const MASS_DENSITY_UNIT: &str = "ug/m3";
pub const PARTICLE_COUNT_UNIT: &str = "#/cm3";
pub const PARTICLE_SIZE_UNIT: &str = "um";

const MASS_DENSITY_VALUES: usize = 4;
const PARTICLE_COUNT_VALUES: usize = 5;
const VALUES: usize = 10;

/// Mass concentration [µg/m³]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MassDensity {
    pub pm1_0: f32,
    pub pm2_5: f32,
    pub pm4_0: f32,
    pub pm10: f32,
}

/// Number concentration [#/cm³]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParticleCount {
    pub pm0_5: f32,
    pub pm1_0: f32,
    pub pm2_5: f32,
    pub pm4_0: f32,
    pub pm10: f32,
}

impl From<[f32; MASS_DENSITY_VALUES]> for MassDensity {
    fn from(v: [f32; MASS_DENSITY_VALUES]) -> Self {
        MassDensity {
            pm1_0: v[0],
            pm2_5: v[1],
            pm4_0: v[2],
            pm10: v[3],
        }
    }
}

impl From<[f32; PARTICLE_COUNT_VALUES]> for ParticleCount {
    fn from(v: [f32; PARTICLE_COUNT_VALUES]) -> Self {
        ParticleCount {
            pm0_5: v[0],
            pm1_0: v[1],
            pm2_5: v[2],
            pm4_0: v[3],
            pm10: v[4],
        }
    }
}

impl Add for MassDensity {
    type Output = MassDensity;

    fn add(self, o: MassDensity) -> MassDensity {
        MassDensity {
            pm1_0: self.pm1_0 + o.pm1_0,
            pm2_5: self.pm2_5 + o.pm2_5,
            pm4_0: self.pm4_0 + o.pm4_0,
            pm10: self.pm10 + o.pm10,
        }
    }
}

impl Div<f32> for MassDensity {
    type Output = MassDensity;

    fn div(self, n: f32) -> MassDensity {
        MassDensity {
            pm1_0: self.pm1_0 / n,
            pm2_5: self.pm2_5 / n,
            pm4_0: self.pm4_0 / n,
            pm10: self.pm10 / n,
        }
    }
}

impl Add for ParticleCount {
    type Output = ParticleCount;

    fn add(self, o: ParticleCount) -> ParticleCount {
        ParticleCount {
            pm0_5: self.pm0_5 + o.pm0_5,
            pm1_0: self.pm1_0 + o.pm1_0,
            pm2_5: self.pm2_5 + o.pm2_5,
            pm4_0: self.pm4_0 + o.pm4_0,
            pm10: self.pm10 + o.pm10,
        }
    }
}

impl Div<f32> for ParticleCount {
    type Output = ParticleCount;

    fn div(self, n: f32) -> ParticleCount {
        ParticleCount {
            pm0_5: self.pm0_5 / n,
            pm1_0: self.pm1_0 / n,
            pm2_5: self.pm2_5 / n,
            pm4_0: self.pm4_0 / n,
            pm10: self.pm10 / n,
        }
    }
}

/// Checksum outcome per section of one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionValidity {
    pub mass_density: bool,
    pub particle_count: bool,
    pub particle_size: bool,
}

impl SectionValidity {
    pub const ALL: SectionValidity = SectionValidity {
        mass_density: true,
        particle_count: true,
        particle_size: true,
    };

    pub fn all(&self) -> bool {
        self.mass_density && self.particle_count && self.particle_size
    }
}

/// One decoded measurement. Fields of an invalid section are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeasurementFrame {
    pub mass_density: MassDensity,
    pub particle_count: ParticleCount,
    /// Typical particle size [µm]
    pub particle_size: f32,
    pub validity: SectionValidity,
}

/// Frame decoded from one response plus the checksum failures found in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoded {
    pub frame: MeasurementFrame,
    pub checksum_errors: usize,
}

impl MeasurementFrame {
    /// Decodes a read measured values response.
    ///
    /// A bad packet zeroes its field and invalidates its section; the
    /// other fields are still decoded so every failure gets counted.
    /// Only a wrong response length is an error.
    pub fn decode(bytes: &[u8], format: OutputFormat) -> Result<Decoded, Sps30Error> {
        let per_value = format.packets_per_value();
        let mut response = Response::new(bytes, VALUES * per_value)?;

        let (mass, mass_ok) = section::<MASS_DENSITY_VALUES>(&mut response, 0, format);
        let (count, count_ok) =
            section::<PARTICLE_COUNT_VALUES>(&mut response, MASS_DENSITY_VALUES, format);
        let (size, size_ok) = section::<1>(
            &mut response,
            MASS_DENSITY_VALUES + PARTICLE_COUNT_VALUES,
            format,
        );

        let validity = SectionValidity {
            mass_density: mass_ok,
            particle_count: count_ok,
            particle_size: size_ok,
        };
        debug!(
            "Decoded frame: {:?}, {} checksum errors",
            validity,
            response.checksum_errors()
        );
        Ok(Decoded {
            frame: MeasurementFrame {
                mass_density: mass.into(),
                particle_count: count.into(),
                particle_size: size[0],
                validity,
            },
            checksum_errors: response.checksum_errors(),
        })
    }

    pub fn is_valid(&self) -> bool {
        self.validity.all()
    }
}

fn value(
    response: &mut Response,
    index: usize,
    format: OutputFormat,
) -> Result<f32, ChecksumMismatch> {
    match format {
        OutputFormat::Float => response.float(index * 2),
        OutputFormat::Integer => response.word(index).map(f32::from),
    }
}

fn section<const N: usize>(
    response: &mut Response,
    first: usize,
    format: OutputFormat,
) -> ([f32; N], bool) {
    let mut values = [0.0; N];
    let mut valid = true;
    for (i, v) in values.iter_mut().enumerate() {
        match value(response, first + i, format) {
            Ok(x) => *v = x,
            Err(_) => valid = false,
        }
    }
    (values, valid)
}
