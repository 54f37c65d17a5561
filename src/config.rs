// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::time::Duration;

use crate::command::OutputFormat;

/// Wait after power on before the first measurement is trustworthy
pub const DEFAULT_BURN_IN: Duration = Duration::from_secs(20);

/// Session settings for an SPS30.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Config {
    /// Format the measurement is started with.
    pub output_format: OutputFormat,
    /// Frames averaged per reported measurement.
    pub rolling_window: usize,
    /// Blocking wait after the sensor answered the connection probe.
    pub burn_in: Duration,
    /// Log raw frames at debug level instead of trace.
    pub debug: bool,
    /// Sysfs GPIO wired to SCL, toggled during bus resets.
    pub scl_gpio: Option<u32>,
}

impl Config {
    /// Sets the measurement output format.
    pub fn output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    /// Sets the rolling window size. Values below 1 are treated as 1.
    pub fn rolling_window(mut self, rolling_window: usize) -> Self {
        self.rolling_window = rolling_window;
        self
    }

    /// Sets the wait after connecting.
    pub fn burn_in(mut self, burn_in: Duration) -> Self {
        self.burn_in = burn_in;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the exported GPIO line that doubles as SCL. Without one a
    /// bus reset cannot clock the bus free.
    pub fn scl_gpio(mut self, line: u32) -> Self {
        self.scl_gpio = Some(line);
        self
    }
}

/// Float output, no averaging, 20 s burn-in.
impl Default for Config {
    fn default() -> Config {
        Config {
            output_format: OutputFormat::Float,
            rolling_window: 1,
            burn_in: DEFAULT_BURN_IN,
            debug: false,
            scl_gpio: None,
        }
    }
}
