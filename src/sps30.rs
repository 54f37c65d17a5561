// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use log::{debug, info, warn};
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use std::thread;

use crate::bus::{Bus, LinuxBus, ADDRESS, DEFAULT_DEVICE};
use crate::command::{encode, encode_dword, encode_word, Command, HalfOrder};
use crate::config::Config;
use crate::decoder::{Response, PACKET_SIZE};
use crate::error::Sps30Error;
use crate::measurement::{
    MeasurementFrame, SectionValidity, MASS_DENSITY_UNIT, PARTICLE_COUNT_UNIT,
    PARTICLE_SIZE_UNIT,
};
use crate::rolling::RollingAverage;
use crate::transport::Transport;

const SECONDS_PER_DAY: u32 = 86_400;
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
const READY_POLL_ATTEMPTS: usize = 50;

/// Operating mode of the sensor as tracked by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Powered, fan off. Initial state and state after reset.
    Idle,
    /// Fan running, measured values available.
    Measuring,
    /// Low power, only wakeup is accepted.
    Sleeping,
}

/// Checksum failures seen by this session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChecksumStats {
    /// Every failed packet since construction or the last reset
    pub total: usize,
    /// Failed packets in the last measured values response
    pub last_measurement: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Device status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRegister(pub u32);

impl StatusRegister {
    const SPEED: u32 = 1 << 21;
    const LASER: u32 = 1 << 5;
    const FAN: u32 = 1 << 4;

    /// Fan speed too high or too low
    pub fn fan_speed_warning(&self) -> bool {
        self.0 & Self::SPEED != 0
    }

    pub fn laser_current_out_of_range(&self) -> bool {
        self.0 & Self::LASER != 0
    }

    /// Fan switched on but turning at 0 rpm
    pub fn fan_stalled(&self) -> bool {
        self.0 & Self::FAN != 0
    }
}

/// Units of the three measurement sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Units {
    pub mass_density: &'static str,
    pub particle_count: &'static str,
    pub particle_size: &'static str,
}

pub const UNITS: Units = Units {
    mass_density: MASS_DENSITY_UNIT,
    particle_count: PARTICLE_COUNT_UNIT,
    particle_size: PARTICLE_SIZE_UNIT,
};

/// Metadata attached to a reported measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementInfo {
    /// Time since the session was created
    pub timestamp: Duration,
    pub checksum_errors: usize,
    pub total_checksum_errors: usize,
    pub validity: SectionValidity,
    pub rolling_window: usize,
}

/// Fully validated (and possibly averaged) measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub frame: MeasurementFrame,
    pub units: Units,
    pub info: MeasurementInfo,
}

/// Everything the sensor reports about itself. Fields that failed
/// their checksum are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub product_type: Option<String>,
    pub serial_number: Option<String>,
    pub firmware_version: Option<FirmwareVersion>,
    pub address: u16,
    pub auto_cleaning_interval: Option<u32>,
    /// Whole days of the auto cleaning interval, 0 when unknown
    pub auto_cleaning_days: u32,
    pub is_measuring: bool,
    pub debug: bool,
    pub checksum_stats: ChecksumStats,
    pub validity: SectionValidity,
    pub status: Option<StatusRegister>,
}

/// SPS30 Struct, owns the transport to one sensor and
/// tracks its state and checksum statistics.
///
pub struct Sps30<B> {
    transport: Transport<B>,
    config: Config,
    state: State,
    validity: SectionValidity,
    stats: ChecksumStats,
    rolling: RollingAverage,
    started: Instant,
}

impl Sps30<LinuxBus> {
    /// Create a new SPS30 Struct
    ///
    /// Tries to create the device on `/dev/i2c-1` at the standard
    /// address 0x69 with the default configuration.
    ///
    pub fn new() -> Result<Sps30<LinuxBus>, Sps30Error> {
        Sps30::open(DEFAULT_DEVICE, Config::default())
    }

    /// Same as [`Sps30::new`] on another adapter and configuration.
    /// [`Config::scl_gpio`] is handed to the bus for resets.
    pub fn open<P: AsRef<Path>>(path: P, config: Config) -> Result<Self, Sps30Error> {
        let mut bus = LinuxBus::open(path, ADDRESS)?;
        match config.scl_gpio {
            Some(line) => bus = bus.with_scl_gpio(line),
            None => warn!("No SCL GPIO configured, bus resets will only reopen the adapter"),
        }
        Sps30::with_bus(bus, config)
    }
}

impl<B: Bus> Sps30<B> {
    /// Builds a session on `bus`, checks the sensor answers and waits
    /// for the configured burn-in.
    ///
    pub fn with_bus(bus: B, config: Config) -> Result<Sps30<B>, Sps30Error> {
        let rolling = RollingAverage::new(config.rolling_window);
        let mut sps = Sps30 {
            transport: Transport::new(bus, config.debug),
            config: config.rolling_window(rolling.window()),
            state: State::Idle,
            validity: SectionValidity::default(),
            stats: ChecksumStats::default(),
            rolling,
            started: Instant::now(),
        };
        sps.probe().map_err(|e| Sps30Error::Connection {
            address: ADDRESS,
            reason: e.to_string(),
        })?;
        info!("SPS30 connected at address {:#04x}", ADDRESS);
        if !config.burn_in.is_zero() {
            debug!("Initial burn-in of {} s", config.burn_in.as_secs());
            thread::sleep(config.burn_in);
        }
        Ok(sps)
    }

    fn probe(&mut self) -> Result<(), Sps30Error> {
        self.query(Command::FirmwareVersion).map(|_| ())
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_measuring(&self) -> bool {
        self.state == State::Measuring
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn checksum_stats(&self) -> ChecksumStats {
        self.stats
    }

    /// Section validity of the last measurement attempt.
    pub fn validity(&self) -> SectionValidity {
        self.validity
    }

    pub fn rolling_window(&self) -> usize {
        self.rolling.window()
    }

    /// Changes the number of frames averaged per measurement. Frames
    /// buffered for the previous size are dropped.
    pub fn set_rolling_window(&mut self, window: usize) {
        self.rolling.set_window(window);
        self.config.rolling_window = self.rolling.window();
    }

    pub fn bus(&self) -> &B {
        self.transport.bus()
    }

    pub fn bus_mut(&mut self) -> &mut B {
        self.transport.bus_mut()
    }

    /// Forces the bus unstick sequence outside of error recovery.
    pub fn bus_reset(&mut self) -> Result<(), Sps30Error> {
        self.transport.bus_reset()
    }

    fn require(&self, operation: &'static str, allowed: &[State]) -> Result<(), Sps30Error> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Sps30Error::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn send(&mut self, command: Command) -> Result<(), Sps30Error> {
        self.transport.write(&encode(command), command.settle_time())
    }

    fn query(&mut self, command: Command) -> Result<Vec<u8>, Sps30Error> {
        self.send(command)?;
        self.transport
            .read(command.response_len(self.config.output_format))
    }

    fn tally(&mut self, response: &Response) {
        self.stats.total += response.checksum_errors();
    }

    /// Starts continuous measurement in the configured output format.
    /// The fan starts and the previous section validity is cleared.
    ///
    pub fn start_measurement(&mut self) -> Result<(), Sps30Error> {
        self.require("start_measurement", &[State::Idle])?;
        let argument = self.config.output_format.argument();
        debug!(
            "Starting measurement ({:?} output)",
            self.config.output_format
        );
        self.transport.write(
            &encode_word(Command::StartMeasurement, argument),
            Command::StartMeasurement.settle_time(),
        )?;
        self.state = State::Measuring;
        self.validity = SectionValidity::default();
        self.rolling.clear();
        Ok(())
    }

    /// Stops the measurement and the fan.
    pub fn stop_measurement(&mut self) -> Result<(), Sps30Error> {
        self.require("stop_measurement", &[State::Idle, State::Measuring])?;
        debug!("Stopping measurement");
        self.send(Command::StopMeasurement)?;
        self.state = State::Idle;
        Ok(())
    }

    /// Gets if the device has a new measurement ready.
    /// A flag failing its checksum reads as not ready.
    pub fn read_data_ready(&mut self) -> Result<bool, Sps30Error> {
        self.require("read_data_ready", &[State::Idle, State::Measuring])?;
        let bytes = self.query(Command::ReadDataReady)?;
        let mut response = Response::new(&bytes, 1)?;
        let ready = response.word(0).map(|w| w & 0x00FF == 0x01);
        self.tally(&response);
        Ok(ready.unwrap_or(false))
    }

    /// Reads one measurement.
    ///
    /// Returns `Ok(None)` when the sensor is not measuring (without
    /// touching the bus), when no new data is ready, when any section
    /// fails its checksum and while the rolling window is filling up.
    /// Transport and length failures are errors.
    ///
    pub fn read_measurement(&mut self) -> Result<Option<Measurement>, Sps30Error> {
        if self.state != State::Measuring {
            warn!("read_measurement: sensor is not measuring ({:?})", self.state);
            return Ok(None);
        }
        let frame = match self.read_frame()? {
            Some(frame) => frame,
            None => return Ok(None),
        };

        match self.rolling.push(frame) {
            Some(frame) => Ok(Some(self.measurement(frame, self.rolling.window()))),
            None => {
                debug!(
                    "[rolling] waiting for {} clean frames, have {}",
                    self.rolling.window(),
                    self.rolling.len()
                );
                Ok(None)
            }
        }
    }

    /// One accepted frame straight from the device, not averaged.
    fn read_frame(&mut self) -> Result<Option<MeasurementFrame>, Sps30Error> {
        self.validity = SectionValidity::default();
        if !self.read_data_ready()? {
            debug!("No new measurement ready");
            return Ok(None);
        }

        let bytes = self.query(Command::ReadMeasuredValues)?;
        let decoded = MeasurementFrame::decode(&bytes, self.config.output_format)?;
        self.stats.last_measurement = decoded.checksum_errors;
        self.stats.total += decoded.checksum_errors;
        self.validity = decoded.frame.validity;

        if !decoded.frame.is_valid() {
            warn!(
                "Frame rejected, {} checksum errors ({:?})",
                decoded.checksum_errors, self.validity
            );
            return Ok(None);
        }
        Ok(Some(decoded.frame))
    }

    fn measurement(&self, frame: MeasurementFrame, rolling_window: usize) -> Measurement {
        Measurement {
            frame,
            units: UNITS,
            info: MeasurementInfo {
                timestamp: self.started.elapsed(),
                checksum_errors: self.stats.last_measurement,
                total_checksum_errors: self.stats.total,
                validity: self.validity,
                rolling_window,
            },
        }
    }

    /// Puts the sensor in sleep mode, only wakeup and reset are
    /// accepted afterwards.
    pub fn sleep(&mut self) -> Result<(), Sps30Error> {
        self.require("sleep", &[State::Idle, State::Measuring])?;
        debug!("Entering sleep");
        self.send(Command::Sleep)?;
        self.state = State::Sleeping;
        Ok(())
    }

    /// Wakes the sensor up, blocking for the wake up time before returning.
    pub fn wakeup(&mut self) -> Result<(), Sps30Error> {
        self.require("wakeup", &[State::Sleeping])?;
        debug!("Waking up");
        self.send(Command::Wakeup)?;
        self.state = State::Idle;
        Ok(())
    }

    /// Runs the fan at full speed to blow out dust. Needs a running
    /// measurement.
    pub fn start_fan_cleaning(&mut self) -> Result<(), Sps30Error> {
        if self.state != State::Measuring {
            return Err(Sps30Error::NotMeasuring {
                operation: "start_fan_cleaning",
            });
        }
        debug!("Starting fan cleaning");
        self.send(Command::StartFanCleaning)
    }

    /// Auto cleaning interval in seconds, 0 when disabled.
    pub fn auto_cleaning_interval(&mut self) -> Result<Option<u32>, Sps30Error> {
        self.require("auto_cleaning_interval", &[State::Idle, State::Measuring])?;
        let bytes = self.query(Command::AutoCleaningInterval)?;
        let mut response = Response::new(&bytes, 2)?;
        let seconds = response.dword(0, HalfOrder::LowFirst).ok();
        self.tally(&response);
        Ok(seconds)
    }

    /// Sets the auto cleaning interval in seconds. The device expects
    /// the low half word first.
    pub fn set_auto_cleaning_interval(&mut self, seconds: u32) -> Result<(), Sps30Error> {
        self.require(
            "set_auto_cleaning_interval",
            &[State::Idle, State::Measuring],
        )?;
        debug!("Setting auto cleaning interval to {} s", seconds);
        let command = Command::AutoCleaningInterval;
        self.transport.write(
            &encode_dword(command, seconds, HalfOrder::LowFirst),
            command.settle_time(),
        )
    }

    /// Sets the auto cleaning interval in days and reads it back.
    pub fn set_auto_cleaning_interval_days(
        &mut self,
        days: u32,
    ) -> Result<Option<u32>, Sps30Error> {
        let seconds = days.checked_mul(SECONDS_PER_DAY).ok_or_else(|| {
            Sps30Error::InvalidArgument(format!("{} days overflow the interval", days))
        })?;
        self.set_auto_cleaning_interval(seconds)?;
        let read_back = self.auto_cleaning_interval()?;
        if let Some(value) = read_back {
            if value != seconds {
                warn!(
                    "Auto cleaning interval reads back {} s, wrote {} s",
                    value, seconds
                );
            }
        }
        Ok(read_back)
    }

    fn read_string(&mut self, command: Command) -> Result<Option<String>, Sps30Error> {
        let packets = command.response_len(self.config.output_format) / PACKET_SIZE;
        let bytes = self.query(command)?;
        let mut response = Response::new(&bytes, packets)?;
        let text = response.ascii().ok();
        self.tally(&response);
        Ok(text)
    }

    /// Product type, "00080000" for the SPS30.
    pub fn product_type(&mut self) -> Result<Option<String>, Sps30Error> {
        self.require("product_type", &[State::Idle, State::Measuring])?;
        self.read_string(Command::ProductType)
    }

    pub fn serial_number(&mut self) -> Result<Option<String>, Sps30Error> {
        self.require("serial_number", &[State::Idle, State::Measuring])?;
        self.read_string(Command::SerialNumber)
    }

    pub fn firmware_version(&mut self) -> Result<Option<FirmwareVersion>, Sps30Error> {
        self.require("firmware_version", &[State::Idle, State::Measuring])?;
        let bytes = self.query(Command::FirmwareVersion)?;
        let mut response = Response::new(&bytes, 1)?;
        let version = response.word(0).ok().map(|w| {
            let [major, minor] = w.to_be_bytes();
            FirmwareVersion { major, minor }
        });
        self.tally(&response);
        Ok(version)
    }

    pub fn read_status_register(&mut self) -> Result<Option<StatusRegister>, Sps30Error> {
        self.require("read_status_register", &[State::Idle, State::Measuring])?;
        let bytes = self.query(Command::ReadStatusRegister)?;
        let mut response = Response::new(&bytes, 2)?;
        let status = response
            .dword(0, HalfOrder::HighFirst)
            .ok()
            .map(StatusRegister);
        self.tally(&response);
        Ok(status)
    }

    pub fn clear_status_register(&mut self) -> Result<(), Sps30Error> {
        self.require("clear_status_register", &[State::Idle, State::Measuring])?;
        self.send(Command::ClearStatusRegister)
    }

    /// Soft reset the sensor device. Back to idle, checksum
    /// statistics zeroed.
    ///
    pub fn reset(&mut self) -> Result<(), Sps30Error> {
        debug!("Soft reset");
        self.send(Command::Reset)?;
        self.state = State::Idle;
        self.stats = ChecksumStats::default();
        self.validity = SectionValidity::default();
        self.rolling.clear();
        Ok(())
    }

    /// Reads product, serial, firmware, cleaning interval and status in
    /// one go, together with the session statistics.
    pub fn device_info(&mut self) -> Result<DeviceInfo, Sps30Error> {
        let auto_cleaning_interval = self.auto_cleaning_interval()?;
        Ok(DeviceInfo {
            product_type: self.product_type()?,
            serial_number: self.serial_number()?,
            firmware_version: self.firmware_version()?,
            address: ADDRESS,
            auto_cleaning_interval,
            auto_cleaning_days: auto_cleaning_interval.map_or(0, |s| s / SECONDS_PER_DAY),
            is_measuring: self.is_measuring(),
            debug: self.config.debug,
            status: self.read_status_register()?,
            checksum_stats: self.stats,
            validity: self.validity,
        })
    }

    /// Starts a measurement, waits `stabilization`, then takes `count`
    /// measurements `interval` apart. Every accepted frame is returned
    /// as read, the rolling window is not applied. The measurement is
    /// always stopped at the end.
    ///
    pub fn measurement_series(
        &mut self,
        count: usize,
        interval: Duration,
        stabilization: Duration,
    ) -> Result<Vec<Measurement>, Sps30Error> {
        self.start_measurement()?;
        thread::sleep(stabilization);
        let series = self.collect_series(count, interval);
        let stopped = self.stop_measurement();
        let series = series?;
        stopped?;
        info!("Measurement series: {} of {} valid", series.len(), count);
        Ok(series)
    }

    fn collect_series(
        &mut self,
        count: usize,
        interval: Duration,
    ) -> Result<Vec<Measurement>, Sps30Error> {
        let mut series = Vec::with_capacity(count);
        for i in 0..count {
            if self.wait_data_ready()? {
                match self.read_frame()? {
                    Some(frame) => series.push(self.measurement(frame, 1)),
                    None => warn!("Measurement {} of {} invalid", i + 1, count),
                }
            } else {
                warn!("Timed out waiting for measurement {} of {}", i + 1, count);
            }
            if i + 1 < count {
                thread::sleep(interval);
            }
        }
        Ok(series)
    }

    fn wait_data_ready(&mut self) -> Result<bool, Sps30Error> {
        for _ in 0..READY_POLL_ATTEMPTS {
            if self.read_data_ready()? {
                return Ok(true);
            }
            thread::sleep(READY_POLL_INTERVAL);
        }
        Ok(false)
    }
}
