//! [Datasheet Si7021-A20](https://www.silabs.com/documents/public/data-sheets/Si7021-A20.pdf)

use byteorder::{BigEndian, ByteOrder};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use si7021_lib::bitfield::BitField;
use si7021_lib::identity::{DeviceIdentity, DeviceModel, ID1_LEN, ID2_LEN};
use si7021_lib::{crc8, signal_to_rh, signal_to_temp};

use crate::command::{Command, USER1_RESET_VALUE};
use crate::config::Config;
use crate::error::{BusyPhase, Error, Result};
use crate::log::{debug, info, warn};
use crate::session::DeviceSession;

/// Heater on/off, bit 2 of USER1.
pub const HEATER_ENABLE: BitField =
    BitField::bit(Command::ReadUser1.code(), Command::WriteUser1.code(), 2);

/// Heater current, bits 0..=3 of the heater control register.
pub const HEATER_LEVEL: BitField = BitField::new(
    Command::ReadHeaterControl.code(),
    Command::WriteHeaterControl.code(),
    0,
    4,
);

pub const MAX_HEATER_LEVEL: u8 = 15;

// the sensor leaves the bus high while it converts
const BUSY_SENTINEL: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementKind {
    Humidity,
    Temperature,
}

impl MeasurementKind {
    #[must_use]
    pub const fn command(self) -> Command {
        match self {
            MeasurementKind::Humidity => Command::MeasureHumidity,
            MeasurementKind::Temperature => Command::MeasureTemperature,
        }
    }

    /// Converts a raw reading, to %RH or degrees celsius.
    #[must_use]
    pub fn convert(self, raw: u16) -> f64 {
        match self {
            MeasurementKind::Humidity => signal_to_rh(raw),
            MeasurementKind::Temperature => signal_to_temp(raw),
        }
    }
}

/// A command byte that does not start a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("{0:#04x} is not a measurement command")]
pub struct UnknownMeasurement(pub u8);

impl TryFrom<u8> for MeasurementKind {
    type Error = UnknownMeasurement;

    fn try_from(code: u8) -> core::result::Result<Self, Self::Error> {
        if code == Command::MeasureHumidity.code() {
            Ok(MeasurementKind::Humidity)
        } else if code == Command::MeasureTemperature.code() {
            Ok(MeasurementKind::Temperature)
        } else {
            Err(UnknownMeasurement(code))
        }
    }
}

/// Whether a conversion is running on the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementState {
    #[default]
    Idle,
    Pending(MeasurementKind),
}

/// The Si7021 humidity and temperature sensor. Also works for the `Si7013` and `Si7020`.
///
/// Uses blocking i2c. The sensor is polled while it converts, `D` paces that polling according to
/// the [`RetryPolicy`](crate::RetryPolicy).
pub struct Si7021<I2C, D> {
    session: DeviceSession<I2C>,
    delay: D,
    config: Config,
    state: MeasurementState,
}

impl<I2C: I2c, D: DelayNs> Si7021<I2C, D> {
    /// Resets the sensor and checks that it is one.
    ///
    /// The heater is switched off and set to its lowest level, whatever its power-on state.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedDeviceState`] if USER1 does not hold its reset value,
    /// [`Error::Timeout`] if the sensor does not come back from the reset,
    /// [`Error::I2c`] on any other bus error.
    pub fn new(i2c: I2C, delay: D, config: Config) -> Result<Self, I2C::Error> {
        let mut sensor = Self {
            session: DeviceSession::new(i2c, config.address),
            delay,
            config,
            state: MeasurementState::Idle,
        };
        sensor.reset()?;
        Ok(sensor)
    }

    /// [`Self::new`] with the default address and retry policy.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn new_default(i2c: I2C, delay: D) -> Result<Self, I2C::Error> {
        Self::new(i2c, delay, Config::default())
    }

    /// Soft resets the sensor and brings it back to a known configuration.
    ///
    /// Any pending measurement is dropped. This is also the way out after a checksum or device
    /// state error.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn reset(&mut self) -> Result<(), I2C::Error> {
        self.state = MeasurementState::Idle;
        self.send_command(Command::Reset)?;
        info!("reset sent to {:#x}", self.session.address());

        // while restarting, the sensor doesn't respond to reads or writes
        let user1 = self.poll(BusyPhase::Reset, |session| {
            let mut user1 = [0];
            session.write_read(Command::ReadUser1.bytes(), &mut user1)?;
            Ok(Some(user1[0]))
        })?;

        if user1 != USER1_RESET_VALUE {
            warn!(
                "bad USER1 register ({:#x} != {:#x})",
                user1, USER1_RESET_VALUE
            );
            return Err(Error::UnexpectedDeviceState {
                expected: USER1_RESET_VALUE,
                found: user1,
            });
        }

        self.set_heater_level(0)?;
        self.set_heater_enabled(false)?;

        debug!("sensor at {:#x} ready", self.session.address());
        Ok(())
    }

    // special commands only ACK, there is no answer to read
    fn send_command(&mut self, command: Command) -> Result<(), I2C::Error> {
        self.session.write(command.bytes())
    }

    /// Retries `attempt` while the sensor is busy.
    ///
    /// Busy is either a bus error or `Ok(None)`, other errors end the loop.
    fn poll<T>(
        &mut self,
        phase: BusyPhase,
        mut attempt: impl FnMut(&mut DeviceSession<I2C>) -> Result<Option<T>, I2C::Error>,
    ) -> Result<T, I2C::Error> {
        let retry = self.config.retry;

        for n in 1..=retry.max_attempts() {
            match attempt(&mut self.session) {
                Ok(Some(value)) => return Ok(value),
                Ok(None) | Err(Error::I2c(_)) => {
                    debug!("sensor busy ({:?}), attempt {}", phase, n);
                }
                Err(e) => return Err(e),
            }

            if retry.backoff_us() > 0 {
                self.delay.delay_us(retry.backoff_us());
            }
        }

        warn!(
            "sensor still busy ({:?}) after {} attempts",
            phase,
            retry.max_attempts()
        );
        Err(Error::Timeout {
            phase,
            attempts: retry.max_attempts(),
        })
    }

    /// Polls for the pending conversion's result and checks it.
    fn read_measurement(&mut self) -> Result<u16, I2C::Error> {
        let data = self.poll(BusyPhase::Measurement, |session| {
            let mut data = [BUSY_SENTINEL, 0, 0];
            session.read(&mut data)?;
            Ok((data[0] != BUSY_SENTINEL).then_some(data))
        })?;

        // datasheet section 5.1.2: MSB, LSB, checksum
        let raw = BigEndian::read_u16(&data[..2]);
        let sum = data[2];
        let calc_sum = crc8(&data[..2]);

        if sum != calc_sum {
            warn!(
                "checksum did not match (ours: {:#x} != sensor's: {:#x})",
                calc_sum, sum
            );
            return Err(Error::Checksum {
                expected: sum,
                computed: calc_sum,
            });
        }

        Ok(raw)
    }

    /// Starts a conversion and returns without waiting for it.
    ///
    /// Starting the kind that is already pending does nothing, the running conversion is left
    /// alone. Pick the result up with [`Self::measurement`] (or [`Self::temperature`] /
    /// [`Self::relative_humidity`]).
    ///
    /// # Errors
    ///
    /// [`Error::ConflictingMeasurement`] if a measurement of the other kind is pending,
    /// [`Error::I2c`] if the command could not be sent.
    pub fn start_measurement(&mut self, kind: MeasurementKind) -> Result<(), I2C::Error> {
        match self.state {
            MeasurementState::Idle => {
                self.send_command(kind.command())?;
                self.state = MeasurementState::Pending(kind);
                Ok(())
            }
            MeasurementState::Pending(pending) if pending == kind => Ok(()),
            MeasurementState::Pending(pending) => {
                warn!("{:?} measurement in progress, {:?} refused", pending, kind);
                Err(Error::ConflictingMeasurement {
                    pending,
                    requested: kind,
                })
            }
        }
    }

    /// Waits for a `kind` measurement and converts it, starting it first if needed.
    ///
    /// Once the result has been read the sensor is idle again, even when the checksum is wrong.
    /// After a [`Error::Timeout`] the measurement stays pending and can be picked up later.
    ///
    /// # Errors
    ///
    /// [`Error::ConflictingMeasurement`], [`Error::Checksum`], [`Error::Timeout`] or
    /// [`Error::I2c`].
    pub fn measurement(&mut self, kind: MeasurementKind) -> Result<f64, I2C::Error> {
        self.start_measurement(kind)?;

        let raw = match self.read_measurement() {
            Err(e @ Error::Timeout { .. }) => return Err(e),
            result => {
                self.state = MeasurementState::Idle;
                result?
            }
        };

        Ok(kind.convert(raw))
    }

    /// Temperature in degrees celsius.
    ///
    /// # Errors
    ///
    /// See [`Self::measurement`].
    pub fn temperature(&mut self) -> Result<f64, I2C::Error> {
        self.measurement(MeasurementKind::Temperature)
    }

    /// Relative humidity in percent, at most 100.
    ///
    /// Raw readings of `0xFF00` and above (about 118.5 %RH before clamping) start with the busy
    /// sentinel and are polled until [`Error::Timeout`].
    ///
    /// # Errors
    ///
    /// See [`Self::measurement`].
    pub fn relative_humidity(&mut self) -> Result<f64, I2C::Error> {
        self.measurement(MeasurementKind::Humidity)
    }

    /// # Errors
    ///
    /// Will error if there is an I2c error.
    pub fn heater_enabled(&mut self) -> Result<bool, I2C::Error> {
        self.session.read_flag(&HEATER_ENABLE)
    }

    /// # Errors
    ///
    /// Will error if there is an I2c error.
    pub fn set_heater_enabled(&mut self, enabled: bool) -> Result<(), I2C::Error> {
        self.session.write_flag(&HEATER_ENABLE, enabled)?;
        info!("heater enabled: {}", enabled);
        Ok(())
    }

    /// Heater current setting.
    ///
    /// | Level | Current (mA) |
    /// |-------|--------------|
    /// | 0     | 3.09         |
    /// | 1     | 9.18         |
    /// | 2     | 15.24        |
    /// | 4     | 27.39        |
    /// | 8     | 51.69        |
    /// | 15    | 94.20        |
    ///
    /// # Errors
    ///
    /// Will error if there is an I2c error.
    pub fn heater_level(&mut self) -> Result<u8, I2C::Error> {
        let level = self.session.read_field(&HEATER_LEVEL)?;
        // 4-bit unsigned field
        Ok(level as u8)
    }

    /// # Errors
    ///
    /// [`Error::InvalidHeaterLevel`] without touching the bus if `level` is above 15,
    /// [`Error::I2c`] on a bus error.
    pub fn set_heater_level(&mut self, level: u8) -> Result<(), I2C::Error> {
        if level > MAX_HEATER_LEVEL {
            return Err(Error::InvalidHeaterLevel(level));
        }
        self.session.write_field(&HEATER_LEVEL, i64::from(level))?;
        info!("heater level: {}", level);
        Ok(())
    }

    /// Reads both halves of the electronic serial number.
    ///
    /// # Errors
    ///
    /// Will error if there is an I2c error.
    pub fn device_identity(&mut self) -> Result<DeviceIdentity, I2C::Error> {
        let mut id1 = [0; ID1_LEN];
        self.session.write_read(Command::ReadId1.bytes(), &mut id1)?;

        let mut id2 = [0; ID2_LEN];
        self.session.write_read(Command::ReadId2.bytes(), &mut id2)?;

        Ok(DeviceIdentity::from_answers(&id1, &id2))
    }

    /// # Errors
    ///
    /// Will error if there is an I2c error.
    pub fn serial_number(&mut self) -> Result<u64, I2C::Error> {
        Ok(self.device_identity()?.serial_number)
    }

    /// The sensor model, see [`DeviceModel::as_str`] for its name.
    ///
    /// # Errors
    ///
    /// Will error if there is an I2c error.
    pub fn device_identifier(&mut self) -> Result<DeviceModel, I2C::Error> {
        Ok(self.device_identity()?.model)
    }

    pub fn measurement_state(&self) -> MeasurementState {
        self.state
    }

    pub fn address(&self) -> u8 {
        self.session.address()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Destroys the driver, giving back the bus and the delay.
    pub fn release(self) -> (I2C, D) {
        (self.session.release(), self.delay)
    }
}
