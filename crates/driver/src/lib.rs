//! Blocking `embedded-hal` driver for the Silicon Labs Si7021 humidity and temperature sensor.
//!
//! ```no_run
//! # fn run<I2C: embedded_hal::i2c::I2c, D: embedded_hal::delay::DelayNs>(i2c: I2C, delay: D)
//! # -> si7021::Result<(), I2C::Error> {
//! use si7021::{Config, Si7021};
//!
//! let mut sensor = Si7021::new(i2c, delay, Config::default())?;
//! let temperature = sensor.temperature()?;
//! let humidity = sensor.relative_humidity()?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), no_std)]

mod log;

pub mod command;
pub mod config;
pub mod error;
pub mod register;
pub mod session;
mod si7021;

pub use config::{Config, DEFAULT_ADDRESS, RetryPolicy};
pub use error::{BusyPhase, Error, Result};
pub use si7021::{
    HEATER_ENABLE, HEATER_LEVEL, MAX_HEATER_LEVEL, MeasurementKind, MeasurementState, Si7021,
    UnknownMeasurement,
};
pub use si7021_lib::identity::{DeviceIdentity, DeviceModel};
pub use si7021_lib::{crc8, signal_to_rh, signal_to_temp};
