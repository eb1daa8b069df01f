use si7021_lib::bitfield::FieldError;

use crate::si7021::{MeasurementKind, UnknownMeasurement};

/// The stage in which the sensor kept declining requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusyPhase {
    /// Waiting for the sensor to come back after a reset.
    Reset,
    /// Waiting for a conversion result.
    Measurement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The bus transaction failed outside of a busy wait.
    #[error("i2c error: {0:?}")]
    I2c(E),
    /// USER1 did not hold its reset value, this is likely not an Si70xx.
    #[error("unexpected device state (USER1 is {found:#04x}, expected {expected:#04x})")]
    UnexpectedDeviceState { expected: u8, found: u8 },
    /// Measurement data did not match its checksum. Never retried.
    #[error("measurement checksum did not match (sensor's: {expected:#04x} != ours: {computed:#04x})")]
    Checksum { expected: u8, computed: u8 },
    #[error("cannot start a {requested:?} measurement, {pending:?} measurement in progress")]
    ConflictingMeasurement {
        pending: MeasurementKind,
        requested: MeasurementKind,
    },
    #[error("heater level must be between 0 and 15, got {0}")]
    InvalidHeaterLevel(u8),
    #[error(transparent)]
    UnknownMeasurement(#[from] UnknownMeasurement),
    #[error(transparent)]
    Field(#[from] FieldError),
    /// The retry policy ran out while the sensor was busy.
    #[error("sensor still busy ({phase:?}) after {attempts} attempts")]
    Timeout { phase: BusyPhase, attempts: u32 },
}

pub type Result<T, E> = core::result::Result<T, Error<E>>;
