//! Exclusive access to the sensor on its bus.
//!
//! Every transaction is made through a [`SessionGuard`]. The guard borrows the session mutably for
//! the duration of one logical transaction (which may be several bus operations, e.g. a
//! read-modify-write) and is released on every exit path when it goes out of scope.
//!
//! When several drivers share one physical bus, hand each of them a device from
//! `embedded-hal-bus` (`RefCellDevice`, `CriticalSectionDevice`, `MutexDevice`). Those lock the bus
//! for every operation, this module holds no state shared between drivers.

use embedded_hal::i2c::I2c;

use crate::error::{Error, Result};
use crate::log::trace;

/// A bus handle bound to the sensor's address.
pub struct DeviceSession<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> DeviceSession<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Starts a transaction.
    pub fn lock(&mut self) -> SessionGuard<'_, I2C> {
        trace!("session {:#x} acquired", self.address);
        SessionGuard { session: self }
    }

    /// Single write transaction.
    ///
    /// # Errors
    ///
    /// [`Error::I2c`] if the bus operation fails.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), I2C::Error> {
        self.lock().write(bytes)
    }

    /// Single read transaction.
    ///
    /// # Errors
    ///
    /// [`Error::I2c`] if the bus operation fails.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<(), I2C::Error> {
        self.lock().read(buffer)
    }

    /// Single write-then-read transaction.
    ///
    /// # Errors
    ///
    /// [`Error::I2c`] if the bus operation fails.
    pub fn write_read(&mut self, bytes: &[u8], buffer: &mut [u8]) -> Result<(), I2C::Error> {
        self.lock().write_read(bytes, buffer)
    }

    /// Gives the bus handle back.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

/// An ongoing transaction, see [`DeviceSession::lock`].
pub struct SessionGuard<'s, I2C: I2c> {
    session: &'s mut DeviceSession<I2C>,
}

impl<I2C: I2c> SessionGuard<'_, I2C> {
    /// # Errors
    ///
    /// [`Error::I2c`] if the bus operation fails.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), I2C::Error> {
        let address = self.session.address;
        self.session.i2c.write(address, bytes).map_err(Error::I2c)
    }

    /// # Errors
    ///
    /// [`Error::I2c`] if the bus operation fails.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<(), I2C::Error> {
        let address = self.session.address;
        self.session.i2c.read(address, buffer).map_err(Error::I2c)
    }

    /// Writes `bytes`, then reads into `buffer` after a repeated start.
    ///
    /// # Errors
    ///
    /// [`Error::I2c`] if the bus operation fails.
    pub fn write_read(&mut self, bytes: &[u8], buffer: &mut [u8]) -> Result<(), I2C::Error> {
        let address = self.session.address;
        self.session
            .i2c
            .write_read(address, bytes, buffer)
            .map_err(Error::I2c)
    }
}

impl<I2C: I2c> Drop for SessionGuard<'_, I2C> {
    fn drop(&mut self) {
        trace!("session {:#x} released", self.session.address);
    }
}
