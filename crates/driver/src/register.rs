//! Reading and writing [`BitField`]s through a [`DeviceSession`].
//!
//! The register is read through the field's read address with a write-then-read. Setting a field
//! is a read-modify-write within a single transaction: only the field's bits change, then the
//! whole register is written back through the write address.

use embedded_hal::i2c::I2c;
use si7021_lib::bitfield::BitField;

use crate::error::Result;
use crate::log::trace;
use crate::session::{DeviceSession, SessionGuard};

// command byte followed by the widest register
const BUFFER_LEN: usize = 1 + BitField::MAX_REGISTER_WIDTH as usize;

fn fetch<I2C: I2c>(
    guard: &mut SessionGuard<'_, I2C>,
    field: &BitField,
    buffer: &mut [u8; BUFFER_LEN],
) -> Result<(), I2C::Error> {
    let width = field.register_width();
    guard.write_read(&[field.read_address()], &mut buffer[1..=width])?;
    trace!(
        "register {:#x} read as {=[u8]:#x}",
        field.read_address(),
        &buffer[1..=width]
    );
    Ok(())
}

fn store<I2C: I2c>(
    guard: &mut SessionGuard<'_, I2C>,
    field: &BitField,
    buffer: &mut [u8; BUFFER_LEN],
) -> Result<(), I2C::Error> {
    let width = field.register_width();
    buffer[0] = field.write_address();
    guard.write(&buffer[..=width])
}

impl<I2C: I2c> DeviceSession<I2C> {
    /// Reads `field`, sign extended if it is signed.
    ///
    /// # Errors
    ///
    /// [`crate::Error::I2c`] if the bus operation fails.
    pub fn read_field(&mut self, field: &BitField) -> Result<i64, I2C::Error> {
        let mut buffer = [0; BUFFER_LEN];
        fetch(&mut self.lock(), field, &mut buffer)?;
        Ok(field.decode(&buffer[1..]))
    }

    /// Replaces `field` with `value`, keeping the rest of the register.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Field`] without touching the bus if `value` does not fit the field,
    /// [`crate::Error::I2c`] if a bus operation fails.
    pub fn write_field(&mut self, field: &BitField, value: i64) -> Result<(), I2C::Error> {
        field.check_value(value)?;

        let mut buffer = [0; BUFFER_LEN];
        let mut guard = self.lock();
        fetch(&mut guard, field, &mut buffer)?;
        field.encode(&mut buffer[1..], value)?;
        store(&mut guard, field, &mut buffer)
    }

    /// Reads a single bit field.
    ///
    /// # Errors
    ///
    /// [`crate::Error::I2c`] if the bus operation fails.
    pub fn read_flag(&mut self, field: &BitField) -> Result<bool, I2C::Error> {
        let mut buffer = [0; BUFFER_LEN];
        fetch(&mut self.lock(), field, &mut buffer)?;
        Ok(field.decode_flag(&buffer[1..]))
    }

    /// Sets or clears every bit of `field`, keeping the rest of the register.
    ///
    /// # Errors
    ///
    /// [`crate::Error::I2c`] if a bus operation fails.
    pub fn write_flag(&mut self, field: &BitField, value: bool) -> Result<(), I2C::Error> {
        let mut buffer = [0; BUFFER_LEN];
        let mut guard = self.lock();
        fetch(&mut guard, field, &mut buffer)?;
        field.encode_flag(&mut buffer[1..], value);
        store(&mut guard, field, &mut buffer)
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};
    use si7021_lib::bitfield::{BitOrder, FieldError};

    use super::*;
    use crate::Error;

    const ADDR: u8 = 0x40;

    #[test]
    fn read_uses_read_address() {
        let field = BitField::new(0x11, 0x51, 0, 4);
        let expectations = [Transaction::write_read(ADDR, vec![0x11], vec![0xF7])];
        let mut session = DeviceSession::new(I2cMock::new(&expectations), ADDR);

        assert_eq!(session.read_field(&field), Ok(7));

        session.release().done();
    }

    #[test]
    fn write_is_read_modify_write() {
        let field = BitField::new(0x11, 0x51, 0, 4);
        let expectations = [
            Transaction::write_read(ADDR, vec![0x11], vec![0xF7]),
            Transaction::write(ADDR, vec![0x51, 0xF3]),
        ];
        let mut session = DeviceSession::new(I2cMock::new(&expectations), ADDR);

        session.write_field(&field, 3).unwrap();

        session.release().done();
    }

    #[test]
    fn flag_round_trip() {
        let field = BitField::bit(0xE7, 0xE6, 2);
        let expectations = [
            Transaction::write_read(ADDR, vec![0xE7], vec![0x3A]),
            Transaction::write(ADDR, vec![0xE6, 0x3E]),
            Transaction::write_read(ADDR, vec![0xE7], vec![0x3E]),
        ];
        let mut session = DeviceSession::new(I2cMock::new(&expectations), ADDR);

        session.write_flag(&field, true).unwrap();
        assert_eq!(session.read_flag(&field), Ok(true));

        session.release().done();
    }

    #[test]
    fn multi_byte_register() {
        let field = BitField::in_register(0x20, 0x21, 4, 8, 2, BitOrder::MsbFirst);
        let expectations = [
            Transaction::write_read(ADDR, vec![0x20], vec![0xAB, 0xCD]),
            Transaction::write(ADDR, vec![0x21, 0xA1, 0x2D]),
        ];
        let mut session = DeviceSession::new(I2cMock::new(&expectations), ADDR);

        session.write_field(&field, 0x12).unwrap();

        session.release().done();
    }

    #[test]
    fn out_of_range_value_skips_the_bus() {
        let field = BitField::new(0x11, 0x51, 0, 4);
        let mut session = DeviceSession::new(I2cMock::new(&[]), ADDR);

        assert_eq!(
            session.write_field(&field, 16),
            Err(Error::Field(FieldError::ValueOutOfRange {
                value: 16,
                num_bits: 4
            }))
        );

        session.release().done();
    }

    #[test]
    fn failed_read_skips_the_write() {
        let field = BitField::bit(0xE7, 0xE6, 2);
        let expectations =
            [Transaction::write_read(ADDR, vec![0xE7], vec![0x00]).with_error(ErrorKind::Other)];
        let mut session = DeviceSession::new(I2cMock::new(&expectations), ADDR);

        assert_eq!(
            session.write_flag(&field, true),
            Err(Error::I2c(ErrorKind::Other))
        );

        session.release().done();
    }
}
