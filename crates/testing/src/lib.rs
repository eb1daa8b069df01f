//! Host-side stand-ins for the sensor, for tests that need a device with state rather than a
//! fixed list of expected transactions.

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use si7021_lib::crc8;

const NACK: ErrorKind = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);

/// A simulated Si7021.
///
/// Like the real part it NACKs everything for a while after a reset and NACKs reads while a
/// conversion runs. Every write that reached the device is recorded.
#[derive(Debug, Clone)]
pub struct SimulatedSi7021 {
    pub address: u8,
    pub user1: u8,
    pub heater_control: u8,
    pub humidity: u16,
    pub temperature: u16,
    pub id1: [u8; 8],
    pub id2: [u8; 6],
    /// Requests NACKed after a reset.
    pub reset_cycles: u32,
    /// Reads answered as busy after a measurement command.
    pub conversion_cycles: u32,
    /// Answer busy reads with `0xFF` bytes instead of a NACK.
    pub busy_sentinel: bool,
    /// Readings to send with a broken checksum.
    pub corrupt_readings: u32,
    pub writes: Vec<Vec<u8>>,
    pub resets: u32,
    resetting: u32,
    converting: u32,
    pending: Option<u8>,
    pointer: Option<u8>,
}

impl SimulatedSi7021 {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            user1: 0x3A,
            heater_control: 0x00,
            humidity: 0x7C80,
            temperature: 0x6648,
            id1: [0x11, 0xA1, 0x22, 0xA2, 0x33, 0xA3, 0x44, 0xA4],
            id2: [0x15, 0xFF, 0xB1, 0x66, 0x77, 0xB2],
            reset_cycles: 3,
            conversion_cycles: 2,
            busy_sentinel: false,
            corrupt_readings: 0,
            writes: Vec::new(),
            resets: 0,
            resetting: 0,
            converting: 0,
            pending: None,
            pointer: None,
        }
    }

    /// Writes to USER1 or the heater control register.
    pub fn register_writes(&self) -> impl Iterator<Item = &[u8]> {
        self.writes
            .iter()
            .map(Vec::as_slice)
            .filter(|write| matches!(write, [0xE6 | 0x51, _]))
    }

    fn still_resetting(&mut self) -> bool {
        if self.resetting > 0 {
            self.resetting -= 1;
            true
        } else {
            false
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        if self.still_resetting() {
            return Err(NACK);
        }
        self.writes.push(bytes.to_vec());

        match bytes {
            [0xFE] => {
                self.user1 = 0x3A;
                self.heater_control = 0x00;
                self.resetting = self.reset_cycles;
                self.pending = None;
                self.pointer = None;
                self.resets += 1;
            }
            [command @ (0xF5 | 0xF3)] => {
                self.pending = Some(*command);
                self.converting = self.conversion_cycles;
            }
            [0xE6, value] => self.user1 = *value,
            [0x51, value] => self.heater_control = *value,
            [register @ (0xE7 | 0x11)] => self.pointer = Some(*register),
            [0xFA, 0x0F] | [0xFC, 0xC9] => self.pointer = Some(bytes[0]),
            _ => return Err(ErrorKind::Other),
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), ErrorKind> {
        if self.still_resetting() {
            return Err(NACK);
        }

        if let Some(command) = self.pending {
            if self.converting > 0 {
                self.converting -= 1;
                if self.busy_sentinel {
                    buffer.fill(0xFF);
                    return Ok(());
                }
                return Err(NACK);
            }
            let raw = if command == 0xF5 {
                self.humidity
            } else {
                self.temperature
            };
            let [msb, lsb] = raw.to_be_bytes();
            let mut sum = crc8(&[msb, lsb]);
            if self.corrupt_readings > 0 {
                self.corrupt_readings -= 1;
                sum = !sum;
            }
            copy_answer(buffer, &[msb, lsb, sum]);
            self.pending = None;
            return Ok(());
        }

        // each register read selects its register again, anything else is NACKed
        match self.pointer.take() {
            Some(0xE7) => copy_answer(buffer, &[self.user1]),
            Some(0x11) => copy_answer(buffer, &[self.heater_control]),
            Some(0xFA) => copy_answer(buffer, &self.id1),
            Some(0xFC) => copy_answer(buffer, &self.id2),
            _ => return Err(NACK),
        }
        Ok(())
    }

    fn transfer(&mut self, operations: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
        for operation in operations {
            match operation {
                Operation::Write(bytes) => self.write(bytes)?,
                Operation::Read(buffer) => self.read(buffer)?,
            }
        }
        Ok(())
    }
}

fn copy_answer(buffer: &mut [u8], answer: &[u8]) {
    let len = buffer.len().min(answer.len());
    buffer[..len].copy_from_slice(&answer[..len]);
}

impl ErrorType for SimulatedSi7021 {
    type Error = ErrorKind;
}

impl I2c for SimulatedSi7021 {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.address {
            return Err(NACK);
        }
        self.transfer(operations)
    }
}

/// Several simulated sensors on one bus, dispatched by address.
#[derive(Debug, Default)]
pub struct SimulatedBus {
    pub devices: Vec<SimulatedSi7021>,
}

impl SimulatedBus {
    pub fn new(devices: impl IntoIterator<Item = SimulatedSi7021>) -> Self {
        Self {
            devices: devices.into_iter().collect(),
        }
    }

    pub fn device(&self, address: u8) -> Option<&SimulatedSi7021> {
        self.devices.iter().find(|device| device.address == address)
    }
}

impl ErrorType for SimulatedBus {
    type Error = ErrorKind;
}

impl I2c for SimulatedBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.devices
            .iter_mut()
            .find(|device| device.address == address)
            .ok_or(NACK)?
            .transfer(operations)
    }
}

struct Register {
    read_address: u8,
    write_address: u8,
    bytes: Vec<u8>,
}

/// A generic device with registers whose read and write addresses differ.
///
/// A single byte write selects the register to read, a longer write stores everything after the
/// first byte into the register with that write address.
#[derive(Default)]
pub struct RegisterFile {
    registers: Vec<Register>,
    pointer: Option<usize>,
    pub writes: Vec<Vec<u8>>,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_register(mut self, read_address: u8, write_address: u8, bytes: &[u8]) -> Self {
        self.registers.push(Register {
            read_address,
            write_address,
            bytes: bytes.to_vec(),
        });
        self
    }

    /// Current content of the register read at `read_address`.
    ///
    /// # Panics
    ///
    /// If there is no such register.
    pub fn register(&self, read_address: u8) -> &[u8] {
        &self
            .registers
            .iter()
            .find(|register| register.read_address == read_address)
            .expect("no register at this address")
            .bytes
    }
}

impl ErrorType for RegisterFile {
    type Error = ErrorKind;
}

impl I2c for RegisterFile {
    fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for operation in operations {
            match operation {
                Operation::Write([address]) => {
                    let index = self
                        .registers
                        .iter()
                        .position(|register| register.read_address == *address)
                        .ok_or(ErrorKind::Other)?;
                    self.pointer = Some(index);
                }
                Operation::Write([address, data @ ..]) => {
                    let register = self
                        .registers
                        .iter_mut()
                        .find(|register| register.write_address == *address)
                        .ok_or(ErrorKind::Other)?;
                    if data.len() != register.bytes.len() {
                        return Err(ErrorKind::Other);
                    }
                    register.bytes.copy_from_slice(data);
                    let mut write = vec![*address];
                    write.extend_from_slice(data);
                    self.writes.push(write);
                }
                Operation::Write([]) => return Err(ErrorKind::Other),
                Operation::Read(buffer) => {
                    let index = self.pointer.ok_or(ErrorKind::Other)?;
                    copy_answer(buffer, &self.registers[index].bytes);
                }
            }
        }
        Ok(())
    }
}
