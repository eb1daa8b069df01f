//! Electronic serial number and model decoding.
//!
//! The serial number is read in two halves. The first answer interleaves four serial bytes with
//! their checksums, the second carries the model byte (`SNB_3`) first.

use byteorder::{BigEndian, ByteOrder};

/// Answer length of the first identification command.
pub const ID1_LEN: usize = 8;
/// Answer length of the second identification command.
pub const ID2_LEN: usize = 6;

/// Sensor model, from the first byte of the second identification answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceModel {
    EngineeringSample,
    Si7013,
    Si7020,
    Si7021,
    Unknown(u8),
}

impl DeviceModel {
    #[must_use]
    pub fn from_id_byte(byte: u8) -> Self {
        match byte {
            0x00 | 0xFF => Self::EngineeringSample,
            0x0D => Self::Si7013,
            0x14 => Self::Si7020,
            0x15 => Self::Si7021,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EngineeringSample => "Engineering sample",
            Self::Si7013 => "Si7013",
            Self::Si7020 => "Si7020",
            Self::Si7021 => "Si7021",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl core::fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serial number and model of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceIdentity {
    pub serial_number: u64,
    pub model: DeviceModel,
}

impl DeviceIdentity {
    /// Combines both identification answers.
    #[must_use]
    pub fn from_answers(id1: &[u8; ID1_LEN], id2: &[u8; ID2_LEN]) -> Self {
        let combined = [
            id1[0], id1[2], id1[4], id1[6], id2[0], id2[1], id2[3], id2[4],
        ];

        Self {
            serial_number: BigEndian::read_u64(&combined),
            model: DeviceModel::from_id_byte(id2[0]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID1: [u8; ID1_LEN] = [0x11, 0xA1, 0x22, 0xA2, 0x33, 0xA3, 0x44, 0xA4];

    #[test]
    fn serial_interleaving() {
        let id2 = [0x15, 0xFF, 0xB1, 0x66, 0x77, 0xB2];
        let identity = DeviceIdentity::from_answers(&ID1, &id2);

        assert_eq!(identity.serial_number, 0x1122_3344_15FF_6677);
        assert_eq!(identity.model, DeviceModel::Si7021);
    }

    #[test]
    fn models() {
        let cases = [
            (0x00, "Engineering sample"),
            (0xFF, "Engineering sample"),
            (0x0D, "Si7013"),
            (0x14, "Si7020"),
            (0x15, "Si7021"),
            (0x42, "Unknown"),
        ];

        for (byte, name) in cases {
            let id2 = [byte, 0, 0, 0, 0, 0];
            let identity = DeviceIdentity::from_answers(&ID1, &id2);
            assert_eq!(identity.model.as_str(), name);
            assert_eq!(identity.model.to_string(), name);
        }
        assert_eq!(DeviceModel::from_id_byte(0x42), DeviceModel::Unknown(0x42));
    }
}
