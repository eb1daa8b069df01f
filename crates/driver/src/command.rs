//! The sensor's command set.
//!
//! | Command                | Bytes       | Answer                 |
//! |------------------------|-------------|------------------------|
//! | `Reset`                | `0xFE`      | none                   |
//! | `MeasureHumidity`      | `0xF5`      | 2 data + 1 CRC, polled |
//! | `MeasureTemperature`   | `0xF3`      | 2 data + 1 CRC, polled |
//! | `ReadUser1`            | `0xE7`      | 1 byte                 |
//! | `WriteUser1`           | `0xE6`      | none, takes 1 byte     |
//! | `ReadHeaterControl`    | `0x11`      | 1 byte                 |
//! | `WriteHeaterControl`   | `0x51`      | none, takes 1 byte     |
//! | `ReadId1`              | `0xFA 0x0F` | 8 bytes                |
//! | `ReadId2`              | `0xFC 0xC9` | 6 bytes                |

/// Value of USER1 right after a reset.
pub const USER1_RESET_VALUE: u8 = 0x3A;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Reset,
    /// No hold master mode, the sensor NACKs reads until the conversion is done.
    MeasureHumidity,
    /// No hold master mode.
    MeasureTemperature,
    ReadUser1,
    WriteUser1,
    ReadHeaterControl,
    WriteHeaterControl,
    ReadId1,
    ReadId2,
}

impl Command {
    /// The bytes put on the wire.
    #[must_use]
    pub const fn bytes(self) -> &'static [u8] {
        match self {
            Command::Reset => &[0xFE],
            Command::MeasureHumidity => &[0xF5],
            Command::MeasureTemperature => &[0xF3],
            Command::ReadUser1 => &[0xE7],
            Command::WriteUser1 => &[0xE6],
            Command::ReadHeaterControl => &[0x11],
            Command::WriteHeaterControl => &[0x51],
            Command::ReadId1 => &[0xFA, 0x0F],
            Command::ReadId2 => &[0xFC, 0xC9],
        }
    }

    /// First command byte, which doubles as the register address for register commands.
    #[must_use]
    pub const fn code(self) -> u8 {
        self.bytes()[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_pairs() {
        assert_eq!(Command::ReadUser1.code(), 0xE7);
        assert_eq!(Command::WriteUser1.code(), 0xE6);
        assert_eq!(Command::ReadHeaterControl.code(), 0x11);
        assert_eq!(Command::WriteHeaterControl.code(), 0x51);
    }

    #[test]
    fn id_commands_are_two_bytes() {
        assert_eq!(Command::ReadId1.bytes(), &[0xFA, 0x0F]);
        assert_eq!(Command::ReadId2.bytes(), &[0xFC, 0xC9]);
        assert_eq!(Command::ReadId2.code(), 0xFC);
    }
}
