//! I/O-free pieces of the Si70xx protocol: checksum, conversion formulas, identity decoding and
//! bit-field register layouts.

#![cfg_attr(not(test), no_std)]

pub mod bitfield;
pub mod identity;

use crc::{Algorithm, Crc};

// Si7021 datasheet section 5.1, same polynomial as the SHT2x family
/// The CRC-8 algorithm the Si70xx appends to every measurement.
///
/// Polynomial `x^8 + x^5 + x^4 + 1` (`0x131`, written here without the implicit top bit).
pub const CRC_8_SI70XX: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x31,
    init: 0x00,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xA2,
    residue: 0x00,
};

const CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_SI70XX);

/// Checksum of `data` as computed by the sensor.
#[must_use]
pub fn crc8(data: &[u8]) -> u8 {
    CRC.checksum(data)
}

/// Converts a raw humidity signal to relative humidity in percent.
///
/// The sensor can report slightly above 100 %RH near saturation, the result is clamped.
#[must_use]
pub fn signal_to_rh(data: u16) -> f64 {
    let rh = f64::from(data) * 125.0 / 65536.0 - 6.0;
    rh.min(100.0)
}

/// Converts a raw temperature signal to degrees celsius.
#[must_use]
pub fn signal_to_temp(data: u16) -> f64 {
    f64::from(data) * 175.72 / 65536.0 - 46.85
}
