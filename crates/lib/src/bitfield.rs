//! Layout of a logical field stored inside a byte-addressed register.
//!
//! A [`BitField`] only describes *where* the bits live and how to pack them. The bus side
//! (reading the register through its read address, writing it back through its write address)
//! lives in the driver crate.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Byte order of a multi-byte register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// The first byte on the wire is the least significant one.
    LsbFirst,
    /// The first byte on the wire is the most significant one.
    MsbFirst,
}

/// A field layout that cannot exist in the register it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutError {
    #[error("register width must be 1 to 8 bytes, got {0}")]
    RegisterWidth(u8),
    #[error("a field needs at least one bit")]
    Empty,
    #[error("unsigned fields are limited to 63 bits")]
    TooWide,
    #[error("field ends at bit {end} but the register only has {available} bits")]
    Overflow { end: u16, available: u16 },
}

/// A value that cannot be stored in a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldError {
    #[error("{value} does not fit in a {num_bits}-bit field")]
    ValueOutOfRange { value: i64, num_bits: u8 },
}

/// Describes a single bit or a run of bits inside a register whose read and write addresses
/// may differ.
///
/// `lowest_bit` counts from the least significant bit of the whole register, after its bytes
/// have been assembled according to [`BitOrder`].
///
/// Layouts built with the `const` constructors are checked at compile time when bound to a
/// `const` item:
///
/// ```
/// use si7021_lib::bitfield::{BitField, BitOrder};
///
/// const LEVEL: BitField = BitField::new(0x11, 0x51, 0, 4);
/// assert_eq!(LEVEL.mask(), 0x0F);
///
/// const WIDE: BitField = BitField::in_register(0x20, 0x21, 4, 8, 2, BitOrder::MsbFirst);
/// assert_eq!(WIDE.mask(), 0x0FF0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitField {
    read_address: u8,
    write_address: u8,
    lowest_bit: u8,
    num_bits: u8,
    register_width: u8,
    order: BitOrder,
    signed: bool,
}

impl BitField {
    pub const MAX_REGISTER_WIDTH: u8 = 8;

    /// A single bit of a one byte register.
    ///
    /// # Panics
    ///
    /// If `bit` is not within the register.
    #[must_use]
    pub const fn bit(read_address: u8, write_address: u8, bit: u8) -> Self {
        Self::new(read_address, write_address, bit, 1)
    }

    /// An unsigned `num_bits` wide field of a one byte register.
    ///
    /// # Panics
    ///
    /// If the field does not fit the register. In a `const` this is a compile error.
    #[must_use]
    pub const fn new(read_address: u8, write_address: u8, lowest_bit: u8, num_bits: u8) -> Self {
        Self::in_register(
            read_address,
            write_address,
            lowest_bit,
            num_bits,
            1,
            BitOrder::LsbFirst,
        )
    }

    /// An unsigned field of a `register_width` byte register.
    ///
    /// # Panics
    ///
    /// If the field does not fit the register. In a `const` this is a compile error.
    #[must_use]
    pub const fn in_register(
        read_address: u8,
        write_address: u8,
        lowest_bit: u8,
        num_bits: u8,
        register_width: u8,
        order: BitOrder,
    ) -> Self {
        match Self::try_new(
            read_address,
            write_address,
            lowest_bit,
            num_bits,
            register_width,
            order,
            false,
        ) {
            Ok(field) => field,
            Err(_) => panic!("bit-field does not fit its register"),
        }
    }

    /// Interprets the field as two's complement.
    #[must_use]
    pub const fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    /// Builds a layout, reporting why it is impossible instead of panicking.
    ///
    /// # Errors
    ///
    /// See [`LayoutError`].
    pub const fn try_new(
        read_address: u8,
        write_address: u8,
        lowest_bit: u8,
        num_bits: u8,
        register_width: u8,
        order: BitOrder,
        signed: bool,
    ) -> Result<Self, LayoutError> {
        if register_width == 0 || register_width > Self::MAX_REGISTER_WIDTH {
            return Err(LayoutError::RegisterWidth(register_width));
        }
        if num_bits == 0 {
            return Err(LayoutError::Empty);
        }
        if !signed && num_bits > 63 {
            return Err(LayoutError::TooWide);
        }
        let end = lowest_bit as u16 + num_bits as u16;
        let available = register_width as u16 * 8;
        if end > available {
            return Err(LayoutError::Overflow { end, available });
        }

        Ok(Self {
            read_address,
            write_address,
            lowest_bit,
            num_bits,
            register_width,
            order,
            signed,
        })
    }

    #[must_use]
    pub const fn read_address(&self) -> u8 {
        self.read_address
    }

    #[must_use]
    pub const fn write_address(&self) -> u8 {
        self.write_address
    }

    #[must_use]
    pub const fn lowest_bit(&self) -> u8 {
        self.lowest_bit
    }

    #[must_use]
    pub const fn num_bits(&self) -> u8 {
        self.num_bits
    }

    /// Register size in bytes, not counting the command byte.
    #[must_use]
    pub const fn register_width(&self) -> usize {
        self.register_width as usize
    }

    #[must_use]
    pub const fn order(&self) -> BitOrder {
        self.order
    }

    #[must_use]
    pub const fn is_signed(&self) -> bool {
        self.signed
    }

    /// The bits covered by the field, in register position.
    #[must_use]
    pub const fn mask(&self) -> u64 {
        self.value_mask() << self.lowest_bit
    }

    const fn value_mask(&self) -> u64 {
        if self.num_bits >= 64 {
            u64::MAX
        } else {
            (1 << self.num_bits) - 1
        }
    }

    /// Assembles the whole register from its bytes.
    ///
    /// # Panics
    ///
    /// If `data` is shorter than [`Self::register_width`].
    #[must_use]
    pub fn register_value(&self, data: &[u8]) -> u64 {
        let width = self.register_width();
        match self.order {
            BitOrder::LsbFirst => LittleEndian::read_uint(&data[..width], width),
            BitOrder::MsbFirst => BigEndian::read_uint(&data[..width], width),
        }
    }

    fn store_register(&self, data: &mut [u8], value: u64) {
        let width = self.register_width();
        match self.order {
            BitOrder::LsbFirst => LittleEndian::write_uint(&mut data[..width], value, width),
            BitOrder::MsbFirst => BigEndian::write_uint(&mut data[..width], value, width),
        }
    }

    /// Extracts the field from the register bytes, sign extending signed fields.
    ///
    /// # Panics
    ///
    /// If `data` is shorter than [`Self::register_width`].
    #[must_use]
    pub fn decode(&self, data: &[u8]) -> i64 {
        let raw = (self.register_value(data) & self.mask()) >> self.lowest_bit;
        if self.signed {
            let shift = 64 - u32::from(self.num_bits);
            ((raw << shift) as i64) >> shift
        } else {
            // unsigned layouts are at most 63 bits wide
            raw as i64
        }
    }

    #[must_use]
    pub fn decode_flag(&self, data: &[u8]) -> bool {
        self.decode(data) != 0
    }

    /// Checks that `value` is representable by the field.
    ///
    /// # Errors
    ///
    /// [`FieldError::ValueOutOfRange`] if it is not.
    pub fn check_value(&self, value: i64) -> Result<(), FieldError> {
        let bits = u32::from(self.num_bits);
        let (min, max) = if self.signed {
            (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
        } else {
            (0, (1i128 << bits) - 1)
        };

        if (min..=max).contains(&i128::from(value)) {
            Ok(())
        } else {
            Err(FieldError::ValueOutOfRange {
                value,
                num_bits: self.num_bits,
            })
        }
    }

    /// Replaces the field's bits in `data`, leaving every other bit of the register untouched.
    ///
    /// # Errors
    ///
    /// [`FieldError::ValueOutOfRange`] if `value` does not fit, `data` is unchanged then.
    ///
    /// # Panics
    ///
    /// If `data` is shorter than [`Self::register_width`].
    pub fn encode(&self, data: &mut [u8], value: i64) -> Result<(), FieldError> {
        self.check_value(value)?;

        let bits = (value as u64) & self.value_mask();
        let register = self.register_value(data) & !self.mask();
        self.store_register(data, register | (bits << self.lowest_bit));
        Ok(())
    }

    /// # Panics
    ///
    /// If `data` is shorter than [`Self::register_width`].
    pub fn encode_flag(&self, data: &mut [u8], value: bool) {
        let register = self.register_value(data);
        let register = if value {
            register | self.mask()
        } else {
            register & !self.mask()
        };
        self.store_register(data, register);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENABLE: BitField = BitField::bit(0xE7, 0xE6, 2);
    const LEVEL: BitField = BitField::new(0x11, 0x51, 0, 4);

    #[test]
    fn masks() {
        assert_eq!(ENABLE.mask(), 0b0000_0100);
        assert_eq!(LEVEL.mask(), 0b0000_1111);
        assert_eq!(
            BitField::in_register(0, 0, 4, 8, 2, BitOrder::LsbFirst).mask(),
            0x0FF0
        );
    }

    #[test]
    fn single_bit() {
        let mut data = [0x3A];
        assert!(!ENABLE.decode_flag(&data));

        ENABLE.encode_flag(&mut data, true);
        assert_eq!(data, [0x3E]);
        assert!(ENABLE.decode_flag(&data));

        ENABLE.encode_flag(&mut data, false);
        assert_eq!(data, [0x3A]);
    }

    #[test]
    fn byte_order() {
        let lsb = BitField::in_register(0, 0, 4, 8, 2, BitOrder::LsbFirst);
        let msb = BitField::in_register(0, 0, 4, 8, 2, BitOrder::MsbFirst);

        // register 0xABCD either way round, field is bits 4..12
        assert_eq!(lsb.decode(&[0xCD, 0xAB]), 0xBC);
        assert_eq!(msb.decode(&[0xAB, 0xCD]), 0xBC);

        let mut data = [0xCD, 0xAB];
        lsb.encode(&mut data, 0x12).unwrap();
        assert_eq!(data, [0x2D, 0xA1]);

        let mut data = [0xAB, 0xCD];
        msb.encode(&mut data, 0x12).unwrap();
        assert_eq!(data, [0xA1, 0x2D]);
    }

    #[test]
    fn single_bit_position_follows_order() {
        // bit 9 is in the second byte lsb-first, in the first byte msb-first
        let lsb = BitField::in_register(0, 0, 9, 1, 2, BitOrder::LsbFirst);
        let msb = BitField::in_register(0, 0, 9, 1, 2, BitOrder::MsbFirst);

        let mut data = [0, 0];
        lsb.encode_flag(&mut data, true);
        assert_eq!(data, [0x00, 0x02]);

        let mut data = [0, 0];
        msb.encode_flag(&mut data, true);
        assert_eq!(data, [0x02, 0x00]);
    }

    #[test]
    fn sign_extension() {
        for bits in [2u8, 4, 8] {
            let field = BitField::new(0, 0, 0, bits).signed();
            let mut data = [0];
            field.encode(&mut data, -1).unwrap();
            assert_eq!(field.decode(&data), -1, "{bits} bits");

            let min = -(1i64 << (bits - 1));
            field.encode(&mut data, min).unwrap();
            assert_eq!(field.decode(&data), min, "{bits} bits");
        }

        let wide = BitField::in_register(0, 0, 0, 12, 2, BitOrder::MsbFirst).signed();
        assert_eq!(wide.decode(&[0x0F, 0xFE]), -2);
        assert_eq!(wide.decode(&[0xF7, 0xFF]), 2047);
    }

    #[test]
    fn full_width_signed() {
        let whole = BitField::try_new(0, 0, 0, 64, 8, BitOrder::MsbFirst, true).unwrap();
        let mut data = [0u8; 8];
        whole.encode(&mut data, i64::MIN).unwrap();
        assert_eq!(data, [0x80, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(whole.decode(&data), i64::MIN);
    }

    #[test]
    fn encode_preserves_other_bits() {
        let field = BitField::new(0, 0, 3, 3);
        let mut data = [0b1010_1010];
        field.encode(&mut data, 0b011).unwrap();
        assert_eq!(data, [0b1001_1010]);
        assert_eq!(data[0] & !0b0011_1000, 0b1010_1010 & !0b0011_1000);
    }

    #[test]
    fn out_of_range_values() {
        let mut data = [0x5A];
        assert_eq!(
            LEVEL.encode(&mut data, 16),
            Err(FieldError::ValueOutOfRange {
                value: 16,
                num_bits: 4
            })
        );
        assert!(LEVEL.encode(&mut data, -1).is_err());
        assert_eq!(data, [0x5A]);

        let signed = BitField::new(0, 0, 0, 4).signed();
        assert!(signed.check_value(7).is_ok());
        assert!(signed.check_value(-8).is_ok());
        assert!(signed.check_value(8).is_err());
        assert!(signed.check_value(-9).is_err());
    }

    #[test]
    fn invalid_layouts() {
        assert_eq!(
            BitField::try_new(0, 0, 0, 1, 0, BitOrder::LsbFirst, false),
            Err(LayoutError::RegisterWidth(0))
        );
        assert_eq!(
            BitField::try_new(0, 0, 0, 1, 9, BitOrder::LsbFirst, false),
            Err(LayoutError::RegisterWidth(9))
        );
        assert_eq!(
            BitField::try_new(0, 0, 0, 0, 1, BitOrder::LsbFirst, false),
            Err(LayoutError::Empty)
        );
        assert_eq!(
            BitField::try_new(0, 0, 6, 4, 1, BitOrder::LsbFirst, false),
            Err(LayoutError::Overflow {
                end: 10,
                available: 8
            })
        );
        assert_eq!(
            BitField::try_new(0, 0, 0, 64, 8, BitOrder::LsbFirst, false),
            Err(LayoutError::TooWide)
        );
    }

    #[test]
    fn wide_layouts_in_const() {
        const STATUS: BitField = BitField::in_register(0x20, 0x21, 4, 8, 2, BitOrder::MsbFirst);
        const TOP: BitField = BitField::in_register(0x20, 0x21, 63, 1, 8, BitOrder::LsbFirst);

        assert_eq!(
            Ok(STATUS),
            BitField::try_new(0x20, 0x21, 4, 8, 2, BitOrder::MsbFirst, false)
        );
        assert_eq!(STATUS.register_width(), 2);
        assert_eq!(TOP.mask(), 1 << 63);
    }

    #[test]
    #[should_panic]
    fn panicking_constructor() {
        let _ = BitField::new(0, 0, 7, 2);
    }

    #[test]
    #[should_panic]
    fn panicking_wide_constructor() {
        let _ = BitField::in_register(0, 0, 12, 5, 2, BitOrder::LsbFirst);
    }
}
