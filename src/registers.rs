//! ## Register storage
//! Registers are kept in one of two layouts:
//!
//! - `Dense`: one `u8` per register, values in `[0..63]`.
//! - `Packed`: `W` bits per register packed into a `u32` slice, values in
//!   `[0..2^W - 1]`. A register may straddle two neighbouring words.
//!
//! Packed slice encoding for `W = 5`:
//! - data[0]       - registers 0..5 and the low 2 bits of register 6
//! - data[1]       - high 3 bits of register 6, registers 7..11, ...
//!
//! Writes above the layout maximum are clamped by the caller (see `RegisterBank::update`).

use std::mem::size_of_val;

use enum_dispatch::enum_dispatch;

/// Maximum value stored in a dense register
pub(crate) const DENSE_MAX_VALUE: u8 = 63;

/// Storage layouts supported by `RegisterBank`
#[enum_dispatch]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Storage {
    Dense(Dense),
    Packed(Packed),
}

/// Storage trait which must be implemented by all register layouts.
#[enum_dispatch(Storage)]
pub(crate) trait RegisterStorage {
    fn get(&self, idx: usize) -> u8;
    fn set(&mut self, idx: usize, value: u8);
    fn max_value(&self) -> u8;
    fn len(&self) -> usize;
    fn storage_bytes(&self) -> usize;
    fn clear(&mut self);
}

/// One byte per register
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Dense {
    registers: Vec<u8>,
}

impl Dense {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            registers: vec![0; len],
        }
    }
}

impl RegisterStorage for Dense {
    #[inline]
    fn get(&self, idx: usize) -> u8 {
        self.registers[idx]
    }

    #[inline]
    fn set(&mut self, idx: usize, value: u8) {
        self.registers[idx] = value;
    }

    #[inline]
    fn max_value(&self) -> u8 {
        DENSE_MAX_VALUE
    }

    #[inline]
    fn len(&self) -> usize {
        self.registers.len()
    }

    #[inline]
    fn storage_bytes(&self) -> usize {
        size_of_val(self.registers.as_slice())
    }

    fn clear(&mut self) {
        self.registers.fill(0);
    }
}

/// `width` bits per register packed into `u32` words
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Packed {
    width: u8,
    len: usize,
    words: Vec<u32>,
}

impl Packed {
    pub(crate) fn new(len: usize, width: u8) -> Self {
        let bits = len * usize::from(width);
        Self {
            width,
            len,
            words: vec![0; bits.div_ceil(32)],
        }
    }

    /// Return word index, bit position, and number of bits stored in the 1-st and 2-nd word
    #[inline]
    fn locate(&self, idx: usize) -> (usize, usize, usize, usize) {
        let width = usize::from(self.width);
        let bit_idx = idx * width;
        let word_idx = bit_idx / 32;
        let bit_pos = bit_idx % 32;
        let bits_1 = width.min(32 - bit_pos);
        let bits_2 = width - bits_1;
        (word_idx, bit_pos, bits_1, bits_2)
    }
}

impl RegisterStorage for Packed {
    #[inline]
    fn get(&self, idx: usize) -> u8 {
        let (word_idx, bit_pos, bits_1, bits_2) = self.locate(idx);
        let mask_1 = (1u32 << bits_1) - 1;
        let mut value = (self.words[word_idx] >> bit_pos) & mask_1;
        if bits_2 > 0 {
            let mask_2 = (1u32 << bits_2) - 1;
            value |= (self.words[word_idx + 1] & mask_2) << bits_1;
        }
        value as u8
    }

    #[inline]
    fn set(&mut self, idx: usize, value: u8) {
        let (word_idx, bit_pos, bits_1, bits_2) = self.locate(idx);
        let value = u32::from(value);
        let mask_1 = (1u32 << bits_1) - 1;
        self.words[word_idx] &= !(mask_1 << bit_pos);
        self.words[word_idx] |= (value & mask_1) << bit_pos;
        if bits_2 > 0 {
            let mask_2 = (1u32 << bits_2) - 1;
            self.words[word_idx + 1] &= !mask_2;
            self.words[word_idx + 1] |= (value >> bits_1) & mask_2;
        }
    }

    #[inline]
    fn max_value(&self) -> u8 {
        ((1u16 << self.width) - 1) as u8
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn storage_bytes(&self) -> usize {
        size_of_val(self.words.as_slice())
    }

    fn clear(&mut self) {
        self.words.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(16, 4 => 8)]
    #[test_case(16, 5 => 12)]
    #[test_case(16, 6 => 12)]
    #[test_case(1024, 5 => 640)]
    #[test_case(1024, 6 => 768)]
    #[test_case(4096, 6 => 3072)]
    fn test_packed_storage_bytes(len: usize, width: u8) -> usize {
        Packed::new(len, width).storage_bytes()
    }

    #[test_case(4)]
    #[test_case(5)]
    #[test_case(6)]
    fn test_packed_set_get_straddling_words(width: u8) {
        let mut packed = Packed::new(64, width);
        let max = packed.max_value();
        let expected = |idx: usize| ((idx * 7) % (usize::from(max) + 1)) as u8;
        for idx in 0..64 {
            packed.set(idx, expected(idx));
        }
        for idx in 0..64 {
            assert_eq!(packed.get(idx), expected(idx), "register {idx}");
        }

        // overwrite with max value and back, neighbours must be untouched
        packed.set(6, max);
        packed.set(6, 1);
        assert_eq!(packed.get(5), expected(5));
        assert_eq!(packed.get(6), 1);
        assert_eq!(packed.get(7), expected(7));
    }

    #[test]
    fn test_dense_and_packed_clear() {
        let mut storage: Storage = Packed::new(32, 5).into();
        storage.set(3, 17);
        assert_eq!(storage.get(3), 17);
        storage.clear();
        assert_eq!(storage.get(3), 0);

        let mut storage: Storage = Dense::new(32).into();
        storage.set(31, 63);
        assert_eq!(storage.max_value(), 63);
        storage.clear();
        assert_eq!(storage.get(31), 0);
    }
}
