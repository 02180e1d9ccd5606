//! MSB-first bit packing for the BARCH bitstream.
//!
//! The writer accumulates bits most-significant first into a byte buffer and
//! zero-pads the final partial byte; the reader walks the same layout and
//! refuses to read a single bit past the end of its slice.

use bitvec::order::Msb0;
use bitvec::prelude::*;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BitstreamError {
    #[error("Unexpected end of bitstream after {byte_len} bytes")]
    OutOfData { byte_len: usize },

    #[error("Cannot move {0} bits at once (max 32)")]
    TooManyBits(u32),
}

/// Accumulates bits MSB-first into bytes.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bits: BitVec<u8, Msb0>,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bits: BitVec::with_capacity(bits),
        }
    }

    #[inline]
    pub fn put_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Emits the `n` lowest bits of `value`, most significant first.
    pub fn put_bits(&mut self, value: u32, n: u32) -> Result<(), BitstreamError> {
        if n > 32 {
            return Err(BitstreamError::TooManyBits(n));
        }
        for i in (0..n).rev() {
            self.put_bit((value >> i) & 1 == 1);
        }
        Ok(())
    }

    #[inline]
    pub fn put_byte(&mut self, byte: u8) {
        self.bits.extend_from_bitslice(byte.view_bits::<Msb0>());
    }

    /// Number of bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    /// Flushes the partial byte (low bits zero) and hands back the buffer.
    /// The result is always `ceil(bit_len / 8)` bytes long.
    pub fn finish(mut self) -> Vec<u8> {
        self.bits.set_uninitialized(false);
        self.bits.into_vec()
    }
}

/// Reads bits MSB-first from a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bits: bytes.view_bits::<Msb0>(),
            pos: 0,
        }
    }

    #[inline]
    pub fn get_bit(&mut self) -> Result<bool, BitstreamError> {
        if self.pos >= self.bits.len() {
            return Err(BitstreamError::OutOfData {
                byte_len: self.bits.len() / 8,
            });
        }
        let bit = self.bits[self.pos];
        self.pos += 1;
        Ok(bit)
    }

    pub fn get_bits(&mut self, k: u32) -> Result<u32, BitstreamError> {
        if k > 32 {
            return Err(BitstreamError::TooManyBits(k));
        }
        let mut value = 0u32;
        for _ in 0..k {
            value = (value << 1) | self.get_bit()? as u32;
        }
        Ok(value)
    }

    #[inline]
    pub fn get_byte(&mut self) -> Result<u8, BitstreamError> {
        Ok(self.get_bits(8)? as u8)
    }

    /// Bits consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bits.len() - self.pos
    }
}
