//! Bitstream reader.
//!
//! Reads from an immutable, caller-borrowed byte buffer representing the
//! payload of one picture (§4.1, §5). Overreads are not undefined behavior:
//! every read primitive reports [`Error::BufferExhausted`] when fewer bits
//! remain than requested, leaving the read position unchanged.

use crate::error::{Error, Result};
use crate::traits::BitReadable;
use crate::vlc::{Entry, Table};

/// Given a bit count, construct a bitmask with that many bits set to one,
/// anchored to the lowest bits of the returned value.
fn bitmask_from_popcount<T: BitReadable>(bits_needed: u32) -> T {
    let mut result = T::zero();
    for _ in 0..bits_needed {
        result = result << 1 | T::one();
    }
    result
}

/// A cursor over a borrowed byte buffer that reads big-endian bitfields and
/// VLC codewords.
///
/// The hot path is `peek_bits`/`read_bits` for widths up to the type's full
/// bit count; larger fields must be split into two reads by the caller (the
/// widest field this crate ever reads is 32 bits, for the V1 start code).
pub struct BitReader<'a> {
    data: &'a [u8],

    /// Absolute bit position from the start of `data`.
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Wrap a byte buffer for reading. The reader borrows `data` for its
    /// entire lifetime; there is no ownership transfer.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// How many bits remain unread in the buffer.
    pub fn bits_remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_pos)
    }

    /// The current absolute bit position, i.e. how many bits have been
    /// consumed so far.
    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Copy `bits_needed` bits out into a value without advancing the
    /// position. The bits are returned zero-extended from the least
    /// significant bit of the result, matching the bit layout of a struct
    /// populated directly from bitstream data.
    pub fn peek_bits<T: BitReadable>(&self, mut bits_needed: u32) -> Result<T> {
        if T::zero().checked_shl(bits_needed).is_none() {
            return Err(Error::BitWidthExceeded {
                requested: bits_needed,
            });
        }

        if (self.bits_remaining() as u64) < bits_needed as u64 {
            return Err(Error::BufferExhausted {
                bits_consumed: self.bit_pos,
            });
        }

        let mut accum = T::zero();
        let mut byte_index = self.bit_pos / 8;
        let mut bit_offset = (self.bit_pos % 8) as u32;

        while bits_needed > 0 {
            let byte = self.data[byte_index] << bit_offset;
            let bits_in_byte = 8u32.saturating_sub(bit_offset);
            let bits_to_take = bits_in_byte.min(bits_needed);

            accum = (accum << bits_to_take) | (byte >> (8 - bits_to_take)).into();

            bits_needed -= bits_to_take;
            bit_offset = 0;
            byte_index += 1;
        }

        Ok(accum)
    }

    /// Advance the read position by `bits_to_skip` bits without returning a
    /// value.
    pub fn skip_bits(&mut self, bits_to_skip: u32) -> Result<()> {
        if (self.bits_remaining() as u64) < bits_to_skip as u64 {
            return Err(Error::BufferExhausted {
                bits_consumed: self.bit_pos,
            });
        }
        self.bit_pos += bits_to_skip as usize;
        Ok(())
    }

    /// Read `bits_needed` bits, advancing the read position.
    pub fn read_bits<T: BitReadable>(&mut self, bits_needed: u32) -> Result<T> {
        let r = self.peek_bits(bits_needed)?;
        self.skip_bits(bits_needed)?;
        Ok(r)
    }

    /// Read a single bit as a `bool`.
    pub fn read_flag(&mut self) -> Result<bool> {
        Ok(self.read_bits::<u8>(1)? != 0)
    }

    /// Read a full byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bits(8)
    }

    /// Walk a VLC tree to completion, returning the decoded value. Every
    /// `Fork` consumes exactly one bit; `name` is carried only for error
    /// reporting and does not affect decoding.
    pub fn read_vlc<T: Clone>(&mut self, table: &Table<T>, name: &'static str) -> Result<T> {
        let mut index = 0;
        loop {
            match table.get(index) {
                Some(Entry::End(t)) => return Ok(t.clone()),
                Some(Entry::Fork(zero, one)) => {
                    let next_bit: u8 = self.read_bits(1)?;
                    index = if next_bit == 0 { *zero } else { *one };
                }
                None => return Err(Error::InvalidVlc { table: name }),
            }
        }
    }

    /// The shared unary-style table-index primitive used throughout the
    /// header syntax (§4.3): read one bit; `0` yields `0`; `1` followed by
    /// another bit yields `1` or `2`.
    pub fn decode012(&mut self) -> Result<u8> {
        if !self.read_flag()? {
            return Ok(0);
        }
        Ok(if self.read_flag()? { 2 } else { 1 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_aligned_and_unaligned() {
        let data = [0xFF, 0x72, 0x1C, 0x1F];
        let mut reader = BitReader::new(&data);

        assert_eq!(0x07u8, reader.read_bits(3).unwrap());
        assert_eq!(0x3Eu8, reader.read_bits(6).unwrap());
        assert_eq!(0x721C1Fu32, reader.read_bits(23).unwrap());
        assert!(reader.read_bits::<u8>(1).is_err());
    }

    #[test]
    fn peek_does_not_advance() {
        let data = [0xFF, 0x72];
        let reader = BitReader::new(&data);
        assert_eq!(0x07u8, reader.peek_bits(3).unwrap());
        assert_eq!(0x07u8, reader.peek_bits(3).unwrap());
    }

    #[test]
    fn bits_remaining_tracks_consumption() {
        let data = [0x00, 0x00];
        let mut reader = BitReader::new(&data);
        assert_eq!(16, reader.bits_remaining());
        reader.skip_bits(5).unwrap();
        assert_eq!(11, reader.bits_remaining());
    }

    #[test]
    fn exhaustion_is_reported_not_ub() {
        let data = [0x00];
        let mut reader = BitReader::new(&data);
        reader.skip_bits(4).unwrap();
        assert!(matches!(
            reader.read_bits::<u8>(5),
            Err(Error::BufferExhausted { .. })
        ));
        // Position must not have moved on a failed read.
        assert_eq!(4, reader.bit_position());
    }

    #[test]
    fn decode012_reads_unary_prefix() {
        // 0 -> 0
        let data = [0b0000_0000];
        let mut reader = BitReader::new(&data);
        assert_eq!(0, reader.decode012().unwrap());

        // 10 -> 1
        let data = [0b1000_0000];
        let mut reader = BitReader::new(&data);
        assert_eq!(1, reader.decode012().unwrap());

        // 11 -> 2
        let data = [0b1100_0000];
        let mut reader = BitReader::new(&data);
        assert_eq!(2, reader.decode012().unwrap());
    }

    #[test]
    fn vlc_tree_lookup() {
        let tree = crate::vlc::build_tree(&[(0b0u32, 1u8, 'a'), (0b10, 2, 'b'), (0b11, 2, 'c')]);
        let data = [0b1000_0000];
        let mut reader = BitReader::new(&data);
        assert_eq!('b', reader.read_vlc(&tree, "test").unwrap());
    }
}
