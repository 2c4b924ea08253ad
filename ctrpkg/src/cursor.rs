//! Byte cursor shared by every parser in this crate.
//!
//! A [`Cursor`] is a read head over an immutable byte slice. Nested structures
//! are parsed by handing the same cursor down, or by splitting off a bounded
//! child with [`Cursor::take`], which never copies the backing buffer.
//! Fixed-width reads go through `byteorder` on a [`std::io::Cursor`]; the
//! wrapper adds bounds checks that report where the input ran out.

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{ByteOrder, ReadBytesExt};

use crate::{CtrError, CtrResult};

/// Rounds `what` up to the next multiple of `to`
pub(crate) fn align(what: usize, to: usize) -> usize {
    if what % to != 0 {
        what + (to - what % to)
    } else {
        what
    }
}

/// Appends zeroes until the length of `out` is a multiple of `to`
pub(crate) fn pad_to(out: &mut Vec<u8>, to: usize) {
    out.resize(align(out.len(), to), 0);
}

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    inner: io::Cursor<&'a [u8]>,
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            inner: io::Cursor::new(buf),
        }
    }
    fn buf(&self) -> &'a [u8] {
        *self.inner.get_ref()
    }
    /// Absolute position from the start of the backing buffer
    #[must_use]
    pub fn position(&self) -> usize {
        self.inner.position() as usize
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf().len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf().is_empty()
    }
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.position())
    }
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.remaining() != 0
    }

    fn check(&self, needed: usize) -> CtrResult<()> {
        if needed > self.remaining() {
            Err(CtrError::TruncatedInput {
                offset: self.position(),
                needed,
                available: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    /// Moves to an absolute position; the end of the buffer is a valid target
    pub fn seek(&mut self, pos: usize) -> CtrResult<()> {
        if pos > self.len() {
            return Err(CtrError::TruncatedInput {
                offset: pos,
                needed: 0,
                available: 0,
            });
        }
        self.inner.set_position(pos as u64);
        Ok(())
    }
    pub fn skip(&mut self, amount: usize) -> CtrResult<()> {
        self.check(amount)?;
        self.inner.seek(SeekFrom::Current(amount as i64))?;
        Ok(())
    }
    /// Skips forward to the next multiple of `boundary`
    pub fn align(&mut self, boundary: usize) -> CtrResult<()> {
        let pos = self.position();
        self.skip(align(pos, boundary) - pos)
    }

    pub fn peek_bytes(&self, amount: usize) -> CtrResult<&'a [u8]> {
        self.check(amount)?;
        Ok(&self.buf()[self.position()..][..amount])
    }
    pub fn read_bytes(&mut self, amount: usize) -> CtrResult<&'a [u8]> {
        let bytes = self.peek_bytes(amount)?;
        self.skip(amount)?;
        Ok(bytes)
    }
    pub fn read_array<const N: usize>(&mut self) -> CtrResult<[u8; N]> {
        self.check(N)?;
        let mut out = [0u8; N];
        self.inner.read_exact(&mut out)?;
        Ok(out)
    }

    /// Splits off a cursor over the next `amount` bytes and moves past them
    ///
    /// Positions in the returned cursor start at zero.
    pub fn take(&mut self, amount: usize) -> CtrResult<Cursor<'a>> {
        Ok(Cursor::new(self.read_bytes(amount)?))
    }

    pub fn read_u8(&mut self) -> CtrResult<u8> {
        self.check(1)?;
        Ok(self.inner.read_u8()?)
    }
    pub fn read_u16<B: ByteOrder>(&mut self) -> CtrResult<u16> {
        self.check(2)?;
        Ok(self.inner.read_u16::<B>()?)
    }
    pub fn read_u32<B: ByteOrder>(&mut self) -> CtrResult<u32> {
        self.check(4)?;
        Ok(self.inner.read_u32::<B>()?)
    }
    pub fn read_u64<B: ByteOrder>(&mut self) -> CtrResult<u64> {
        self.check(8)?;
        Ok(self.inner.read_u64::<B>()?)
    }
}

#[cfg(test)]
mod tests {
    use byteorder::{BigEndian, LittleEndian};

    use super::*;

    #[test]
    fn reads_mixed_endianness() {
        let data = [0x12, 0x34, 0x12, 0x34, 0, 0, 0, 1, 1, 0, 0, 0];
        let mut cur = Cursor::new(&data);
        assert_eq!(cur.read_u16::<BigEndian>().unwrap(), 0x1234);
        assert_eq!(cur.read_u16::<LittleEndian>().unwrap(), 0x3412);
        assert_eq!(cur.read_u32::<BigEndian>().unwrap(), 1);
        assert_eq!(cur.read_u32::<LittleEndian>().unwrap(), 1);
        assert!(!cur.has_remaining());
    }

    #[test]
    fn truncated_read_does_not_move() {
        let data = [0u8; 3];
        let mut cur = Cursor::new(&data);
        cur.skip(1).unwrap();
        match cur.read_u32::<BigEndian>() {
            Err(CtrError::TruncatedInput { offset, needed, available }) => {
                assert_eq!((offset, needed, available), (1, 4, 2));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(cur.position(), 1);
    }

    #[test]
    fn reads_u64_and_seeks_back() {
        let data = hex_literal::hex!("0004013000002002 0220000030010400");
        let mut cur = Cursor::new(&data);
        assert_eq!(cur.read_u64::<BigEndian>().unwrap(), 0x0004_0130_0000_2002);
        assert_eq!(cur.read_u64::<LittleEndian>().unwrap(), 0x0004_0130_0000_2002);
        assert!(cur.read_u8().is_err());
        cur.seek(4).unwrap();
        assert_eq!(cur.read_u8().unwrap(), 0);
        assert_eq!(cur.remaining(), 11);
        assert!(cur.seek(17).is_err());
        cur.seek(16).unwrap();
        assert!(!cur.has_remaining());
    }

    #[test]
    fn take_splits_without_copying() {
        let data: Vec<u8> = (0..16).collect();
        let mut cur = Cursor::new(&data);
        cur.skip(2).unwrap();
        let mut child = cur.take(4).unwrap();
        assert_eq!(cur.position(), 6);
        assert_eq!(child.position(), 0);
        assert_eq!(child.read_bytes(4).unwrap().as_ptr(), data[2..].as_ptr());
        assert!(cur.take(11).is_err());
    }

    #[test]
    fn align_rounds_up() {
        assert_eq!(align(0x2020, 0x40), 0x2040);
        assert_eq!(align(0x40, 0x40), 0x40);
        assert_eq!(align(0, 0x40), 0);

        let data = [0u8; 0x80];
        let mut cur = Cursor::new(&data);
        cur.skip(1).unwrap();
        cur.align(0x40).unwrap();
        assert_eq!(cur.position(), 0x40);
        cur.align(0x40).unwrap();
        assert_eq!(cur.position(), 0x40);

        let mut out = vec![1u8; 3];
        pad_to(&mut out, 0x40);
        assert_eq!(out.len(), 0x40);
        assert_eq!(out[3..], [0u8; 0x3d]);
    }
}
