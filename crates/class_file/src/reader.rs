use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};
use thiserror::Error;

type Endian = BigEndian;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    #[error(
        "unexpected end of data at offset {offset}: needed {requested} bytes, {available} available"
    )]
    UnexpectedEndOfData {
        offset: usize,
        requested: usize,
        available: usize,
    },
}

/// Big-endian cursor over a borrowed buffer.
///
/// Offsets reported by [`ByteReader::position`] are absolute: a reader created
/// with [`ByteReader::sub_reader`] keeps counting from the start of the
/// buffer it was carved out of.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    r: Cursor<&'a [u8]>,
    base: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            r: Cursor::new(buf),
            base: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.base + self.r.position() as usize
    }

    pub fn seek(&mut self, offset: usize) -> Result<(), ReadError> {
        let end = self.base + self.len();
        if offset < self.base || offset > end {
            return Err(ReadError::UnexpectedEndOfData {
                offset,
                requested: 0,
                available: 0,
            });
        }

        self.r.set_position((offset - self.base) as u64);
        Ok(())
    }

    /// Length of the span this reader covers.
    pub fn len(&self) -> usize {
        self.r.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.r.position() as usize)
    }

    /// The whole span, independent of the cursor.
    pub fn as_slice(&self) -> &'a [u8] {
        *self.r.get_ref()
    }

    pub fn read_u1(&mut self) -> Result<u8, ReadError> {
        self.ensure(1)?;
        self.r.read_u8().map_err(|_| self.eof(1))
    }

    pub fn read_u2(&mut self) -> Result<u16, ReadError> {
        self.ensure(2)?;
        self.r.read_u16::<Endian>().map_err(|_| self.eof(2))
    }

    pub fn read_u4(&mut self) -> Result<u32, ReadError> {
        self.ensure(4)?;
        self.r.read_u32::<Endian>().map_err(|_| self.eof(4))
    }

    pub fn read_u8(&mut self) -> Result<u64, ReadError> {
        self.ensure(8)?;
        self.r.read_u64::<Endian>().map_err(|_| self.eof(8))
    }

    pub fn read_i4(&mut self) -> Result<i32, ReadError> {
        self.ensure(4)?;
        self.r.read_i32::<Endian>().map_err(|_| self.eof(4))
    }

    pub fn read_i8(&mut self) -> Result<i64, ReadError> {
        self.ensure(8)?;
        self.r.read_i64::<Endian>().map_err(|_| self.eof(8))
    }

    /// Reads `count` consecutive u2 values.
    pub fn read_u2_array(&mut self, count: usize) -> Result<Vec<u16>, ReadError> {
        self.ensure(count * 2)?;
        let mut values = vec![0u16; count];
        self.r
            .read_u16_into::<Endian>(&mut values)
            .map_err(|_| self.eof(count * 2))?;
        Ok(values)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        self.ensure(n)?;
        let start = self.r.position() as usize;
        let buf: &'a [u8] = *self.r.get_ref();
        self.r.set_position((start + n) as u64);
        Ok(&buf[start..start + n])
    }

    /// Consumes the next `n` bytes and returns a reader confined to them.
    pub fn sub_reader(&mut self, n: usize) -> Result<ByteReader<'a>, ReadError> {
        let base = self.position();
        let bytes = self.read_bytes(n)?;
        Ok(ByteReader {
            r: Cursor::new(bytes),
            base,
        })
    }

    fn ensure(&self, requested: usize) -> Result<(), ReadError> {
        if requested > self.remaining() {
            Err(self.eof(requested))
        } else {
            Ok(())
        }
    }

    fn eof(&self, requested: usize) -> ReadError {
        ReadError::UnexpectedEndOfData {
            offset: self.position(),
            requested,
            available: self.remaining(),
        }
    }
}
