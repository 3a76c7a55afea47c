//! A seekable cursor over an in-memory byte buffer.
//!
//! All multi-byte reads are little-endian. Every read and seek is bounds
//! checked and reports the offending offset, so decode failures can be
//! located in a hex dump of the buffer.

use crate::pattern::find_bytes;
use byteorder::{ByteOrder, LE};
use thiserror::Error;

/// Structural read failures at the buffer level.
#[derive(Debug, Error)]
pub enum ReadError {
    /// A read or seek went past the end of the buffer.
    #[error("read past end of buffer: offset {offset} + {wanted} bytes exceeds length {len}")]
    Truncated {
        offset: usize,
        wanted: usize,
        len: usize,
    },
    /// A length-prefixed string was not introduced by the `60 0a` magic.
    #[error("string magic mismatch at offset {offset}: expected 60 0a, found {found:02x?}")]
    MagicMismatch { offset: usize, found: [u8; 2] },
}

/// A cursor over a borrowed byte buffer.
///
/// The buffer itself is immutable; only the position moves. Reads advance
/// the position, peeks do not.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

macro_rules! read_scalar {
    ($name:ident, $ty:ty, $width:expr, $decode:expr) => {
        #[inline]
        pub fn $name(&mut self) -> Result<$ty, ReadError> {
            let bytes = self.take($width)?;
            Ok($decode(bytes))
        }
    };
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current absolute position.
    #[inline]
    pub fn tell(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes left between the position and the end of the buffer.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// The remainder of the buffer, without consuming it.
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// The entire underlying buffer, independent of the position.
    #[inline]
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Seek to an absolute position. Seeking to `len()` is allowed.
    pub fn seek_to(&mut self, pos: usize) -> Result<(), ReadError> {
        if pos > self.buf.len() {
            return Err(ReadError::Truncated {
                offset: pos,
                wanted: 0,
                len: self.buf.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Seek relative to the current position.
    pub fn seek_by(&mut self, delta: i64) -> Result<(), ReadError> {
        let target = self.pos as i64 + delta;
        if target < 0 {
            return Err(ReadError::Truncated {
                offset: 0,
                wanted: 0,
                len: self.buf.len(),
            });
        }
        self.seek_to(target as usize)
    }

    /// Read `n` bytes, advancing the position.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        match self.buf.get(self.pos..self.pos + n) {
            Some(bytes) => {
                self.pos += n;
                Ok(bytes)
            }
            None => Err(ReadError::Truncated {
                offset: self.pos,
                wanted: n,
                len: self.buf.len(),
            }),
        }
    }

    /// Read `n` bytes without advancing the position.
    pub fn peek(&self, n: usize) -> Result<&'a [u8], ReadError> {
        self.buf
            .get(self.pos..self.pos + n)
            .ok_or(ReadError::Truncated {
                offset: self.pos,
                wanted: n,
                len: self.buf.len(),
            })
    }

    /// Discard `n` bytes.
    #[inline]
    pub fn skip(&mut self, n: usize) -> Result<(), ReadError> {
        self.take(n).map(|_| ())
    }

    /// Offset of `needle` relative to the current position, if present
    /// anywhere in the remainder.
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        find_bytes(self.rest(), needle)
    }

    read_scalar!(read_u8, u8, 1, |b: &[u8]| b[0]);
    read_scalar!(read_i8, i8, 1, |b: &[u8]| b[0] as i8);
    read_scalar!(read_u16, u16, 2, LE::read_u16);
    read_scalar!(read_i16, i16, 2, LE::read_i16);
    read_scalar!(read_u32, u32, 4, LE::read_u32);
    read_scalar!(read_i32, i32, 4, LE::read_i32);
    read_scalar!(read_u64, u64, 8, LE::read_u64);
    read_scalar!(read_i64, i64, 8, LE::read_i64);
    read_scalar!(read_f32, f32, 4, LE::read_f32);
    read_scalar!(read_f64, f64, 8, LE::read_f64);
}
