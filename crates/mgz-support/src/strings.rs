//! Length-prefixed string reads in the several formats used by recorded
//! games, plus the text decodings that go with them.
//!
//! Classic-era strings are WINDOWS-1252; Definitive Edition strings are
//! UTF-8. Neither is guaranteed valid in real files, so both decodings are
//! best-effort and never fail.

use crate::cursor::{ByteCursor, ReadError};
use encoding_rs::WINDOWS_1252;

/// The 2-byte signature in front of DE-style string payloads.
pub const STRING_MAGIC: [u8; 2] = [0x60, 0x0a];

impl<'a> ByteCursor<'a> {
    /// Read a DE string: `60 0a` magic, `i16` length, then the bytes.
    pub fn read_de_string(&mut self) -> Result<&'a [u8], ReadError> {
        let offset = self.tell();
        let got = self.take(2)?;
        if got != STRING_MAGIC {
            return Err(ReadError::MagicMismatch {
                offset,
                found: [got[0], got[1]],
            });
        }
        let length = self.read_i16()?;
        self.take(length.max(0) as usize)
    }

    /// Read an HD string: `i16` length, `60 0a` magic, then the bytes.
    pub fn read_hd_string(&mut self) -> Result<&'a [u8], ReadError> {
        let length = self.read_i16()?;
        let offset = self.tell();
        let got = self.take(2)?;
        if got != STRING_MAGIC {
            return Err(ReadError::MagicMismatch {
                offset,
                found: [got[0], got[1]],
            });
        }
        self.take(length.max(0) as usize)
    }

    /// Read an AoC string: `i16` length, then the bytes. No magic.
    pub fn read_aoc_string(&mut self) -> Result<&'a [u8], ReadError> {
        let length = self.read_i16()?;
        self.take(length.max(0) as usize)
    }

    /// Read a `u32`-length-prefixed string, as used by scenario triggers.
    pub fn read_int_string(&mut self) -> Result<&'a [u8], ReadError> {
        let length = self.read_u32()?;
        self.take(length as usize)
    }
}

/// Best-effort UTF-8 decoding; invalid sequences become U+FFFD.
pub fn decode_utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// WINDOWS-1252 decoding for classic-era strings. Total, every byte maps.
pub fn decode_1252(bytes: &[u8]) -> String {
    let (decoded, _, _) = WINDOWS_1252.decode(bytes);
    decoded.into_owned()
}
