//! Header decompression.
//!
//! A recording starts with `header_length: u32` and (usually) a
//! `chapter_address: u32`, followed by the header as a raw DEFLATE stream —
//! no zlib or gzip framing. The chapter address points into the body and is
//! only meaningful to body readers.

use crate::{Error, Result};
use flate2::read::DeflateDecoder;
use mgz_support::ByteCursor;
use std::io::Read;

/// Size of the `header_length` + `chapter_address` prefix.
pub const PREFIX_SIZE: usize = 8;

/// The fixed-size prefix in front of the compressed header.
#[derive(Debug, Clone, Copy)]
pub struct HeaderPrefix {
    /// End of the header section in the raw file; the body starts here.
    pub header_length: usize,
    /// Pointer to a saved-chapter checkpoint in the body. Some saves omit
    /// it, in which case compressed data starts at byte 4.
    pub chapter_address: Option<u32>,
}

impl HeaderPrefix {
    /// Offset of the first compressed byte.
    pub fn data_start(&self) -> usize {
        if self.chapter_address.is_some() {
            PREFIX_SIZE
        } else {
            4
        }
    }
}

/// Read the prefix, detecting saves that omit `chapter_address`: there the
/// second u32 is already DEFLATE data and decodes to an implausibly large
/// address.
pub fn read_prefix(raw: &[u8]) -> Result<HeaderPrefix> {
    let mut cur = ByteCursor::new(raw);
    let header_length = cur.read_u32()? as usize;
    let check = cur.read_u32()?;
    let chapter_address = if check < 100_000_000 {
        Some(check)
    } else {
        None
    };
    Ok(HeaderPrefix {
        header_length,
        chapter_address,
    })
}

/// Inflate the compressed slice `raw[start..header_length]`.
pub fn inflate(raw: &[u8], start: usize, header_length: usize) -> Result<Vec<u8>> {
    let mut cur = ByteCursor::new(raw);
    cur.seek_to(start)?;
    let compressed = cur.take(header_length.saturating_sub(start))?;
    let mut inflated = Vec::new();
    DeflateDecoder::new(compressed)
        .read_to_end(&mut inflated)
        .map_err(Error::DecompressionFailed)?;
    log::debug!(
        "[decompress] header_length={} compressed={} inflated={}",
        header_length,
        compressed.len(),
        inflated.len()
    );
    Ok(inflated)
}

/// Inflate the header of a raw recording, assuming the prefixed form
/// (chapter address present) that every supported edition writes.
pub fn decompress(raw: &[u8]) -> Result<Vec<u8>> {
    let mut cur = ByteCursor::new(raw);
    let header_length = cur.read_u32()? as usize;
    let _chapter_address = cur.read_u32()?;
    inflate(raw, PREFIX_SIZE, header_length)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Wrap `payload` in a single stored DEFLATE block.
    pub(crate) fn stored_deflate(payload: &[u8]) -> Vec<u8> {
        let len = payload.len() as u16;
        let mut out = vec![0x01];
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(!len).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// Build a raw recording: prefix + compressed header + body.
    pub(crate) fn raw_recording(header_payload: &[u8], body: &[u8]) -> Vec<u8> {
        let compressed = stored_deflate(header_payload);
        let header_length = (PREFIX_SIZE + compressed.len()) as u32;
        let mut raw = header_length.to_le_bytes().to_vec();
        raw.extend_from_slice(&0u32.to_le_bytes());
        raw.extend_from_slice(&compressed);
        raw.extend_from_slice(body);
        raw
    }

    #[test]
    fn round_trips_a_stored_block() {
        let raw = raw_recording(b"hello header", b"body");
        let inflated = decompress(&raw).unwrap();
        assert_eq!(inflated, b"hello header");
    }

    #[test]
    fn prefix_detects_missing_chapter_address() {
        let mut raw = 64u32.to_le_bytes().to_vec();
        raw.extend_from_slice(&123u32.to_le_bytes());
        assert_eq!(read_prefix(&raw).unwrap().chapter_address, Some(123));
        assert_eq!(read_prefix(&raw).unwrap().data_start(), 8);

        let mut raw = 64u32.to_le_bytes().to_vec();
        raw.extend_from_slice(&200_000_000u32.to_le_bytes());
        let prefix = read_prefix(&raw).unwrap();
        assert_eq!(prefix.chapter_address, None);
        assert_eq!(prefix.data_start(), 4);
    }

    #[test]
    fn corrupt_stream_is_a_decompression_error() {
        let mut raw = 12u32.to_le_bytes().to_vec();
        raw.extend_from_slice(&0u32.to_le_bytes());
        // BTYPE=11 is reserved and must make the inflater fail.
        raw.extend_from_slice(&[0x07, 0xff, 0xff, 0xff]);
        match decompress(&raw) {
            Err(crate::Error::DecompressionFailed(_)) => {}
            other => panic!("expected DecompressionFailed, got {:?}", other),
        }
    }

    #[test]
    fn truncated_file_is_a_read_error() {
        let mut raw = 100u32.to_le_bytes().to_vec();
        raw.extend_from_slice(&0u32.to_le_bytes());
        raw.extend_from_slice(&[0u8; 4]);
        assert!(matches!(decompress(&raw), Err(crate::Error::Read(_))));
    }
}
