//! Simple forward reader for the body (operation stream) of a recording.
//!
//! The body is decoded only down to the operation envelope: enough to walk
//! the stream, timestamp it, and expose chat, without interpreting the
//! per-command payloads.

use crate::version::Version;
use crate::{Error, Result};
use mgz_support::{decode_utf8, ByteCursor};
use serde::Serialize;

/// Sync bookkeeping metadata at the head of the body.
#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub checksum_interval: u32,
    pub is_multiplayer: bool,
    pub local_player_id: u32,
    pub header_position: u32,
    pub use_sequence_numbers: bool,
    pub num_chapters: u32,
}

impl Meta {
    pub fn read_from(cur: &mut ByteCursor<'_>) -> Result<Self> {
        // The body opens with the log version; the header parser reads it
        // through the raw buffer, so here it is only framing.
        let _log_version = cur.read_u32()?;
        let checksum_interval = cur.read_u32()?;
        let is_multiplayer = cur.read_u32()? != 0;
        let local_player_id = cur.read_u32()?;
        let header_position = cur.read_u32()?;
        let use_sequence_numbers = cur.read_u32()? != 0;
        let num_chapters = cur.read_u32()?;
        Ok(Self {
            checksum_interval,
            is_multiplayer,
            local_player_id,
            header_position,
            use_sequence_numbers,
            num_chapters,
        })
    }
}

/// One body operation, decoded to the envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", content = "payload")]
pub enum Operation {
    /// A player command; only the action id and payload size are kept.
    Command { action_id: u8, length: u32 },
    /// A sync checkpoint, with view checksums every `checksum_interval`
    /// time steps.
    Sync { time: u32 },
    /// A time step.
    Time { time: u32 },
    /// The recording owner moved their view.
    ViewLock { x: f32, y: f32, player_id: i32 },
    /// Pre-DE chat message.
    Chat { text: String },
    /// DE embedded record: the op word doubles as a byte length.
    Embedded { length: u32 },
}

/// Iterator over body operations.
///
/// `new` expects the buffer to start where the body section of the raw
/// file starts: at the `log_version` u32, followed by the meta block.
pub struct BodyOperations<'a> {
    cur: ByteCursor<'a>,
    meta: Meta,
    embedded_ops: bool,
    remaining_syncs_until_checksum: u32,
}

impl<'a> BodyOperations<'a> {
    /// Start reading operations from the beginning of a body buffer.
    pub fn new(body: &'a [u8], version: Version) -> Result<Self> {
        let mut cur = ByteCursor::new(body);
        let meta = Meta::read_from(&mut cur)?;
        let remaining_syncs_until_checksum = meta.checksum_interval;
        Ok(Self {
            cur,
            meta,
            embedded_ops: version == Version::De,
            remaining_syncs_until_checksum,
        })
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    fn read_operation(&mut self) -> Result<Operation> {
        if self.meta.use_sequence_numbers {
            let _sequence = self.cur.read_u8()?;
        }
        let offset = self.cur.tell();
        match self.cur.read_i32()? {
            0x00 => {
                let time = self.cur.read_u32()?;
                if self.remaining_syncs_until_checksum == 0 {
                    self.remaining_syncs_until_checksum = self.meta.checksum_interval;
                    let check_bytes = self.cur.read_u32()?;
                    if check_bytes == 0 {
                        // zero, three checksums, zero, next world time
                        self.cur.skip(24)?;
                    }
                }
                Ok(Operation::Sync { time })
            }
            0x01 => {
                let length = self.cur.read_u32()?;
                let payload = self.cur.take(length as usize)?;
                let action_id = payload.first().copied().unwrap_or(0);
                let _world_time = self.cur.read_u32()?;
                Ok(Operation::Command { action_id, length })
            }
            0x02 => {
                self.remaining_syncs_until_checksum =
                    self.remaining_syncs_until_checksum.saturating_sub(1);
                let time = self.cur.read_u32()?;
                Ok(Operation::Time { time })
            }
            0x03 => {
                let x = self.cur.read_f32()?;
                let y = self.cur.read_f32()?;
                let player_id = self.cur.read_i32()?;
                Ok(Operation::ViewLock { x, y, player_id })
            }
            0x04 => {
                let _check = self.cur.read_i32()?;
                let length = self.cur.read_u32()?;
                let mut text = self.cur.take(length as usize)?;
                while let Some((&0, head)) = text.split_last() {
                    text = head;
                }
                Ok(Operation::Chat {
                    text: decode_utf8(text),
                })
            }
            length if self.embedded_ops && length > 0 => {
                self.cur.skip(length as usize)?;
                Ok(Operation::Embedded {
                    length: length as u32,
                })
            }
            op => Err(Error::UnknownOperation { op, offset }),
        }
    }
}

impl Iterator for BodyOperations<'_> {
    type Item = Result<Operation>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur.remaining() == 0 {
            return None;
        }
        Some(self.read_operation())
    }
}
