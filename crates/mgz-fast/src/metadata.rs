//! Game metadata block: AI presence, speed, recording owner, player count.
//!
//! When AI scripts are present the blob has no length prefix at all; the
//! only way past it is to scan for the run of 4096 zero bytes that pads its
//! end.

use crate::{Error, Result};
use mgz_support::{find_zero_run, ByteCursor};
use serde::Serialize;

/// Length of the zero-byte run that terminates an AI script blob.
const AI_END_RUN: usize = 4096;

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub speed: f32,
    pub owner_id: i16,
    pub cheats: bool,
}

/// Parse the metadata block. Returns the record and the player count
/// (including Gaia) that the players block needs.
pub fn parse_metadata(cur: &mut ByteCursor<'_>, save: f32) -> Result<(Metadata, u8)> {
    log::debug!("[metadata] start pos={}", cur.tell());
    let ai = cur.read_u32()?;
    if ai > 0 {
        let offset = cur.tell();
        let run = find_zero_run(cur.rest(), AI_END_RUN).ok_or(Error::AnchorNotFound {
            anchor: "end of AI data",
            offset,
        })?;
        cur.seek_to(offset + run + AI_END_RUN)?;
        log::debug!("[metadata] skipped AI data, pos={}", cur.tell());
    }

    cur.skip(24)?;
    let speed = cur.read_f32()?;
    cur.skip(17)?;
    let owner_id = cur.read_i16()?;
    let num_players = cur.read_u8()?;
    cur.skip(1)?;
    let cheats = cur.read_i8()?;
    log::debug!(
        "[metadata] speed={} owner={} num_players={} pos={}",
        speed,
        owner_id,
        num_players,
        cur.tell()
    );

    if save < 61.5 {
        cur.skip(60)?;
    } else {
        cur.skip(24 + num_players as usize * 4)?;
    }

    Ok((
        Metadata {
            speed,
            owner_id,
            cheats: cheats == 1,
        },
        num_players,
    ))
}
