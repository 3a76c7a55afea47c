//! HD Edition header block.
//!
//! Much simpler than the DE block: a DLC list, a fixed 8-slot player table
//! using HD strings, and the lobby GUID and names. Only recordings newer
//! than save 12.34 carry it.

use crate::version::Version;
use crate::Result;
use mgz_support::{decode_utf8, ByteCursor};
use serde::Serialize;
use uuid::Uuid;

/// A lobby slot of an HD recording. Empty slots (no name) are dropped.
#[derive(Debug, Clone, Serialize)]
pub struct HdPlayer {
    pub number: i32,
    pub color_id: i32,
    pub name: String,
    /// Steam id of the slot owner.
    pub profile_id: u64,
    pub civilization_id: u32,
}

/// HD Edition metadata.
#[derive(Debug, Clone, Serialize)]
pub struct HdHeader {
    pub players: Vec<HdPlayer>,
    /// Lobby GUID in canonical hyphenated form.
    pub guid: String,
    pub lobby: String,
    #[serde(rename = "mod")]
    pub mod_name: String,
    pub map_id: u32,
    pub difficulty_id: u32,
}

/// Parse the HD block. `Ok(None)` for other editions and for HD saves at or
/// below 12.34, which predate it.
pub fn parse_hd(cur: &mut ByteCursor<'_>, version: Version, save: f32) -> Result<Option<HdHeader>> {
    if version != Version::Hd || save <= 12.34 {
        return Ok(None);
    }
    log::debug!("[hd] start pos={} save={}", cur.tell(), save);

    cur.skip(12)?;
    let dlc_count = cur.read_u32()?;
    cur.skip(dlc_count as usize * 4)?;
    cur.skip(4)?;
    let difficulty_id = cur.read_u32()?;
    let map_id = cur.read_u32()?;
    cur.skip(80)?;

    let mut players = Vec::new();
    for _ in 0..8 {
        cur.skip(4)?;
        let color_id = cur.read_i32()?;
        cur.skip(12)?;
        let civilization_id = cur.read_u32()?;
        cur.read_hd_string()?;
        cur.skip(1)?;
        cur.read_hd_string()?;
        let name = decode_utf8(cur.read_hd_string()?);
        cur.skip(4)?;
        let profile_id = cur.read_u64()?;
        let number = cur.read_i32()?;
        cur.skip(8)?;
        if !name.is_empty() {
            players.push(HdPlayer {
                number,
                color_id,
                name,
                profile_id,
                civilization_id,
            });
        }
    }
    log::debug!("[hd] {} occupied slots pos={}", players.len(), cur.tell());

    cur.skip(26)?;
    cur.read_hd_string()?;
    cur.skip(8)?;
    cur.read_hd_string()?;
    cur.skip(8)?;
    cur.read_hd_string()?;
    cur.skip(8)?;
    let guid_bytes: [u8; 16] = cur.take(16)?.try_into().expect("16-byte read");
    let guid = Uuid::from_bytes(guid_bytes).to_string();
    let lobby = decode_utf8(cur.read_hd_string()?);
    let mod_name = decode_utf8(cur.read_hd_string()?);
    cur.skip(8)?;
    cur.read_hd_string()?;
    cur.skip(4)?;
    log::debug!("[hd] guid={} done pos={}", guid, cur.tell());

    Ok(Some(HdHeader {
        players,
        guid,
        lobby,
        mod_name,
        map_id,
        difficulty_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_rejects_old_hd_and_other_editions() {
        let mut cur = ByteCursor::new(&[]);
        assert!(parse_hd(&mut cur, Version::Hd, 12.34).unwrap().is_none());
        assert!(parse_hd(&mut cur, Version::De, 25.22).unwrap().is_none());
        assert!(parse_hd(&mut cur, Version::UserPatch15, 12.36)
            .unwrap()
            .is_none());
    }

    #[test]
    fn guid_renders_hyphenated() {
        let guid = Uuid::from_bytes([
            0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc,
            0xde, 0xf0,
        ])
        .to_string();
        assert_eq!(guid, "12345678-9abc-def0-1234-56789abcdef0");
    }
}
