//! Scenario block: embedded scenario data, instructions, triggers.
//!
//! Most of the block is a long ladder of fixed-size reads. The interesting
//! part is at the end: the offset of the settings section cannot be
//! computed, so the parser anchors on the IEEE-754 bit pattern of the
//! per-version settings float and resynchronizes there.

use crate::version::Version;
use crate::{Error, Result};
use mgz_support::{decode_1252, find_bytes, ByteCursor};
use serde::Serialize;

/// Settings-section versions by save threshold; the f64 encoding of the
/// matching value is the resynchronization anchor on DE.
const SETTINGS_VERSIONS: &[(f32, f64)] = &[
    (66.3, 4.5),
    (64.3, 4.1),
    (63.0, 3.9),
    (61.5, 3.6),
    (37.0, 3.5),
    (26.21, 3.2),
    (26.16, 3.0),
    (25.22, 2.6),
    (25.06, 2.5),
    (13.34, 2.4),
];

/// Settings version of pre-DE editions, 1.6 as an f64.
const LEGACY_SETTINGS_ANCHOR: [u8; 8] = [0x9a, 0x99, 0x99, 0x99, 0x99, 0x99, 0xf9, 0x3f];

#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    pub map_id: u32,
    pub difficulty_id: u32,
    pub instructions: String,
    pub scenario_filename: String,
}

fn settings_version(save: f32) -> f64 {
    SETTINGS_VERSIONS
        .iter()
        .find(|(threshold, _)| save >= *threshold)
        .map(|(_, version)| *version)
        .unwrap_or(2.2)
}

/// Parse the scenario block.
pub fn parse_scenario(cur: &mut ByteCursor<'_>, version: Version, save: f32) -> Result<Scenario> {
    log::debug!("[scenario] start pos={} save={}", cur.tell(), save);
    let _scenario_version = cur.read_f32()?;
    cur.skip(4)?;
    if save >= 61.5 {
        cur.skip(4)?;
        if save < 66.6 {
            cur.skip(4)?;
        }
    }
    // Per-player name table and string ids.
    cur.skip(16 * 256)?;
    cur.skip(16 * 4)?;
    if save >= 66.6 {
        for _ in 0..16 {
            cur.skip(8)?;
            cur.read_de_string()?;
            cur.read_de_string()?;
            cur.skip(4)?;
        }
    }
    if (61.5..66.6).contains(&save) {
        cur.skip(64)?;
    }
    if save < 66.6 {
        for _ in 0..16 {
            cur.skip(12)?;
            if save >= 13.34 {
                cur.skip(4)?;
            }
            cur.skip(4)?;
        }
    }
    cur.skip(1)?;
    let _elapsed_time = cur.read_f32()?;
    if version == Version::De {
        cur.skip(64)?;
    }
    if save >= 66.6 {
        cur.skip(68)?;
    }
    let scenario_filename = decode_1252(cur.read_aoc_string()?);
    log::debug!(
        "[scenario] filename={:?} pos={}",
        scenario_filename,
        cur.tell()
    );
    cur.skip(24)?;
    let instructions = decode_1252(cur.read_aoc_string()?);
    for _ in 0..9 {
        cur.read_aoc_string()?;
    }
    cur.skip(78)?;
    for _ in 0..16 {
        cur.read_aoc_string()?;
    }
    cur.skip(196)?;
    for _ in 0..16 {
        cur.skip(24)?;
        if version == Version::De || version == Version::Hd {
            cur.skip(4)?;
        }
    }
    // Embedded terrain blob.
    cur.skip(12672)?;
    if version == Version::De {
        cur.skip(196)?;
    } else {
        cur.skip(16 * 332)?;
    }
    if version == Version::Hd {
        cur.skip(644)?;
    }
    cur.skip(88)?;
    if version == Version::Hd {
        cur.skip(16)?;
    }
    let map_id = cur.read_u32()?;
    let difficulty_id = cur.read_u32()?;
    log::debug!(
        "[scenario] map_id={} difficulty_id={} pos={}",
        map_id,
        difficulty_id,
        cur.tell()
    );

    // Resynchronize on the settings version float.
    let remainder = cur.rest();
    let offset = cur.tell();
    let at = if version == Version::De {
        let anchor = settings_version(save).to_le_bytes();
        find_bytes(remainder, &anchor).map(|at| at + 8)
    } else {
        find_bytes(remainder, &LEGACY_SETTINGS_ANCHOR).map(|at| at + 13)
    };
    let at = at.ok_or(Error::AnchorNotFound {
        anchor: "settings version",
        offset,
    })?;
    cur.seek_to(offset + at)?;
    log::debug!("[scenario] settings anchor, pos={}", cur.tell());

    if version == Version::De {
        cur.skip(1)?;
        let n_triggers = cur.read_u32()?;
        log::debug!("[scenario] n_triggers={} pos={}", n_triggers, cur.tell());
        for _ in 0..n_triggers {
            cur.skip(22)?;
            cur.skip(4)?;
            let _description = cur.read_int_string()?;
            let _name = cur.read_int_string()?;
            let _short_description = cur.read_int_string()?;
            let n_effects = cur.read_u32()?;
            for _ in 0..n_effects {
                cur.skip(216)?;
                let _text = cur.read_int_string()?;
                let _sound = cur.read_int_string()?;
            }
            cur.skip(n_effects as usize * 4)?;
            let n_conditions = cur.read_u32()?;
            cur.skip(n_conditions as usize * 125)?;
        }
        cur.skip(n_triggers as usize * 4)?;
        cur.skip(1032)?;
    }
    log::debug!("[scenario] done pos={}", cur.tell());

    Ok(Scenario {
        map_id,
        difficulty_id,
        instructions,
        scenario_filename,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_version_ladder() {
        assert_eq!(settings_version(66.3), 4.5);
        assert_eq!(settings_version(66.29), 4.1);
        assert_eq!(settings_version(63.0), 3.9);
        assert_eq!(settings_version(37.0), 3.5);
        assert_eq!(settings_version(26.21), 3.2);
        assert_eq!(settings_version(26.16), 3.0);
        assert_eq!(settings_version(25.22), 2.6);
        assert_eq!(settings_version(25.06), 2.5);
        assert_eq!(settings_version(13.34), 2.4);
        assert_eq!(settings_version(13.03), 2.2);
    }

    #[test]
    fn legacy_anchor_is_the_f64_for_1_6() {
        assert_eq!(1.6f64.to_le_bytes(), LEGACY_SETTINGS_ANCHOR);
    }

    fn aoc_string(text: &str) -> Vec<u8> {
        let mut out = (text.len() as i16).to_le_bytes().to_vec();
        out.extend_from_slice(text.as_bytes());
        out
    }

    /// Build a minimal legacy (UserPatch) scenario block.
    fn legacy_scenario_block(save: f32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&1.22f32.to_le_bytes());
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(&[0u8; 16 * 256]);
        data.extend_from_slice(&[0u8; 16 * 4]);
        for _ in 0..16 {
            data.extend_from_slice(&[0u8; 12]);
            if save >= 13.34 {
                data.extend_from_slice(&[0u8; 4]);
            }
            data.extend_from_slice(&[0u8; 4]);
        }
        data.push(0);
        data.extend_from_slice(&0.0f32.to_le_bytes());
        data.extend_from_slice(&aoc_string("real_world_spain.scx"));
        data.extend_from_slice(&[0u8; 24]);
        data.extend_from_slice(&aoc_string("Defeat your rivals."));
        for _ in 0..9 {
            data.extend_from_slice(&aoc_string(""));
        }
        data.extend_from_slice(&[0u8; 78]);
        for _ in 0..16 {
            data.extend_from_slice(&aoc_string(""));
        }
        data.extend_from_slice(&[0u8; 196]);
        data.extend_from_slice(&[0u8; 16 * 24]);
        data.extend_from_slice(&[0u8; 12672]);
        data.extend_from_slice(&[0u8; 16 * 332]);
        data.extend_from_slice(&[0u8; 88]);
        data.extend_from_slice(&29u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        // Unparseable padding, then the settings anchor and its tail.
        data.extend_from_slice(&[0xaa; 32]);
        data.extend_from_slice(&LEGACY_SETTINGS_ANCHOR);
        data.extend_from_slice(&[0xbb; 5]);
        data.extend_from_slice(&[0xcc; 7]);
        data
    }

    #[test]
    fn parses_a_legacy_scenario_and_resynchronizes() {
        let save = 12.36;
        let data = legacy_scenario_block(save);
        let mut cur = ByteCursor::new(&data);
        let scenario = parse_scenario(&mut cur, Version::UserPatch15, save).unwrap();
        assert_eq!(scenario.map_id, 29);
        assert_eq!(scenario.difficulty_id, 2);
        assert_eq!(scenario.scenario_filename, "real_world_spain.scx");
        assert_eq!(scenario.instructions, "Defeat your rivals.");
        // Anchor + 13 leaves exactly the 7 trailing bytes.
        assert_eq!(cur.remaining(), 7);
    }

    #[test]
    fn missing_settings_anchor_is_fatal() {
        let save = 12.36;
        let mut data = legacy_scenario_block(save);
        let anchor_at = find_bytes(&data, &LEGACY_SETTINGS_ANCHOR).unwrap();
        data[anchor_at] ^= 0xff;
        let mut cur = ByteCursor::new(&data);
        match parse_scenario(&mut cur, Version::UserPatch15, save) {
            Err(Error::AnchorNotFound { anchor, .. }) => assert_eq!(anchor, "settings version"),
            other => panic!("expected AnchorNotFound, got {:?}", other),
        }
    }
}
