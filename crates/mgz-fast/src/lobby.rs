//! Lobby block: reveal/population/game-type settings, pre-game chat, and
//! the DE random seed. Last block of the header.

use crate::version::Version;
use crate::Result;
use mgz_support::{decode_1252, decode_utf8, ByteCursor};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Lobby {
    pub reveal_map_id: u32,
    pub map_size: u32,
    /// Population limit. Stored divided by 25 on pre-HD editions; the
    /// value here is always the real limit.
    pub population: u32,
    pub game_type_id: u8,
    pub lock_teams: bool,
    /// Pre-game lobby chat, empty entries dropped.
    pub chat: Vec<String>,
    /// Random seed, DE only.
    pub seed: Option<i32>,
}

fn trim_nulls(mut bytes: &[u8]) -> &[u8] {
    while let Some((&0, rest)) = bytes.split_first() {
        bytes = rest;
    }
    while let Some((&0, rest)) = bytes.split_last() {
        bytes = rest;
    }
    bytes
}

/// Parse the lobby block.
pub fn parse_lobby(cur: &mut ByteCursor<'_>, version: Version, save: f32) -> Result<Lobby> {
    log::debug!("[lobby] start pos={} save={}", cur.tell(), save);
    if version == Version::De {
        cur.skip(5)?;
        if save >= 20.06 {
            cur.skip(9)?;
        }
        if save >= 26.16 {
            cur.skip(5)?;
        }
        if save >= 37.0 {
            cur.skip(8)?;
        }
        if save >= 64.3 {
            cur.skip(16)?;
        }
        if save >= 66.3 {
            cur.skip(1)?;
        }
    }
    cur.skip(8)?;
    let modern = version == Version::De || version == Version::Hd;
    if !modern {
        cur.skip(1)?;
    }
    let reveal_map_id = cur.read_u32()?;
    cur.skip(4)?;
    let map_size = cur.read_u32()?;
    let population = cur.read_u32()?;
    let game_type_id = cur.read_u8()?;
    let lock_teams = cur.read_i8()?;
    log::debug!(
        "[lobby] reveal={} map_size={} population={} game_type={} pos={}",
        reveal_map_id,
        map_size,
        population,
        game_type_id,
        cur.tell()
    );
    if modern {
        cur.skip(5)?;
        if save >= 13.13 {
            cur.skip(4)?;
        }
        if save >= 25.22 {
            cur.skip(1)?;
        }
    }

    let chat_count = cur.read_u32()?;
    let mut chat = Vec::new();
    for _ in 0..chat_count {
        let length = cur.read_u32()?;
        let message = trim_nulls(cur.take(length as usize)?);
        if message.is_empty() {
            continue;
        }
        chat.push(if modern {
            decode_utf8(message)
        } else {
            decode_1252(message)
        });
    }
    let seed = if version == Version::De {
        Some(cur.read_i32()?)
    } else {
        None
    };
    log::debug!("[lobby] {} chat messages, done pos={}", chat.len(), cur.tell());

    Ok(Lobby {
        reveal_map_id,
        map_size,
        population: population * if modern { 1 } else { 25 },
        game_type_id,
        lock_teams: lock_teams == 1,
        chat,
        seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(reveal: u32, map_size: u32, population: u32, game_type: u8, lock: u8) -> Vec<u8> {
        let mut data = reveal.to_le_bytes().to_vec();
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(&map_size.to_le_bytes());
        data.extend_from_slice(&population.to_le_bytes());
        data.push(game_type);
        data.push(lock);
        data
    }

    fn chat_entry(text: &[u8]) -> Vec<u8> {
        let mut out = (text.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(text);
        out
    }

    #[test]
    fn parses_a_userpatch_lobby_and_scales_population() {
        let mut data = vec![0u8; 8 + 1];
        data.extend_from_slice(&settings(1, 4, 8, 9, 1));
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&chat_entry(b"11 hi all\x00"));
        data.extend_from_slice(&chat_entry(b"\x00\x00\x00"));
        let mut cur = ByteCursor::new(&data);
        let lobby = parse_lobby(&mut cur, Version::UserPatch15, 12.36).unwrap();
        assert_eq!(lobby.reveal_map_id, 1);
        assert_eq!(lobby.map_size, 4);
        // Legacy editions store population / 25.
        assert_eq!(lobby.population, 200);
        assert_eq!(lobby.game_type_id, 9);
        assert!(lobby.lock_teams);
        assert_eq!(lobby.chat, vec!["11 hi all".to_string()]);
        assert_eq!(lobby.seed, None);
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn parses_a_de_lobby_with_seed() {
        let save = 26.21;
        // DE skip ladder at 26.21: 5 + 9 + 5 bytes.
        let mut data = vec![0u8; 5 + 9 + 5];
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(&settings(2, 6, 250, 12, 0));
        data.extend_from_slice(&[0u8; 5 + 4 + 1]);
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&chat_entry(b"{\"messageAGP\":\"gg\"}\x00"));
        data.extend_from_slice(&(-7i32).to_le_bytes());
        let mut cur = ByteCursor::new(&data);
        let lobby = parse_lobby(&mut cur, Version::De, save).unwrap();
        assert_eq!(lobby.population, 250);
        assert!(!lobby.lock_teams);
        assert_eq!(lobby.chat, vec!["{\"messageAGP\":\"gg\"}".to_string()]);
        assert_eq!(lobby.seed, Some(-7));
        assert_eq!(cur.remaining(), 0);
    }
}
