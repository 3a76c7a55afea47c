//! Players block: per-player records with their embedded object lists.
//!
//! The block sits inside padding that cannot be decoded sequentially. The
//! whole section is located by the Gaia name anchor, and each player's
//! object lists are recovered by fingerprint scanning: object records have
//! no length prefix, but their first bytes (object class, owner, and an
//! `ff ff ff ff` run) are distinctive enough to search for.

use crate::version::Version;
use crate::{Error, Result};
use mgz_support::{decode_1252, find_bytes, ByteCursor, BytePattern, Pat};
use serde::Serialize;

/// Object classes that anchor the heuristic scan: 10 static, 30 moving,
/// 70 combat unit, 80 building, 20 animated.
const OBJECT_CLASSES: &[u8] = &[0x0a, 0x1e, 0x46, 0x50, 0x14];

/// Byte pairs that cannot start the object-id field of a real record.
const FORBIDDEN_ID_PREFIXES: &[[u8; 2]] = &[[0xff, 0xff], [0x00, 0x00]];

/// Leading fingerprints of fixed-length objects that are skipped without
/// decoding. Currently only object 647, a junk DE object that appears
/// thousands of times per file.
const SKIP_OBJECTS: &[[u8; 4]] = &[*b"\x1e\x00\x87\x02"];

/// Two-byte sentinel terminating serialized sub-records.
const BLOCK_END: &[u8] = &[0x00, 0x0b];

/// How far ahead of the cursor an object fingerprint may be.
const OBJECT_SEARCH_WINDOW: usize = 10_000;

/// Serialized size of an object record.
const OBJECT_SIZE: usize = 31;

/// Width of the player-end marker.
const PLAYER_END_SIZE: usize = 26;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// An in-game object owned by a player.
#[derive(Debug, Clone, Serialize)]
pub struct Object {
    pub class_id: i8,
    pub object_id: u16,
    pub instance_id: u32,
    pub position: Position,
    /// Which pass found it: 0 alive, 1 sleeping, 2 doppelganger.
    pub index: u8,
}

/// A player as recovered from the embedded players block.
#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub number: i32,
    #[serde(rename = "type")]
    pub player_type: i8,
    pub name: String,
    pub diplomacy: Vec<i32>,
    pub civilization_id: u8,
    pub color_id: u8,
    pub position: Position,
    pub objects: Vec<Object>,
}

/// UserPatch mod version: major number and dotted minor digits.
pub type ModVersion = (u16, String);

/// `<class> <player> <4-byte id, not ffff/0000> ff ff ff ff <non-ff>`
fn object_fingerprint(player: u8) -> BytePattern {
    BytePattern::new(vec![
        Pat::OneOf(OBJECT_CLASSES),
        Pat::Byte(player),
        Pat::NotPair(FORBIDDEN_ID_PREFIXES),
        Pat::Any,
        Pat::Any,
        Pat::Any,
        Pat::Any,
        Pat::Byte(0xff),
        Pat::Byte(0xff),
        Pat::Byte(0xff),
        Pat::Byte(0xff),
        Pat::Not(0xff),
    ])
}

/// `0b 00 ?? 00 00 00 02 00 00`, the start of a player's object lists.
fn object_start_pattern() -> BytePattern {
    BytePattern::new(vec![
        Pat::Byte(0x0b),
        Pat::Byte(0x00),
        Pat::Any,
        Pat::Byte(0x00),
        Pat::Byte(0x00),
        Pat::Byte(0x00),
        Pat::Byte(0x02),
        Pat::Byte(0x00),
        Pat::Byte(0x00),
    ])
}

/// `ff ×8, any byte, 00 ×16, 0b` — the 26-byte marker after a player's
/// object lists.
fn player_end_pattern() -> BytePattern {
    let mut elems = vec![Pat::Byte(0xff); 8];
    elems.push(Pat::Any);
    elems.extend(std::iter::repeat(Pat::Byte(0x00)).take(16));
    elems.push(Pat::Byte(0x0b));
    BytePattern::new(elems)
}

/// Decode the object record starting at `pos`.
fn parse_object(data: &[u8], pos: usize, index: u8) -> Result<Object> {
    let mut cur = ByteCursor::new(data);
    cur.seek_to(pos)?;
    let class_id = cur.read_i8()?;
    cur.skip(1)?;
    let object_id = cur.read_u16()?;
    cur.skip(14)?;
    let instance_id = cur.read_u32()?;
    cur.skip(1)?;
    let x = cur.read_f32()?;
    let y = cur.read_f32()?;
    Ok(Object {
        class_id,
        object_id,
        instance_id,
        position: Position { x, y },
        index,
    })
}

fn next_block_end(data: &[u8], from: usize) -> Result<usize> {
    let tail = data.get(from..).unwrap_or_default();
    find_bytes(tail, BLOCK_END)
        .map(|at| at + BLOCK_END.len())
        .ok_or(Error::AnchorNotFound {
            anchor: "object block end",
            offset: from,
        })
}

/// Scan one object pass for `fingerprint` starting at `pos`.
///
/// A pass ends when the fingerprint search comes up empty, or when the
/// closest `BLOCK_END` sits exactly 8 bytes before the next match — that
/// match then belongs to the next pass. Returns the objects and the
/// position just past the terminating `BLOCK_END`.
fn object_block(
    data: &[u8],
    mut pos: usize,
    fingerprint: &BytePattern,
    index: u8,
) -> Result<(Vec<Object>, usize)> {
    let mut objects = Vec::new();
    let mut end;
    loop {
        let matched = fingerprint.find(data, pos, pos + OBJECT_SEARCH_WINDOW);
        end = next_block_end(data, pos)?;
        let offset = match matched {
            Some(at) => at - pos,
            None => break,
        };
        while end + 8 < offset {
            end += next_block_end(data, pos + end)?;
        }
        if end + 8 == offset {
            break;
        }
        pos += offset;
        let skip = data
            .get(pos..pos + 4)
            .map_or(false, |head| SKIP_OBJECTS.iter().any(|fp| head == fp));
        if !skip {
            objects.push(parse_object(data, pos, index)?);
        }
        pos += OBJECT_SIZE;
    }
    Ok((objects, pos + end))
}

/// Peek the UserPatch mod version from the resources array ahead of the
/// first player. The cursor position is restored.
///
/// Resource slot 198 encodes the UserPatch version as `major * 1000 +
/// minor-digits`; the layout for other editions is unknown and yields
/// `None`.
fn parse_mod(
    cur: &mut ByteCursor<'_>,
    num_players: u8,
    version: Version,
) -> Result<Option<ModVersion>> {
    let start = cur.tell();
    cur.skip(2 + num_players as usize + 36 + 5)?;
    let name_length = cur.read_i16()?;
    cur.skip(name_length.max(0) as usize + 1)?;
    let resources = cur.read_u32()?;
    cur.skip(1)?;
    let mut values = Vec::with_capacity(resources as usize);
    for _ in 0..resources {
        values.push(cur.read_f32()?);
    }
    cur.seek_to(start)?;
    if version != Version::UserPatch15 {
        return Ok(None);
    }
    Ok(values.get(198).map(|&slot| {
        let number = slot as i32;
        let minor = (number % 1000)
            .to_string()
            .chars()
            .map(String::from)
            .collect::<Vec<_>>()
            .join(".");
        ((number / 1000) as u16, minor)
    }))
}

/// Parse one player and its three object passes. Returns the player and
/// the device byte found after the object lists.
fn parse_player(
    cur: &mut ByteCursor<'_>,
    player_number: u8,
    num_players: u8,
    save: f32,
) -> Result<(Player, u8)> {
    log::debug!(
        "[players] player={} start pos={}",
        player_number,
        cur.tell()
    );
    let player_type = cur.read_i8()?;
    cur.skip(1)?;
    cur.skip(num_players as usize)?;
    let rep = if save >= 61.5 {
        num_players as usize
    } else {
        9
    };
    let mut diplomacy = Vec::with_capacity(rep);
    for _ in 0..rep {
        diplomacy.push(cur.read_i32()?);
    }
    cur.skip(5)?;
    let name_length = cur.read_i16()?;
    let name = decode_1252(cur.take((i32::from(name_length) - 1).max(0) as usize)?);
    cur.skip(2)?;
    let resources = cur.read_u32()?;
    cur.skip(1)?;
    let resources_len = if save >= 63.0 { 8 } else { 4 };
    cur.skip(resources as usize * resources_len)?;
    cur.skip(1)?;
    let x = cur.read_f32()?;
    let y = cur.read_f32()?;
    cur.skip(9)?;
    let civilization_id = cur.read_u8()?;
    cur.skip(3)?;
    let color_id = cur.read_u8()?;
    cur.skip(1)?;
    log::debug!(
        "[players] player={} name={:?} civ={} color={} pos={}",
        player_number,
        name,
        civilization_id,
        color_id,
        cur.tell()
    );

    // The bytes from here to the object lists cannot be parsed; skip to
    // the start marker and scan.
    let base = cur.tell();
    let data = cur.rest();
    let start_pattern = object_start_pattern();
    let start = start_pattern
        .find(data, 0, data.len())
        .map(|at| at + start_pattern.width())
        .ok_or(Error::AnchorNotFound {
            anchor: "object start",
            offset: base,
        })?;
    let fingerprint = object_fingerprint(player_number);
    let (mut objects, end) = object_block(data, start, &fingerprint, 0)?;
    let (sleeping, end) = object_block(data, end, &fingerprint, 1)?;
    let (doppel, mut end) = object_block(data, end, &fingerprint, 2)?;
    log::debug!(
        "[players] player={} objects={} sleeping={} doppel={} end={}",
        player_number,
        objects.len(),
        sleeping.len(),
        doppel.len(),
        end
    );
    objects.extend(sleeping);
    objects.extend(doppel);
    if data.get(end + 8..end + 10) == Some(BLOCK_END) {
        end += 10;
    }
    if data.get(end..end + 2) == Some(BLOCK_END) {
        end += 2;
    }
    cur.seek_to(base + end)?;

    let mut device = 0;
    if save >= 37.0 {
        let window_start = cur.tell();
        let window = cur.take(cur.remaining().min(100))?;
        device = window.get(8).copied().unwrap_or(0);
        let end_pattern = player_end_pattern();
        match end_pattern.find(window, 0, window.len()) {
            Some(at) => cur.seek_to(window_start + at + PLAYER_END_SIZE)?,
            None => {
                // Usually the marker is 26 bytes in, but when object
                // parsing left junk behind it can be tens of thousands of
                // bytes ahead.
                let fallback_start = cur.tell();
                let rest = cur.rest();
                match end_pattern.find(rest, 0, rest.len()) {
                    Some(at) => cur.seek_to(fallback_start + at + PLAYER_END_SIZE)?,
                    None if player_number + 1 < num_players => {
                        return Err(Error::AnchorNotFound {
                            anchor: "player end",
                            offset: fallback_start,
                        });
                    }
                    None => {
                        // Restored games may omit the marker for the last
                        // player.
                        log::warn!(
                            "[players] player={} has no end marker, continuing",
                            player_number
                        );
                    }
                }
            }
        }
    }
    log::debug!(
        "[players] player={} done device={} pos={}",
        player_number,
        device,
        cur.tell()
    );

    Ok((
        Player {
            number: i32::from(player_number),
            player_type,
            name,
            diplomacy,
            civilization_id,
            color_id,
            position: Position { x, y },
            objects,
        },
        device,
    ))
}

/// Parse all players, the UserPatch mod version, and the device byte.
///
/// The block is located by anchoring on Gaia's serialized name and seeking
/// back by the known distance to the first player record. After the
/// players, the per-player points statistics are skipped via the
/// points-version float marker.
pub fn parse_players(
    cur: &mut ByteCursor<'_>,
    num_players: u8,
    version: Version,
    save: f32,
) -> Result<(Vec<Player>, Option<ModVersion>, u8)> {
    let base = cur.tell();
    let gaia: &[u8] = if version == Version::De || version == Version::Hd {
        b"Gaia"
    } else {
        b"GAIA"
    };
    let mut needle = vec![0x05, 0x00];
    needle.extend_from_slice(gaia);
    needle.push(0x00);
    let anchor = find_bytes(cur.rest(), &needle).ok_or(Error::AnchorNotFound {
        anchor: "Gaia",
        offset: base,
    })?;
    let rev = if save >= 61.5 {
        7 + num_players as usize * 4
    } else {
        43
    };
    let target = (base + anchor)
        .checked_sub(num_players as usize + rev)
        .ok_or(Error::AnchorNotFound {
            anchor: "Gaia",
            offset: base,
        })?;
    log::debug!(
        "[players] gaia anchor at {}, seeking to {}",
        base + anchor,
        target
    );
    cur.seek_to(target)?;

    let mod_version = parse_mod(cur, num_players, version)?;
    let mut players = Vec::with_capacity(num_players as usize);
    let mut device = 0;
    for number in 0..num_players {
        let (player, player_device) = parse_player(cur, number, num_players, save)?;
        if number == 0 {
            device = player_device;
        }
        players.push(player);
    }

    // Points version 2.0 (legacy) or 2.1 as a float bit pattern anchors
    // the per-player statistics tail.
    let marker: &[u8] = if save >= 61.5 {
        &[0x66, 0x66, 0x06, 0x40]
    } else {
        &[0x00, 0x00, 0x00, 0x40]
    };
    let at = cur.find(marker).ok_or(Error::AnchorNotFound {
        anchor: "points version",
        offset: cur.tell(),
    })?;
    cur.skip(at)?;
    for _ in 0..num_players {
        let _points_version = cur.read_f32()?;
        let entries = cur.read_i32()?;
        cur.skip(5 + usize::try_from(entries).unwrap_or(0) * 44)?;
        let points = cur.read_i32()?;
        cur.skip(8 + usize::try_from(points).unwrap_or(0) * 32)?;
    }
    log::debug!("[players] done pos={}", cur.tell());

    Ok((players, mod_version, device))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 31-byte object record for `player` that the fingerprint matches.
    fn object_record(player: u8, object_id: u16, instance_id: u32, x: f32, y: f32) -> Vec<u8> {
        let mut rec = vec![0x46, player];
        rec.extend_from_slice(&object_id.to_le_bytes());
        rec.extend_from_slice(&[0x01, 0x02]);
        rec.extend_from_slice(&[0xff, 0xff, 0xff, 0xff]);
        rec.push(0x05);
        rec.extend_from_slice(&[0xcc; 7]);
        rec.extend_from_slice(&instance_id.to_le_bytes());
        rec.push(0xcc);
        rec.extend_from_slice(&x.to_le_bytes());
        rec.extend_from_slice(&y.to_le_bytes());
        assert_eq!(rec.len(), OBJECT_SIZE);
        rec
    }

    #[test]
    fn object_block_collects_one_record() {
        let mut data = object_record(1, 0x1234, 7, 1.0, 2.0);
        data.extend_from_slice(&[0xaa; 4]);
        data.extend_from_slice(BLOCK_END);
        let fingerprint = object_fingerprint(1);
        let (objects, end) = object_block(&data, 0, &fingerprint, 0).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].class_id, 0x46);
        assert_eq!(objects[0].object_id, 0x1234);
        assert_eq!(objects[0].instance_id, 7);
        assert_eq!(objects[0].position, Position { x: 1.0, y: 2.0 });
        assert_eq!(objects[0].index, 0);
        // One record plus the distance to the block end.
        assert_eq!(end, OBJECT_SIZE + 4 + BLOCK_END.len());
    }

    #[test]
    fn object_block_stops_at_pass_boundary() {
        // A BLOCK_END exactly 8 bytes before the next match means the
        // match belongs to the next pass.
        let mut data = BLOCK_END.to_vec();
        data.extend_from_slice(&[0xaa; 8]);
        data.extend_from_slice(&object_record(1, 1, 1, 0.0, 0.0));
        let fingerprint = object_fingerprint(1);
        let (objects, end) = object_block(&data, 0, &fingerprint, 1).unwrap();
        assert!(objects.is_empty());
        assert_eq!(end, 2);
    }

    #[test]
    fn object_block_skips_junk_objects() {
        // The junk fingerprint includes the owner byte, so it only ever
        // applies while scanning player 0.
        let mut junk = object_record(0, 1, 9, 0.0, 0.0);
        junk[0] = 0x1e;
        junk[2] = 0x87;
        junk[3] = 0x02;
        assert_eq!(&junk[..4], SKIP_OBJECTS[0].as_slice());
        let mut data = junk;
        data.extend_from_slice(&object_record(0, 0x0042, 10, 3.0, 4.0));
        data.extend_from_slice(&[0xaa; 4]);
        data.extend_from_slice(BLOCK_END);
        let fingerprint = object_fingerprint(0);
        let (objects, _) = object_block(&data, 0, &fingerprint, 0).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].object_id, 0x0042);
        assert_eq!(objects[0].instance_id, 10);
    }

    #[test]
    fn missing_block_end_is_fatal() {
        let data = object_record(1, 1, 1, 0.0, 0.0);
        let fingerprint = object_fingerprint(1);
        match object_block(&data, 0, &fingerprint, 0) {
            Err(Error::AnchorNotFound { anchor, .. }) => {
                assert_eq!(anchor, "object block end");
            }
            other => panic!("expected AnchorNotFound, got {:?}", other),
        }
    }

    #[test]
    fn player_end_marker_allows_any_filler_byte() {
        let mut window = vec![0u8; 5];
        window.extend_from_slice(&[0xff; 8]);
        window.push(0x2e);
        window.extend_from_slice(&[0x00; 16]);
        window.push(0x0b);
        let pattern = player_end_pattern();
        assert_eq!(pattern.width(), PLAYER_END_SIZE);
        assert_eq!(pattern.find(&window, 0, window.len()), Some(5));
        // The ninth byte is not fixed to 0x2e.
        window[13] = 0x99;
        assert_eq!(pattern.find(&window, 0, window.len()), Some(5));
    }

    #[test]
    fn parse_mod_reads_slot_198_and_restores_position() {
        let num_players = 2u8;
        let mut data = vec![0u8; 2 + num_players as usize + 36 + 5];
        data.extend_from_slice(&3i16.to_le_bytes());
        data.extend_from_slice(b"up!\x00");
        data.extend_from_slice(&199u32.to_le_bytes());
        data.push(0);
        for i in 0..199u32 {
            let value = if i == 198 { 1094.0f32 } else { 0.0 };
            data.extend_from_slice(&value.to_le_bytes());
        }
        let mut cur = ByteCursor::new(&data);
        let version = parse_mod(&mut cur, num_players, Version::UserPatch15)
            .unwrap()
            .unwrap();
        assert_eq!(version, (1, "9.4".to_string()));
        assert_eq!(cur.tell(), 0);

        // Other editions do not interpret the resource array.
        assert!(parse_mod(&mut cur, num_players, Version::Hd)
            .unwrap()
            .is_none());
    }

    #[test]
    fn parse_player_recovers_name_position_and_objects() {
        let save = 12.36;
        let mut data = Vec::new();
        data.push(2u8); // type
        data.push(0);
        data.push(0); // per-player diplomacy byte (1 player)
        for _ in 0..9 {
            data.extend_from_slice(&1i32.to_le_bytes());
        }
        data.extend_from_slice(&[0u8; 5]);
        data.extend_from_slice(&5i16.to_le_bytes());
        data.extend_from_slice(b"Fred");
        data.extend_from_slice(&[0u8; 2]);
        data.extend_from_slice(&2u32.to_le_bytes()); // resources
        data.push(0);
        data.extend_from_slice(&[0u8; 8]); // 2 resources * 4 bytes
        data.push(0);
        data.extend_from_slice(&10.5f32.to_le_bytes());
        data.extend_from_slice(&20.5f32.to_le_bytes());
        data.extend_from_slice(&[0u8; 9]);
        data.push(5); // civilization
        data.extend_from_slice(&[0u8; 3]);
        data.push(3); // color
        data.push(0);
        // Object area: start marker, one object for player 0, block ends
        // for the remaining passes.
        data.extend_from_slice(&[0x0b, 0x00, 0x07, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00]);
        data.extend_from_slice(&object_record(0, 0x0053, 600, 42.0, 17.0));
        data.extend_from_slice(&[0xaa; 4]);
        data.extend_from_slice(BLOCK_END);
        data.extend_from_slice(BLOCK_END);
        data.extend_from_slice(BLOCK_END);
        data.extend_from_slice(&[0xaa; 10]);

        let mut cur = ByteCursor::new(&data);
        let (player, device) = parse_player(&mut cur, 0, 1, save).unwrap();
        assert_eq!(device, 0);
        assert_eq!(player.number, 0);
        assert_eq!(player.player_type, 2);
        assert_eq!(player.name, "Fred");
        assert_eq!(player.diplomacy.len(), 9);
        assert_eq!(player.civilization_id, 5);
        assert_eq!(player.color_id, 3);
        assert_eq!(player.position, Position { x: 10.5, y: 20.5 });
        assert_eq!(player.objects.len(), 1);
        assert_eq!(player.objects[0].instance_id, 600);
    }

    #[test]
    fn missing_gaia_anchor_is_fatal() {
        let data = [0u8; 64];
        let mut cur = ByteCursor::new(&data);
        match parse_players(&mut cur, 2, Version::UserPatch15, 12.36) {
            Err(Error::AnchorNotFound { anchor, .. }) => assert_eq!(anchor, "Gaia"),
            other => panic!("expected AnchorNotFound, got {:?}", other),
        }
    }
}
