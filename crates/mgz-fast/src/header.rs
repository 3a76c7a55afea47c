//! The header parsing pipeline and its output aggregate.
//!
//! Stages run strictly in sequence over the decompressed header buffer;
//! each one picks up the cursor where the previous one left it. A failure
//! in any stage is fatal and is reported with the stage name and the
//! cursor position, plus a marked hex dump of the surrounding bytes when
//! debug logging is enabled.

use crate::de::{parse_de, DeHeader};
use crate::decompress;
use crate::hd::{parse_hd, HdHeader};
use crate::lobby::{parse_lobby, Lobby};
use crate::map::{parse_map, Map};
use crate::metadata::{parse_metadata, Metadata};
use crate::players::{parse_players, ModVersion, Player};
use crate::scenario::{parse_scenario, Scenario};
use crate::version::{parse_version, Version};
use crate::{Error, Result};
use mgz_support::{hexdump, ByteCursor};
use serde::Serialize;

/// Bytes of context on either side of the failure offset in the debug hex
/// dump.
const HEXDUMP_CONTEXT: usize = 500;

/// Top-level mod information: the DLC id list on DE, the UserPatch version
/// pair on UserPatch 1.5.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ModInfo {
    DlcIds(Vec<u32>),
    UserPatch(u16, String),
}

/// A parsed recorded game header.
#[derive(Debug, Clone, Serialize)]
pub struct Header {
    pub version: Version,
    pub game_version: String,
    pub save_version: f32,
    pub log_version: u32,
    pub players: Vec<Player>,
    pub map: Map,
    pub de: Option<DeHeader>,
    pub hd: Option<HdHeader>,
    #[serde(rename = "mod")]
    pub mod_info: Option<ModInfo>,
    pub metadata: Metadata,
    pub scenario: Scenario,
    pub lobby: Lobby,
    pub device: u8,
}

fn stage<T>(
    cur: &mut ByteCursor<'_>,
    name: &'static str,
    parse: impl FnOnce(&mut ByteCursor<'_>) -> Result<T>,
) -> Result<T> {
    log::debug!("[{}] stage start pos={}", name, cur.tell());
    parse(cur).map_err(|err| {
        let position = cur.tell();
        if log::log_enabled!(log::Level::Debug) {
            let start = position.saturating_sub(HEXDUMP_CONTEXT);
            let end = (position + HEXDUMP_CONTEXT).min(cur.len());
            log::debug!(
                "[{}] failure at pos={}\n{}",
                name,
                position,
                hexdump(&cur.buffer()[start..end], start, Some(position))
            );
        }
        Error::Stage {
            stage: name,
            position,
            source: Box::new(err),
        }
    })
}

/// Parse the header of a raw recording.
///
/// `raw` is the complete file contents. The compressed header is inflated
/// into its own buffer and decoded in a single forward pass; the raw
/// buffer is only touched again for the `log_version` u32 at the start of
/// the body.
pub fn parse(raw: &[u8]) -> Result<Header> {
    let inflated = decompress::decompress(raw)?;
    let mut header = ByteCursor::new(&inflated);

    let mut body = ByteCursor::new(raw);
    let header_length = body.read_u32()? as usize;
    body.seek_to(header_length)?;
    let log_version = body.read_u32()?;

    let info = stage(&mut header, "version", |cur| {
        parse_version(cur, log_version)
    })?;
    let (version, save) = (info.version, info.save_version);
    if !matches!(version, Version::UserPatch15 | Version::Hd | Version::De) {
        return Err(Error::UnsupportedVersion {
            game: info.game_version,
            save,
            log: log_version,
        });
    }

    let de = stage(&mut header, "de", |cur| parse_de(cur, version, save))?;
    let hd = stage(&mut header, "hd", |cur| parse_hd(cur, version, save))?;
    let (metadata, num_players) = stage(&mut header, "metadata", |cur| parse_metadata(cur, save))?;
    let map = stage(&mut header, "map", |cur| parse_map(cur, version, save))?;
    let (players, mod_version, device) = stage(&mut header, "players", |cur| {
        parse_players(cur, num_players, version, save)
    })?;
    let scenario = stage(&mut header, "scenario", |cur| {
        parse_scenario(cur, version, save)
    })?;
    let lobby = stage(&mut header, "lobby", |cur| parse_lobby(cur, version, save))?;

    let mod_info = mod_info(&de, mod_version);
    Ok(Header {
        version,
        game_version: info.game_version,
        save_version: save,
        log_version,
        players,
        map,
        de,
        hd,
        mod_info,
        metadata,
        scenario,
        lobby,
        device,
    })
}

fn mod_info(de: &Option<DeHeader>, mod_version: Option<ModVersion>) -> Option<ModInfo> {
    match de {
        Some(de) => Some(ModInfo::DlcIds(de.dlc_ids.clone())),
        None => mod_version.map(|(major, minor)| ModInfo::UserPatch(major, minor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompress::tests::raw_recording;

    fn version_header(tag: &str, save: f32) -> Vec<u8> {
        let mut data = tag.as_bytes().to_vec();
        data.push(0);
        data.extend_from_slice(&save.to_le_bytes());
        data
    }

    #[test]
    fn rejects_versions_outside_the_supported_set() {
        // AoC 1.0c: classified, but not parseable by this crate.
        let raw = raw_recording(&version_header("VER 9.4", 11.76), &0u32.to_le_bytes());
        match parse(&raw) {
            Err(Error::UnsupportedVersion { game, .. }) => assert_eq!(game, "VER 9.4"),
            other => panic!("expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn wraps_stage_failures_with_name_and_position() {
        // A valid DE version header with nothing after it: the DE stage
        // must fail with a truncation wrapped in a Stage error.
        let raw = raw_recording(&version_header("VER 9.4", 25.22), &5u32.to_le_bytes());
        match parse(&raw) {
            Err(Error::Stage {
                stage,
                position,
                source,
            }) => {
                assert_eq!(stage, "de");
                // The version fields span 12 bytes; the DE stage fails on
                // its very first read.
                assert_eq!(position, 12);
                assert!(matches!(*source, Error::Read(_)));
            }
            other => panic!("expected Stage error, got {:?}", other),
        }
    }

    #[test]
    fn mod_field_prefers_de_dlc_ids() {
        assert!(mod_info(&None, None).is_none());
        let up = mod_info(&None, Some((1, "5".into())));
        assert!(matches!(up, Some(ModInfo::UserPatch(1, _))));
    }

    #[test]
    fn header_serializes_with_renamed_fields() {
        let json = serde_json::to_string(&ModInfo::UserPatch(1, "9.4".into())).unwrap();
        assert_eq!(json, "[1,\"9.4\"]");
        let json = serde_json::to_string(&ModInfo::DlcIds(vec![5, 6])).unwrap();
        assert_eq!(json, "[5,6]");
    }
}
