//! Game edition detection.
//!
//! Three fields identify an edition: the 7-character ASCII tag at the start
//! of the decompressed header, the fractional save version next to it, and
//! the `log_version` u32 at the start of the body. The save version is
//! rounded to two decimals before every comparison, here and in every other
//! module.

use crate::{Error, Result};
use mgz_support::{decode_1252, ByteCursor};
use serde::Serialize;

/// Game edition of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Version {
    Aok,
    AokTrial,
    Aoc,
    AocTrial,
    Aoc10,
    Aoc10c,
    UserPatch12,
    UserPatch13,
    UserPatch14,
    UserPatch15,
    Mcp,
    Hd,
    De,
}

/// The version triple read from a recording, plus its classification.
#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub version: Version,
    /// The raw 7-character edition tag, e.g. `VER 9.4`.
    pub game_version: String,
    /// Save version, rounded to 2 decimal places.
    pub save_version: f32,
    /// First u32 of the body stream.
    pub log_version: u32,
}

/// Round to two decimal places, the precision save versions are written
/// with. All threshold comparisons assume this has been applied.
pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Classify a version triple. `None` for tags this parser has never seen.
///
/// `VER 9.4` covers everything from AoC 1.0 to current Definitive Edition
/// builds and is split on the save and log versions.
pub fn get_version(game: &str, save: f32, log: u32) -> Option<Version> {
    match game {
        "VER 9.3" => Some(Version::Aok),
        "TRL 9.3" => Some(Version::AokTrial),
        "TRL 9.4" => Some(Version::AocTrial),
        "VER 9.4" => Some(if log == 3 {
            Version::Aoc10
        } else if log == 5 || save >= 12.97 {
            Version::De
        } else if save >= 12.36 {
            Version::Hd
        } else if log == 4 {
            Version::Aoc10c
        } else {
            Version::Aoc
        }),
        "VER 9.8" => Some(Version::UserPatch12),
        "VER 9.9" => Some(Version::UserPatch13),
        "VER 9.A" | "VER 9.B" | "VER 9.C" | "VER 9.D" | "VER 9.E" => Some(Version::UserPatch14),
        "VER 9.F" | "VER 9.G" => Some(Version::UserPatch15),
        "MCP 9.F" => Some(Version::Mcp),
        _ => None,
    }
}

/// Read the edition tag and save version from the decompressed header and
/// classify them together with the body log version.
///
/// Modern saves store `-1.0` in the float slot and the real version as a
/// 16.16 fixed-point u32 right after it (with 37 kept verbatim).
pub fn parse_version(header: &mut ByteCursor<'_>, log_version: u32) -> Result<VersionInfo> {
    let game = decode_1252(header.take(7)?);
    header.skip(1)?;
    let mut save = header.read_f32()?;
    if save == -1.0 {
        let stored = header.read_u32()?;
        save = if stored == 37 {
            37.0
        } else {
            stored as f32 / 65536.0
        };
    }
    let save = round2(save);
    log::debug!(
        "[version] game={:?} save={} log={}",
        game,
        save,
        log_version
    );
    let version = get_version(&game, save, log_version).ok_or_else(|| Error::UnsupportedVersion {
        game: game.clone(),
        save,
        log: log_version,
    })?;
    Ok(VersionInfo {
        version,
        game_version: game,
        save_version: save,
        log_version,
    })
}
