//! Definitive Edition header block.
//!
//! Present only on DE recordings, directly after the version fields. The
//! layout accumulated a threshold for almost every game update; the reads
//! below keep the exact order and the exact strict/non-strict comparisons
//! of the format, including the `save > 50` checks that are strict.

use crate::version::Version;
use crate::Result;
use mgz_support::{decode_utf8, ByteCursor};
use serde::Serialize;
use sha1::{Digest, Sha1};
use uuid::Uuid;

/// A lobby slot of a DE recording.
///
/// Slots are what the lobby configured; the authoritative player list of a
/// parsed header comes from the embedded-objects pass instead.
#[derive(Debug, Clone, Serialize)]
pub struct DePlayer {
    pub number: i32,
    pub color_id: i32,
    pub team_id: i8,
    pub ai_name: String,
    pub name: String,
    /// Same as `name` before save 66.3 introduced censoring.
    pub censored_name: String,
    #[serde(rename = "type")]
    pub player_type: u32,
    pub profile_id: u32,
    pub civilization_id: u32,
    pub custom_civ_selection: Option<Vec<u32>>,
    pub prefer_random: bool,
}

/// Definitive Edition metadata.
#[derive(Debug, Clone, Serialize)]
pub struct DeHeader {
    pub players: Vec<DePlayer>,
    /// Lobby GUID in canonical hyphenated form.
    pub guid: String,
    /// SHA-1 of the raw GUID bytes, hex encoded.
    pub hash: String,
    pub lobby: String,
    #[serde(rename = "mod")]
    pub mod_name: String,
    pub difficulty_id: u32,
    pub victory_type_id: u32,
    pub starting_resources_id: u32,
    /// Shifted so 0 is Dark Age; 0 also covers the pre-game default.
    pub starting_age_id: u32,
    pub ending_age_id: u32,
    pub map_dimension: Option<u32>,
    pub speed: f32,
    pub population_limit: u32,
    pub treaty_length: u32,
    pub team_together: bool,
    pub all_technologies: bool,
    pub lock_teams: bool,
    pub lock_speed: bool,
    pub multiplayer: bool,
    pub cheats: bool,
    pub record_game: bool,
    pub animals_enabled: bool,
    pub predators_enabled: bool,
    pub turbo_enabled: bool,
    pub shared_exploration: bool,
    pub team_positions: bool,
    pub build: Option<u32>,
    pub timestamp: Option<u32>,
    pub spec_delay: u32,
    pub rated: bool,
    pub allow_specs: bool,
    pub hidden_civs: bool,
    pub visibility_id: u32,
    pub rms_mod_id: Option<String>,
    pub rms_map_id: u32,
    pub rms_filename: Option<String>,
    pub dlc_ids: Vec<u32>,
}

/// Read one string block: `(crc, DE string)` pairs until a crc strictly
/// inside (0, 255) terminates the block. The terminator is consumed.
pub(crate) fn string_block(cur: &mut ByteCursor<'_>) -> Result<Vec<Vec<String>>> {
    let mut strings = Vec::new();
    loop {
        let crc = cur.read_u32()?;
        if crc > 0 && crc < 255 {
            break;
        }
        let raw = cur.read_de_string()?;
        strings.push(decode_utf8(raw).split(':').map(String::from).collect());
    }
    Ok(strings)
}

/// Locate the subscribed random-map-script mod in the accumulated string
/// table: `SUBSCRIBEDMODS:RANDOM_MAPS:<filename>:<workshop id>_...`.
fn subscribed_rms(strings: &[Vec<String>]) -> (Option<String>, Option<String>) {
    let mut rms_mod_id = None;
    let mut rms_filename = None;
    for entry in strings {
        if entry.len() >= 4 && entry[0] == "SUBSCRIBEDMODS" && entry[1] == "RANDOM_MAPS" {
            rms_mod_id = entry[3].split('_').next().map(String::from);
            rms_filename = Some(entry[2].clone());
        }
    }
    (rms_mod_id, rms_filename)
}

fn shift_age(age_id: u32) -> u32 {
    if age_id > 0 {
        age_id.saturating_sub(2)
    } else {
        0
    }
}

/// Parse the DE block. `Ok(None)` for every other edition.
pub fn parse_de(cur: &mut ByteCursor<'_>, version: Version, save: f32) -> Result<Option<DeHeader>> {
    if version != Version::De {
        return Ok(None);
    }
    log::debug!("[de] start pos={} save={}", cur.tell(), save);

    let build = if save >= 25.22 {
        Some(cur.read_u32()?)
    } else {
        None
    };
    let mut timestamp = if save >= 26.16 {
        Some(cur.read_u32()?)
    } else {
        None
    };
    cur.skip(12)?;

    let dlc_count = cur.read_u32()?;
    let mut dlc_ids = Vec::with_capacity(dlc_count as usize);
    for _ in 0..dlc_count {
        dlc_ids.push(cur.read_u32()?);
    }
    log::debug!("[de] dlc_ids={:?} pos={}", dlc_ids, cur.tell());

    cur.skip(4)?;
    let mut map_dimension = None;
    let mut difficulty_id = 0;
    if save >= 61.5 {
        map_dimension = Some(cur.read_u32()?);
    } else {
        difficulty_id = cur.read_u32()?;
    }
    cur.skip(4)?;
    let rms_map_id = cur.read_u32()?;
    cur.skip(4)?;
    let victory_type_id = cur.read_u32()?;
    let starting_resources_id = cur.read_u32()?;
    let starting_age_id = cur.read_u32()?;
    let ending_age_id = cur.read_u32()?;
    cur.skip(12)?;
    let speed = cur.read_f32()?;
    let treaty_length = cur.read_u32()?;
    let population_limit = cur.read_u32()?;
    let num_players = cur.read_u32()?;
    log::debug!(
        "[de] speed={} pop={} num_players={} pos={}",
        speed,
        population_limit,
        num_players,
        cur.tell()
    );
    cur.skip(14)?;
    if save >= 61.5 {
        difficulty_id = u32::from(cur.read_u8()?);
    }
    let random_positions = cur.read_i8()?;
    let all_technologies = cur.read_i8()?;
    cur.skip(1)?;
    let lock_teams = cur.read_i8()?;
    let lock_speed = cur.read_i8()?;
    let multiplayer = cur.read_i8()?;
    let cheats = cur.read_i8()?;
    let record_game = cur.read_i8()?;
    let animals_enabled = cur.read_i8()?;
    let predators_enabled = cur.read_i8()?;
    let turbo_enabled = cur.read_i8()?;
    let shared_exploration = cur.read_i8()?;
    let team_positions = cur.read_i8()?;
    cur.skip(12)?;
    if save >= 25.06 {
        cur.skip(1)?;
    }
    if save > 50.0 {
        cur.skip(1)?;
    }

    let slots = if (37.0..66.3).contains(&save) {
        num_players as usize
    } else {
        8
    };
    log::debug!("[de] reading {} player slots pos={}", slots, cur.tell());
    let mut players = Vec::with_capacity(slots);
    for _ in 0..slots {
        cur.skip(4)?;
        let color_id = cur.read_i32()?;
        cur.skip(2)?;
        let team_id = cur.read_i8()?;
        cur.skip(9)?;
        let civilization_id = cur.read_u32()?;
        let mut custom_civ_selection = None;
        if save >= 61.5 {
            let custom_civ_count = cur.read_u32()?;
            if save >= 63.0 && custom_civ_count > 0 {
                let mut ids = Vec::with_capacity(custom_civ_count as usize);
                for _ in 0..custom_civ_count {
                    ids.push(cur.read_u32()?);
                }
                custom_civ_selection = Some(ids);
            }
        }
        cur.read_de_string()?;
        cur.skip(1)?;
        let ai_name = decode_utf8(cur.read_de_string()?);
        let censored_name = if save >= 66.3 {
            Some(decode_utf8(cur.read_de_string()?))
        } else {
            None
        };
        let name = decode_utf8(cur.read_de_string()?);
        let player_type = cur.read_u32()?;
        let profile_id = cur.read_u32()?;
        cur.skip(4)?;
        let number = cur.read_i32()?;
        if save < 25.22 {
            cur.skip(8)?;
        }
        let prefer_random = cur.read_i8()?;
        cur.skip(1)?;
        if save >= 25.06 {
            cur.skip(8)?;
        }
        if save >= 64.3 {
            cur.skip(4)?;
        }
        if save >= 67.2 {
            cur.read_de_string()?;
        }
        players.push(DePlayer {
            number,
            color_id,
            team_id,
            ai_name,
            censored_name: censored_name.unwrap_or_else(|| name.clone()),
            name,
            player_type,
            profile_id,
            civilization_id,
            custom_civ_selection,
            prefer_random: prefer_random == 1,
        });
    }

    cur.skip(12)?;
    if (37.0..66.3).contains(&save) {
        // Lobbies with fewer than 8 players store the unused slots in a
        // shorter layout.
        for _ in 0..8usize.saturating_sub(num_players as usize) {
            if save >= 61.5 {
                cur.skip(4)?;
            }
            cur.skip(12)?;
            cur.read_de_string()?;
            cur.skip(1)?;
            cur.read_de_string()?;
            cur.read_de_string()?;
            cur.skip(38)?;
            if save >= 64.3 {
                cur.skip(4)?;
            }
        }
    }
    cur.skip(4)?;
    let rated = cur.read_i8()?;
    let allow_specs = cur.read_i8()?;
    let visibility_id = cur.read_u32()?;
    let hidden_civs = cur.read_i8()?;
    cur.skip(1)?;
    let spec_delay = cur.read_u32()?;
    cur.skip(1)?;

    let mut strings = string_block(cur)?;
    cur.skip(8)?;
    for _ in 0..20 {
        strings.extend(string_block(cur)?);
    }
    log::debug!("[de] {} table strings pos={}", strings.len(), cur.tell());

    if save >= 25.22 {
        let count = cur.read_u32()?;
        cur.skip(count as usize * 4)?;
    } else {
        cur.skip(4)?;
        cur.skip(236)?;
    }
    let unknown_entries = cur.read_u64()?;
    for _ in 0..unknown_entries {
        cur.skip(4)?;
        cur.read_de_string()?;
        cur.skip(4)?;
    }
    if save >= 25.02 {
        cur.skip(8)?;
    }

    let guid_bytes: [u8; 16] = cur.take(16)?.try_into().expect("16-byte read");
    let guid = Uuid::from_bytes(guid_bytes).to_string();
    let hash = hex::encode(Sha1::digest(guid_bytes));
    log::debug!("[de] guid={} pos={}", guid, cur.tell());
    let lobby = decode_utf8(cur.read_de_string()?);
    if save >= 25.22 {
        cur.skip(8)?;
    }
    let mod_name = decode_utf8(cur.read_de_string()?);
    cur.skip(33)?;
    if save >= 20.06 {
        cur.skip(1)?;
    }
    if save >= 20.16 {
        cur.skip(8)?;
    }
    if save >= 25.06 {
        cur.skip(21)?;
    }
    if save >= 25.22 {
        cur.skip(4)?;
    }
    if save >= 26.16 {
        cur.skip(8)?;
    }
    if save >= 37.0 {
        cur.skip(3)?;
    }
    if save > 50.0 {
        cur.skip(8)?;
    }
    if save >= 61.5 {
        cur.skip(1)?;
    }
    if save >= 63.0 {
        cur.skip(5)?;
    }
    if save >= 66.3 {
        let count = cur.read_u32()?;
        cur.skip(12)?;
        cur.skip(count as usize * 4)?;
    }
    cur.read_de_string()?;
    if save >= 67.2 {
        cur.read_de_string()?;
        cur.read_de_string()?;
    }
    cur.skip(8)?;
    if save >= 37.0 {
        timestamp = Some(cur.read_u32()?);
        let _ = cur.read_u32()?;
    }
    log::debug!("[de] done pos={}", cur.tell());

    let (rms_mod_id, rms_filename) = subscribed_rms(&strings);
    Ok(Some(DeHeader {
        players,
        guid,
        hash,
        lobby,
        mod_name,
        difficulty_id,
        victory_type_id,
        starting_resources_id,
        starting_age_id: shift_age(starting_age_id),
        ending_age_id: shift_age(ending_age_id),
        map_dimension,
        speed,
        population_limit,
        treaty_length,
        team_together: random_positions == 0,
        all_technologies: all_technologies != 0,
        lock_teams: lock_teams != 0,
        lock_speed: lock_speed != 0,
        multiplayer: multiplayer != 0,
        cheats: cheats != 0,
        record_game: record_game != 0,
        animals_enabled: animals_enabled != 0,
        predators_enabled: predators_enabled != 0,
        turbo_enabled: turbo_enabled != 0,
        shared_exploration: shared_exploration != 0,
        team_positions: team_positions != 0,
        build,
        timestamp,
        spec_delay,
        rated: rated == 1,
        allow_specs: allow_specs != 0,
        hidden_civs: hidden_civs != 0,
        visibility_id,
        rms_mod_id,
        rms_map_id,
        rms_filename,
        dlc_ids,
    }))
}
