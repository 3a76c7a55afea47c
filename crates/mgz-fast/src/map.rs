//! Map block: dimensions, zone data, per-tile terrain and elevation,
//! visibility passes.

use crate::version::Version;
use crate::Result;
use mgz_support::ByteCursor;
use serde::Serialize;

/// Terrain and elevation of one map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tile {
    pub terrain: u8,
    pub elevation: u8,
}

/// Map data of a recording.
#[derive(Debug, Clone, Serialize)]
pub struct Map {
    /// Side length; maps are square.
    pub dimension: u32,
    pub all_visible: bool,
    pub restore_time: u32,
    /// `dimension * dimension` tiles, row by row.
    pub tiles: Vec<Tile>,
}

/// Per-tile record layout, selected by edition and save version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileFormat {
    /// 4 bytes: pad, terrain, elevation, pad.
    Legacy,
    /// 9 bytes: terrain, pad, elevation, 6 pad.
    De,
    /// 10 bytes: terrain, 2 pad, elevation, 6 pad.
    DeWide,
}

impl TileFormat {
    fn read(self, cur: &mut ByteCursor<'_>) -> Result<Tile> {
        let tile = match self {
            TileFormat::Legacy => {
                cur.skip(1)?;
                let terrain = cur.read_u8()?;
                let elevation = cur.read_u8()?;
                cur.skip(1)?;
                Tile { terrain, elevation }
            }
            TileFormat::De => {
                let terrain = cur.read_u8()?;
                cur.skip(1)?;
                let elevation = cur.read_u8()?;
                cur.skip(6)?;
                Tile { terrain, elevation }
            }
            TileFormat::DeWide => {
                let terrain = cur.read_u8()?;
                cur.skip(2)?;
                let elevation = cur.read_u8()?;
                cur.skip(6)?;
                Tile { terrain, elevation }
            }
        };
        Ok(tile)
    }
}

/// Parse the map block.
pub fn parse_map(cur: &mut ByteCursor<'_>, version: Version, save: f32) -> Result<Map> {
    log::debug!("[map] start pos={} save={}", cur.tell(), save);
    let tile_format = if version == Version::De {
        cur.skip(8)?;
        if save >= 62.0 {
            TileFormat::DeWide
        } else {
            TileFormat::De
        }
    } else {
        TileFormat::Legacy
    };

    let size_x = cur.read_u32()?;
    let size_y = cur.read_u32()?;
    let zone_num = cur.read_u32()?;
    let tile_num = size_x as usize * size_y as usize;
    log::debug!(
        "[map] size={}x{} zones={} pos={}",
        size_x,
        size_y,
        zone_num,
        cur.tell()
    );
    for _ in 0..zone_num {
        if version == Version::De || version == Version::Hd {
            cur.skip(2048 + tile_num * 2)?;
        } else {
            cur.skip(1275 + tile_num)?;
        }
        let num_floats = cur.read_u32()?;
        cur.skip(num_floats as usize * 4)?;
        cur.skip(4)?;
    }

    let all_visible = cur.read_i8()?;
    cur.skip(1)?;
    let mut tiles = Vec::with_capacity(tile_num);
    for _ in 0..tile_num {
        tiles.push(tile_format.read(cur)?);
    }
    log::debug!("[map] after tiles pos={}", cur.tell());

    let num_data = cur.read_u32()?;
    cur.skip(4)?;
    cur.skip(num_data as usize * 4)?;
    for _ in 0..num_data {
        let num_obs = cur.read_u32()?;
        cur.skip(num_obs as usize * 8)?;
    }
    let x2 = cur.read_u32()?;
    let y2 = cur.read_u32()?;
    cur.skip(x2 as usize * y2 as usize * 4)?;
    if save >= 61.5 {
        cur.skip(x2 as usize * y2 as usize * 4)?;
    }
    let restore_time = cur.read_u32()?;
    log::debug!("[map] restore_time={} pos={}", restore_time, cur.tell());

    Ok(Map {
        dimension: size_x,
        all_visible: all_visible == 1,
        restore_time,
        tiles,
    })
}
