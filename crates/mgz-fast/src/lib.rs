//! Fast parsing for Age of Empires II recorded game (`.mgz`) headers.
//!
//! The header of a recording is a DEFLATE-compressed binary blob whose
//! layout varies by game edition (UserPatch, HD Edition, Definitive
//! Edition) and by the fractional save version, with dozens of thresholds
//! gating field presence. This crate decompresses the header and decodes
//! the player, map, lobby, scenario and edition-specific sections into one
//! [`Header`] aggregate.
//!
//! Two sections cannot be decoded sequentially and are located by byte
//! fingerprints instead: the per-player object lists (a bounded heuristic
//! scan, see [`players`]) and the scenario settings trailer (an IEEE-754
//! anchor, see [`scenario`]).
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! let raw = std::fs::read("rec.20181208-195117.mgz")?;
//! let header = mgz_fast::parse(&raw)?;
//! println!("{:?} with {} players", header.version, header.players.len());
//! # Ok(()) }
//! ```
//!
//! ## Credits
//!
//! The `.mgz` format knowledge comes from Bari's classic mgx format
//! description, the recage Node.js library, and Happyleaves' aoc-mgz
//! Python library.

#![deny(future_incompatible)]
#![deny(nonstandard_style)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_code)]
#![warn(unused)]

pub mod body;
pub mod de;
pub mod decompress;
pub mod hd;
pub mod header;
pub mod lobby;
pub mod map;
pub mod metadata;
pub mod players;
pub mod scenario;
pub mod version;

pub use header::{parse, Header};
pub use version::Version;

use mgz_support::ReadError;
use std::io;

/// Errors that may occur while parsing a recorded game header.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("could not decompress header: {0}")]
    DecompressionFailed(#[source] io::Error),
    #[error("unsupported version: {game:?} save {save} (log {log})")]
    UnsupportedVersion { game: String, save: f32, log: u32 },
    #[error("could not find {anchor} marker after offset {offset}")]
    AnchorNotFound {
        anchor: &'static str,
        offset: usize,
    },
    #[error("unknown body operation {op:#x} at offset {offset}")]
    UnknownOperation { op: i32, offset: usize },
    #[error("failed parsing {stage} at position {position}: {source}")]
    Stage {
        stage: &'static str,
        position: usize,
        source: Box<Error>,
    },
}

/// Result type alias with `mgz_fast::Error` as the error type.
pub type Result<T> = std::result::Result<T, Error>;
