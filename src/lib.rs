//! Libraries for reading Age of Empires II recorded game (`.mgz`) files.
//!
//! ## Header parsing
//!
//! > Supported version range: UserPatch 1.5, HD Edition, Definitive Edition
//!
//! mgz-fast decompresses and decodes the recorded game header: players,
//! map, lobby, scenario and edition-specific metadata. The decoder is a
//! single forward pass; sections without computable offsets are located by
//! byte-pattern anchors.
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! let raw = std::fs::read("rec.20181208-195117.mgz")?;
//! let header = mgz::parse(&raw)?;
//! println!("map dimension {}", header.map.dimension);
//! for player in &header.players {
//!     println!("{} owns {} objects", player.name, player.objects.len());
//! }
//! # Ok(()) }
//! ```
//!
//! ## Body reading
//!
//! The body (operation stream) reader walks command, sync, view and chat
//! operations without decoding per-command payloads; see
//! [`mgz_fast::body`].
//!
//! ## Support crate
//!
//! mgz-support carries the shared decoding primitives: a seekable byte
//! cursor, the DE/HD/AoC string formats, and bounded byte-pattern search.

#![deny(future_incompatible)]
#![deny(nonstandard_style)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_code)]
#![warn(unused)]

pub extern crate mgz_fast;
pub extern crate mgz_support;

pub use mgz_fast as fast;
pub use mgz_support as support;

pub use mgz_fast::header::parse;
pub use mgz_fast::{Header, Version};
