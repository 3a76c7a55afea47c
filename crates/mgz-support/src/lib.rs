//! Support library for the `mgz-*` crates.
//!
//! Recorded game headers are decoded from a fully in-memory buffer, so the
//! shared primitives here are built around a seekable slice cursor rather
//! than `std::io` streams: the format needs `tell`/`seek` for anchor-based
//! resynchronization, and bounded forward searches for the markers whose
//! offsets cannot be computed from length fields.

#![deny(future_incompatible)]
#![deny(nonstandard_style)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_code)]
#![warn(unused)]

pub mod cursor;
pub mod hexdump;
pub mod pattern;
pub mod strings;

pub use cursor::{ByteCursor, ReadError};
pub use hexdump::hexdump;
pub use pattern::{find_bytes, find_zero_run, BytePattern, Pat};
pub use strings::{decode_1252, decode_utf8, STRING_MAGIC};
