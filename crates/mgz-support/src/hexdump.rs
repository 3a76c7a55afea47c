//! Hex-dump rendering for diagnostics.

use std::fmt::Write;

/// Render `data` as `offset  hex  ascii` rows of 16 bytes.
///
/// `base_offset` is added to the printed offsets. When `mark` falls inside a
/// row, that row is prefixed with `>>`.
pub fn hexdump(data: &[u8], base_offset: usize, mark: Option<usize>) -> String {
    let mut out = String::new();
    for (row, chunk) in data.chunks(16).enumerate() {
        let offset = base_offset + row * 16;
        let marker = match mark {
            Some(m) if offset <= m && m < offset + 16 => ">>",
            _ => "  ",
        };
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if (32..127).contains(&b) {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        let _ = writeln!(
            out,
            "{} {:08x}  {:<47}  {}",
            marker,
            offset,
            hex.join(" "),
            ascii
        );
    }
    out
}
