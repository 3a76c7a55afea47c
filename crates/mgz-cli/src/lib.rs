//! Shared helpers for the mgz command-line tools.

use anyhow::{bail, Context, Result};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::io::Read;
use std::path::Path;

/// Load the raw bytes of a recording.
///
/// ZIP archives are unwrapped: the first entry ending in `.mgz` or
/// `.aoe2record` wins, with the first entry of the archive as a fallback.
pub fn load_recording(path: &Path) -> Result<Vec<u8>> {
    let raw =
        std::fs::read(path).with_context(|| format!("could not read {}", path.display()))?;
    if raw.starts_with(b"PK\x03\x04") {
        return unwrap_zip(&raw, path);
    }
    Ok(raw)
}

fn unwrap_zip(raw: &[u8], path: &Path) -> Result<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(raw))
        .with_context(|| format!("could not open {} as a ZIP archive", path.display()))?;
    let names: Vec<String> = archive.file_names().map(String::from).collect();
    let mut candidates: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| {
            let lower = name.to_lowercase();
            lower.ends_with(".mgz") || lower.ends_with(".aoe2record")
        })
        .collect();
    if candidates.is_empty() {
        candidates.extend(names.first().map(String::as_str));
    }
    let name = match candidates.first() {
        Some(name) => (*name).to_string(),
        None => bail!("ZIP archive is empty"),
    };
    if candidates.len() > 1 {
        eprintln!("Warning: multiple candidates in ZIP, using '{}'", name);
    }
    let mut entry = archive.by_name(&name)?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Install the terminal logger. `--debug` turns on the parser traces.
pub fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

/// Parse a byte offset or length, decimal or `0x`-prefixed hex.
pub fn parse_offset(arg: &str) -> std::result::Result<usize, std::num::ParseIntError> {
    match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => arg.parse(),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_offset;

    #[test]
    fn offsets_accept_decimal_and_hex() {
        assert_eq!(parse_offset("600").unwrap(), 600);
        assert_eq!(parse_offset("0x2e0").unwrap(), 0x2e0);
        assert_eq!(parse_offset("0X10").unwrap(), 16);
        assert!(parse_offset("0xzz").is_err());
        assert!(parse_offset("-1").is_err());
    }
}
