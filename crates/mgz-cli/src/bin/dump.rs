use anyhow::{bail, Result};
use mgz_cli::{load_recording, parse_offset};
use mgz_fast::decompress;
use mgz_support::hexdump;
use std::path::PathBuf;
use std::str::FromStr;
use structopt::StructOpt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Body,
}

impl FromStr for Section {
    type Err = String;

    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        match arg {
            "header" => Ok(Section::Header),
            "body" => Ok(Section::Body),
            other => Err(format!("unknown section {:?}, use header or body", other)),
        }
    }
}

/// Hex-dump byte ranges from a recording's header (decompressed) or body.
#[derive(StructOpt)]
struct Cli {
    /// Path to the .mgz file or a .zip archive containing one.
    rec_path: PathBuf,
    /// Which section to dump: header or body.
    section: Section,
    /// Start offset in bytes (decimal or 0x hex).
    #[structopt(short = "s", long, default_value = "0", parse(try_from_str = parse_offset))]
    offset: usize,
    /// Number of bytes to dump (decimal or 0x hex).
    #[structopt(short = "n", long, default_value = "256", parse(try_from_str = parse_offset))]
    length: usize,
}

fn main() -> Result<()> {
    let cli = Cli::from_args();
    let raw = load_recording(&cli.rec_path)?;
    let prefix = decompress::read_prefix(&raw)?;

    let (data, label) = match cli.section {
        Section::Header => (
            decompress::inflate(&raw, prefix.data_start(), prefix.header_length)?,
            "header (decompressed)",
        ),
        Section::Body => (
            raw[prefix.header_length.min(raw.len())..].to_vec(),
            "body",
        ),
    };

    let total = data.len();
    let offset = cli.offset;
    let mut length = cli.length;
    if offset >= total {
        bail!(
            "offset {} (0x{:x}) >= section size {} (0x{:x})",
            offset,
            offset,
            total,
            total
        );
    }
    if offset + length > total {
        length = total - offset;
        eprintln!("Note: clamped to {} bytes (section ends at 0x{:x})", length, total);
    }

    println!(
        "[{}] offset=0x{:x} ({}) length=0x{:x} ({}) total=0x{:x} ({})",
        label, offset, offset, length, length, total, total
    );
    print!("{}", hexdump(&data[offset..offset + length], offset, None));
    Ok(())
}
