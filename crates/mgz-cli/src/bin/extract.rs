use anyhow::Result;
use mgz_cli::load_recording;
use mgz_fast::decompress;
use std::fs;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

/// Extract the header and body of an MGZ recording.
///
/// The header is written decompressed, prefixed by the original 4-byte
/// length field and the chapter address when present.
#[derive(StructOpt)]
struct Cli {
    /// Path to the .mgz file or a .zip archive containing one.
    rec_path: PathBuf,
    /// Output path for the header (default: <stem>.header.bin).
    #[structopt(long)]
    header: Option<PathBuf>,
    /// Output path for the body (default: <stem>.body.bin).
    #[structopt(long)]
    body: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::from_args();
    let raw = load_recording(&cli.rec_path)?;

    let prefix = decompress::read_prefix(&raw)?;
    let inflated = decompress::inflate(&raw, prefix.data_start(), prefix.header_length)?;

    let stem = cli
        .rec_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rec".to_string());
    let dir = cli
        .rec_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let header_path = cli
        .header
        .unwrap_or_else(|| dir.join(format!("{}.header.bin", stem)));
    let body_path = cli
        .body
        .unwrap_or_else(|| dir.join(format!("{}.body.bin", stem)));

    let mut header_out = raw[..4].to_vec();
    if prefix.chapter_address.is_some() {
        header_out.extend_from_slice(&raw[4..8]);
    }
    header_out.extend_from_slice(&inflated);
    fs::write(&header_path, &header_out)?;

    let body = &raw[prefix.header_length.min(raw.len())..];
    fs::write(&body_path, body)?;

    println!(
        "Header ({} bytes) -> {}",
        header_out.len(),
        header_path.display()
    );
    println!("Body   ({} bytes)  -> {}", body.len(), body_path.display());
    Ok(())
}
