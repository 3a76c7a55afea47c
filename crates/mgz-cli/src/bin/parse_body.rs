use anyhow::Result;
use mgz_cli::{init_logging, load_recording};
use mgz_fast::body::BodyOperations;
use mgz_fast::decompress;
use mgz_support::ByteCursor;
use std::path::PathBuf;
use structopt::StructOpt;

/// Parse the body of an MGZ recording, one JSON object per operation
/// (JSON Lines).
#[derive(StructOpt)]
struct Cli {
    /// Path to the .mgz file or a .zip archive containing one.
    rec_path: PathBuf,
    /// Enable debug logging from the parser.
    #[structopt(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::from_args();
    init_logging(cli.debug);

    let raw = load_recording(&cli.rec_path)?;

    // The body starts after the compressed header; the edition (needed for
    // DE's length-typed operations) comes from the header's version
    // fields.
    let prefix = decompress::read_prefix(&raw)?;
    let inflated = decompress::inflate(&raw, prefix.data_start(), prefix.header_length)?;
    let mut header = ByteCursor::new(&inflated);
    let mut body_cur = ByteCursor::new(&raw);
    body_cur.seek_to(prefix.header_length)?;
    let log_version = body_cur.read_u32()?;
    let info = mgz_fast::version::parse_version(&mut header, log_version)?;

    let body = &raw[prefix.header_length..];
    for operation in BodyOperations::new(body, info.version)? {
        println!("{}", serde_json::to_string(&operation?)?);
    }
    Ok(())
}
