use anyhow::Result;
use mgz_cli::{init_logging, load_recording};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use structopt::StructOpt;

/// Parse the header of an MGZ recording and render it as JSON.
#[derive(StructOpt)]
struct Cli {
    /// Path to the .mgz file or a .zip archive containing one.
    rec_path: PathBuf,
    /// Write the JSON to this file instead of stdout.
    #[structopt(short, long)]
    output: Option<PathBuf>,
    /// JSON indentation; 0 for compact output.
    #[structopt(long, default_value = "2")]
    indent: usize,
    /// Enable debug logging from the parser.
    #[structopt(long)]
    debug: bool,
}

fn render(header: &mgz_fast::Header, indent: usize) -> Result<String> {
    if indent == 0 {
        return Ok(serde_json::to_string(header)?);
    }
    let indent = vec![b' '; indent];
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    header.serialize(&mut serializer)?;
    Ok(String::from_utf8(out)?)
}

fn main() -> Result<()> {
    let cli = Cli::from_args();
    init_logging(cli.debug);

    let raw = load_recording(&cli.rec_path)?;
    let header = mgz_fast::parse(&raw)?;
    let json = render(&header, cli.indent)?;

    match cli.output {
        Some(path) => {
            fs::write(&path, json)?;
            eprintln!("Written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
