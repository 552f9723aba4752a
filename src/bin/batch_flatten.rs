//! batch-flatten: Flatten a batch job listing into JSON Lines
//!
//! Usage:
//!   batch-flatten --input batches.json --output batches.jsonl
//!
//! Diagnostics go to stderr; set RUST_LOG=debug to also see records skipped
//! for missing fields.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Result;
use batch_flatten::Config;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "batch-flatten", version)]
#[command(about = "Flatten a JSON array of batch jobs into JSON Lines with timing metrics", long_about = None)]
struct Args {
    /// Input JSON file (a top-level array of batch records)
    #[arg(long, short = 'i', value_name = "FILE")]
    input: PathBuf,

    /// Output file for newline-delimited JSON (created or truncated)
    #[arg(long, short = 'o', value_name = "FILE")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::new(args.input, args.output);

    batch_flatten::run(&config)?;
    Ok(())
}
