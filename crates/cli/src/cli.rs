//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use mp3cator_core::converter::{Bitrate, InvalidBitrate};

/// Recursively finds and converts OGG files to MP3, preserving tags.
#[derive(Parser, Debug)]
#[command(name = "mp3cator", version)]
pub struct Args {
    /// Root folder to scan for source files
    pub folder_path: PathBuf,

    /// Constant bit rate of the output files, e.g. 192k, 256k, 320k [default: 320k]
    #[arg(long, value_parser = parse_bitrate)]
    pub bitrate: Option<Bitrate>,

    /// Number of parallel conversions [default: available CPU cores]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub threads: Option<u32>,

    /// After converting, check for source files that still have no output
    #[arg(long)]
    pub post_check: bool,

    /// After a clean post-check, delete the original source files
    #[arg(long, requires = "post_check")]
    pub delete: bool,

    /// Write outputs under an RS folder with camelCase paths
    #[arg(long)]
    pub restructure: bool,

    /// Write outputs under this folder, keeping the source folder layout.
    /// Overrides --restructure
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Show what would be converted without converting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Log per-file details, including the raw tags read from each file
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file
    #[arg(long, env = "MP3CATOR_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

fn parse_bitrate(value: &str) -> Result<Bitrate, InvalidBitrate> {
    value.parse()
}
