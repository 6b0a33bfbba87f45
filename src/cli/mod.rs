//! CLI Module
//!
//! Command-line front-end for the export pipeline. Plays the role the
//! recording editor plays in the full application: decodes the inputs,
//! fills in an export request, and consumes the progress stream.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Casa Podcast - sermon episode exporter
#[derive(Parser, Debug)]
#[command(name = "casa-podcast")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a recording to a podcast-ready archive
    Export(ExportArgs),

    /// Check episode fields against the platform limits without exporting
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Input recording (WAV)
    pub input: PathBuf,

    /// Cover image (any common bitmap format)
    #[arg(short, long)]
    pub cover: PathBuf,

    /// Output archive path
    #[arg(short, long, default_value = "episodio.zip")]
    pub output: PathBuf,

    #[command(flatten)]
    pub episode: EpisodeArgs,

    /// Trim start in seconds
    #[arg(long, default_value_t = 0.0)]
    pub start: f64,

    /// Trim end in seconds (defaults to the end of the recording)
    #[arg(long)]
    pub end: Option<f64>,

    /// Gain in dB
    #[arg(long, default_value_t = 0.0)]
    pub gain_db: f32,

    /// Normalize the peak to just under full scale
    #[arg(long)]
    pub normalize: bool,

    /// Fade-in duration in seconds
    #[arg(long, default_value_t = 0.0)]
    pub fade_in: f32,

    /// Fade-out duration in seconds
    #[arg(long, default_value_t = 0.0)]
    pub fade_out: f32,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Input recording (WAV); duration is read from the header
    pub input: Option<PathBuf>,

    /// Cover image file; only its size on disk is checked here
    #[arg(short, long)]
    pub cover: Option<PathBuf>,

    #[command(flatten)]
    pub episode: EpisodeArgs,
}

/// Episode metadata fields shared by both subcommands
///
/// Either pass `--metadata episodio.json` or the individual flags;
/// the JSON file wins when both are present.
#[derive(Args, Debug)]
pub struct EpisodeArgs {
    /// Metadata JSON file (title, speaker, date, series, description)
    #[arg(long)]
    pub metadata: Option<PathBuf>,

    /// Episode title
    #[arg(long, default_value = "")]
    pub title: String,

    /// Speaker name
    #[arg(long, default_value = "")]
    pub speaker: String,

    /// Sermon date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub date: Option<chrono::NaiveDate>,

    /// Series name
    #[arg(long)]
    pub series: Option<String>,

    /// Episode description
    #[arg(long)]
    pub description: Option<String>,
}
