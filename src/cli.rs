//! Command-line interface
//!
//! Argument parsing using clap derive macros.

use crate::types::Strictness;
use clap::Parser;
use std::path::PathBuf;

/// Evaluate a recorded oral presentation against an assignment topic
#[derive(Parser, Debug)]
#[command(
    name = "expoeval",
    version,
    about = "Evaluate a recorded oral presentation against an assignment topic"
)]
pub struct Cli {
    /// Path to the video file to analyze
    #[arg(value_name = "VIDEO")]
    pub video: PathBuf,

    /// Assignment topic title, e.g. "Las derivadas"
    #[arg(long, short = 't', value_name = "TITLE")]
    pub title: String,

    /// Detailed topic description / instructions
    #[arg(long, short = 'd', value_name = "TEXT", default_value = "")]
    pub description: String,

    /// Maximum attainable grade
    #[arg(long, value_name = "SCORE", default_value = "20")]
    pub max_score: f64,

    /// Rubric strictness (lenient, normal, strict)
    #[arg(long, value_name = "LEVEL", value_parser = parse_strictness)]
    pub strictness: Option<Strictness>,

    /// Path to configuration file (TOML)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory where participant photos are written
    #[arg(long, value_name = "DIR")]
    pub photo_dir: Option<PathBuf>,

    /// Write the full result as JSON to this file ("-" for stdout)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_strictness(s: &str) -> Result<Strictness, String> {
    match s.to_ascii_lowercase().as_str() {
        "lenient" => Ok(Strictness::Lenient),
        "normal" => Ok(Strictness::Normal),
        "strict" => Ok(Strictness::Strict),
        other => Err(format!(
            "unknown strictness '{}' (expected lenient, normal or strict)",
            other
        )),
    }
}
