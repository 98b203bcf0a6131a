use anyhow::{Context, Result};
use clap::Parser;
use expoeval::cli::Cli;
use expoeval::config::AnalysisConfig;
use expoeval::pipeline::{Analyzer, LogSink, NullSink, ProgressSink};
use expoeval::types::Assignment;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.quiet { "warn" } else { "info" }),
    )
    .init();

    let config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::load_or_default(Path::new("expoeval.toml"))?,
    }
    .with_env_overrides();
    config.validate()?;

    let assignment = Assignment {
        title: cli.title.clone(),
        description: cli.description.clone(),
        max_score: cli.max_score,
        strictness: cli.strictness,
    };

    let mut analyzer = Analyzer::new(config)?;
    if let Some(dir) = cli.photo_dir.clone() {
        analyzer = analyzer.with_photo_dir(dir);
    }

    let quiet_sink = NullSink;
    let log_sink = LogSink;
    let sink: &dyn ProgressSink = if cli.quiet { &quiet_sink } else { &log_sink };

    let result = analyzer.analyze(&cli.video, &assignment, sink)?;

    if let Some(path) = &cli.output {
        let json = serde_json::to_string_pretty(&result)?;
        if path.as_os_str() == "-" {
            println!("{}", json);
        } else {
            std::fs::write(path, json)
                .with_context(|| format!("writing result to {}", path.display()))?;
        }
    } else {
        println!("{}", result.aggregate_feedback);
    }

    Ok(())
}
