use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use obstetric_core::{NoteConfig, NoteContext};
use obstetric_note::{analyze_encounter, map_fields, snapshot_from_form_str};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "obstetric-cli",
    about = "Generate the admission note from an obstetric form JSON export."
)]
struct Args {
    /// Path to the form JSON.
    #[arg(short, long)]
    input: PathBuf,

    /// Optional JSON file with `NoteConfig` overrides.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Instant to compute at (RFC 3339); defaults to the current clock.
    #[arg(long, value_parser = parse_instant)]
    now: Option<DateTime<Utc>>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Note text.
    Text,
    /// Full report as JSON.
    Json,
    /// PDF field values as JSON.
    Fields,
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| format!("expected an RFC 3339 timestamp: {err}"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("cannot read form file {:?}", args.input))?;

    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read config file {path:?}"))?;
            serde_json::from_str::<NoteConfig>(&raw)
                .with_context(|| format!("invalid config file {path:?}"))?
        }
        None => NoteConfig::default(),
    };

    let ctx = match args.now {
        Some(now) => NoteContext::new(now, &config)?,
        None => NoteContext::current(&config)?,
    };
    tracing::info!(now = %ctx.now, "generating note");

    let snapshot = snapshot_from_form_str(&data, &config)?;
    let report = analyze_encounter(&snapshot, &ctx, &config);

    match args.format {
        OutputFormat::Text => println!("{}", report.note),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Fields => {
            let mapping = map_fields(&snapshot, &report.dating, report.robson, &ctx);
            println!("{}", serde_json::to_string_pretty(&mapping)?);
        }
    }

    Ok(())
}
