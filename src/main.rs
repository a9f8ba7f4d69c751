//! Epubinfo
//!
//! Prints the metadata of one EPUB file and how long reading it took.

use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epubinfo::config::{Config, OutputFormat};
use epubinfo::{Document, MetadataRecord};

#[derive(Serialize)]
struct Report<'a> {
    path: String,
    #[serde(flatten)]
    metadata: &'a MetadataRecord,
    elapsed_ms: f64,
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only the record
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "epubinfo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env().with_args(std::env::args().skip(1));

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> anyhow::Result<()> {
    let path = config
        .path
        .as_ref()
        .context("Usage: epubinfo <epub_filename> (or set EPUBINFO_PATH)")?;

    let started = Instant::now();

    let mut doc = Document::open(path)?;
    let record = doc
        .metadata()
        .record()
        .with_context(|| format!("Failed to read metadata from {}", path.display()))?;

    if let Some(cover) = &config.cover_output {
        match doc.save_cover(cover) {
            Ok(()) => tracing::info!("Cover saved to {}", cover.display()),
            Err(e) => tracing::warn!("{}", e),
        }
    }

    doc.release()?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    let report = Report {
        path: path.display().to_string(),
        metadata: &record,
        elapsed_ms,
    };

    match config.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Pretty => print_pretty(&report),
    }
    Ok(())
}

fn print_pretty(report: &Report<'_>) {
    let meta = report.metadata;
    let scalar = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!("path: {}", report.path);
    println!("title: {}", scalar(&meta.title));
    println!("subtitle: {}", scalar(&meta.subtitle));
    println!("language: {}", scalar(&meta.language));
    println!("description: {}", scalar(&meta.description));
    println!("publisher: {}", scalar(&meta.publisher));
    println!("authors: {}", meta.authors.join(", "));
    println!("creators: {}", meta.creators.join(", "));
    println!("identifiers: {}", meta.identifiers.join(", "));
    println!("\nTotal time: {:.02}ms", report.elapsed_ms);
}
