//! CLI module for the Docflow ingestion worker
//!
//! Provides subcommands:
//! - `ingest`: add documents to a group and wait for the batch summary
//! - `reupload`: add a new version to an existing document
//! - `migrate`: apply the PostgreSQL schema

pub mod ingest;
pub mod migrate;
pub mod reupload;

use std::path::Path;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::domain::ingestion::{JobRecord, JobStatus, SourceFile};
use crate::infrastructure::{logging, metrics};

/// Docflow ingestion worker - document ingestion and versioning pipeline
#[derive(Parser)]
#[command(name = "docflow-ingest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add documents to a group
    Ingest(ingest::IngestArgs),

    /// Upload a new version of an existing document
    Reupload(reupload::ReuploadArgs),

    /// Apply pending database migrations
    Migrate,
}

/// Loads `.env` and configuration, then installs logging and metrics
fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);
    metrics::init_metrics(&config.metrics)?;

    Ok(config)
}

/// A source file reference for a path relative to the source root
fn source_file(path: &str, mime_type: Option<&str>) -> SourceFile {
    let filename = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);

    let file = SourceFile::new(filename, path);
    match mime_type {
        Some(mime_type) => file.with_mime_type(mime_type),
        None => file,
    }
}

/// Prints the final job record and fails unless the job completed
fn report(record: &JobRecord) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);

    if record.status() != JobStatus::Completed {
        anyhow::bail!(
            "Job {} {}: {}",
            record.id(),
            record.status(),
            record.error().unwrap_or("no detail")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_file_uses_basename() {
        let file = source_file("grp-1/2024/contrato.pdf", None);

        assert_eq!(file.filename, "contrato.pdf");
        assert_eq!(file.filepath, "grp-1/2024/contrato.pdf");
        assert_eq!(file.mime_type, None);
    }

    #[test]
    fn test_cli_parses_ingest() {
        let cli = Cli::try_parse_from([
            "docflow-ingest",
            "ingest",
            "--group",
            "grp-1",
            "a.pdf",
            "b.pdf",
        ])
        .unwrap();

        match cli.command {
            Command::Ingest(args) => {
                assert_eq!(args.group, "grp-1");
                assert_eq!(args.files, vec!["a.pdf", "b.pdf"]);
                assert_eq!(args.actor, "cli");
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn test_ingest_requires_files() {
        assert!(Cli::try_parse_from(["docflow-ingest", "ingest", "--group", "grp-1"]).is_err());
    }
}
