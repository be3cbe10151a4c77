// src/main.rs
mod decode;
mod extractors;
mod mailer;
mod pipeline;
mod services;
mod storage;
mod utils;

use clap::{Parser, Subcommand};
use extractors::section::{EMAIL_PATTERN, PHONE_PATTERN};
use extractors::{LabelCatalog, SectionExtractor};
use pipeline::{Collaborators, Pipeline};
use std::path::PathBuf;
use storage::StorageManager;
use utils::config::PipelineConfig;
use utils::AppError;

/// Command Line Interface for the CV ingestion pipeline
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the local archive of processed uploads
    #[arg(short, long, default_value = "./output", global = true)]
    output_dir: PathBuf,

    /// Extra section label, matched after the built-in ones (repeatable)
    #[arg(long = "extra-label", global = true)]
    extra_labels: Vec<String>,

    /// Override the email regex searched over the whole text
    #[arg(long, global = true)]
    email_pattern: Option<String>,

    /// Override the phone regex searched over the whole text
    #[arg(long, global = true)]
    phone_pattern: Option<String>,

    /// Read collaborator settings from this file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a CV through the whole pipeline: archive, Drive, notify endpoint, sheet, follow-up email
    Process {
        /// PDF or DOCX résumé
        file: PathBuf,

        /// Exit right after scheduling instead of waiting for the follow-up email to go out
        #[arg(long)]
        no_wait: bool,
    },
    /// Decode and extract a CV, printing the record as JSON
    Extract {
        /// PDF or DOCX résumé
        file: PathBuf,
    },
    /// Re-extract the most recently processed upload from the local archive
    Reextract,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments
    let args = Args::parse();

    // 2. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging(&args.log_level);
    tracing::info!("Starting with args: {:?}", args);

    // 3. Initialize extractor and local archive
    let catalog = LabelCatalog::default().with_extra(&args.extra_labels);
    let extractor = match (&args.email_pattern, &args.phone_pattern) {
        (None, None) => SectionExtractor::with_catalog(catalog),
        (email, phone) => SectionExtractor::with_patterns(
            catalog,
            email.as_deref().unwrap_or(EMAIL_PATTERN),
            phone.as_deref().unwrap_or(PHONE_PATTERN),
        )?,
    };
    tracing::debug!("Section labels: {:?}", extractor.catalog().labels().collect::<Vec<_>>());
    let storage = StorageManager::new(&args.output_dir)?;
    let pipeline = Pipeline::new(extractor, storage);

    // 4. Dispatch
    match args.command {
        Command::Extract { file } => {
            let outcome = pipeline.extract_file(&file).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Reextract => {
            let outcome = pipeline.reextract_last().await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Process { file, no_wait } => {
            let config = match &args.env_file {
                Some(path) => PipelineConfig::from_env_file(path)?,
                None => PipelineConfig::from_env()?,
            };
            let remote = Collaborators::from_config(config)?;
            let output = pipeline.process(&file, &remote).await?;
            println!("{}", serde_json::to_string_pretty(&output.report)?);

            if let Some(job) = output.follow_up {
                if no_wait {
                    tracing::warn!("Not waiting for follow-up email due at {}; it will not be sent", job.send_at());
                } else {
                    tracing::info!("Waiting for follow-up email due at {}", job.send_at());
                    job.wait().await;
                }
            }
        }
    }

    tracing::info!("Processing finished.");
    Ok(())
}
