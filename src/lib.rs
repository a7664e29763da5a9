pub mod config;
pub mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pipeline::processor::{build_processor, ProcessingError};
use pipeline::{intake, resources};

/// Extract a confidence-scored product profile from a financial-product PDF
#[derive(Parser, Debug)]
#[command(name = "finprod")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// PDF document to read (digital or scanned)
    pub file: PathBuf,

    /// Abandon the document after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Ask an OpenAI-compatible model for a missing name or type (OPENAI_* env vars)
    #[arg(long)]
    pub llm_fallback: bool,

    /// Print single-line JSON
    #[arg(long)]
    pub compact: bool,
}

pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    match execute(&cli) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(file = %cli.file.display(), error = %e, "Extraction failed");
            ExitCode::from(1)
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn execute(cli: &Cli) -> Result<String, CliError> {
    resources::initialize();

    let config = config::ExtractorConfig::from_env();
    tracing::debug!(config = ?config, "Extractor configuration");

    let doc = intake::read_document(&cli.file).map_err(ProcessingError::from)?;
    let processor = Arc::new(build_processor(&config, cli.llm_fallback)?);
    let timeout = cli.timeout_secs.map(Duration::from_secs);

    let product = processor.process_with_deadline(doc, timeout)?;

    let json = if cli.compact {
        serde_json::to_string(&product)?
    } else {
        serde_json::to_string_pretty(&product)?
    };
    Ok(json)
}
