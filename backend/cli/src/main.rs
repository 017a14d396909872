mod history_cmd;
mod process_cmd;
mod status_cmd;
mod terminal_output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;
use uuid::Uuid;

use audittrack_config::validate;
use audittrack_logging::{init_logger, LogSettings};

#[derive(Parser)]
#[command(name = "audittrack")]
#[command(about = "AuditTrack VI - document intake and compliance audit pipeline")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.audittrack/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full audit pipeline on one PDF and store the report
    Process {
        file: PathBuf,
        /// Document name shown in the report (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Also write the field table to this PDF
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Process several PDFs with bounded concurrency
    Batch {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Override batch.maxConcurrent
        #[arg(long)]
        max_concurrent: Option<usize>,
    },
    /// Extract text and run the field presence checks only (no network)
    Check { file: PathBuf },
    /// List stored reports, most recent first
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Print a stored report as JSON
    Show { id: Uuid },
    /// Export a stored report to PDF
    Export {
        id: Uuid,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show effective (redacted) config and OCR tool availability
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = audittrack_config::load_and_prepare(cli.config.as_deref()).await?;

    init_logger(&LogSettings {
        level: config.logging.level.clone(),
        dir: config.logging.dir.as_ref().map(PathBuf::from),
        json_console: config.logging.json,
    });
    // Loading ran before the subscriber existed.
    for warning in validate(&config).warnings {
        warn!(path = %warning.path, message = %warning.message, "Config warning");
    }

    match cli.command {
        Commands::Process { file, name, export } => {
            process_cmd::process(&config, &file, name, export.as_deref()).await?
        }
        Commands::Batch {
            files,
            max_concurrent,
        } => process_cmd::batch(&config, files, max_concurrent).await?,
        Commands::Check { file } => process_cmd::check(&config, &file).await?,
        Commands::History { limit } => history_cmd::history(&config, limit).await?,
        Commands::Show { id } => history_cmd::show(&config, id).await?,
        Commands::Export { id, out } => history_cmd::export(&config, id, out).await?,
        Commands::Status => status_cmd::run(&config).await?,
    }

    Ok(())
}
