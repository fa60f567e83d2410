//! Blockblob Uploadr - chunked block blob uploader
//!
//! Uploads one local file to a SAS-authorized blob URI.

use anyhow::Context;
use blockblob_uploadr::{config::Config, metrics, BlockBlobUploader, SessionContext};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Blockblob Uploadr - Put Block / Put Block List uploader
#[derive(Parser, Debug)]
#[command(name = "blockblob-uploadr")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Blob URI including the SAS token
    #[arg(long, env = "BLOCKBLOB_SAS_URI", hide_env_values = true)]
    sas_uri: String,

    /// Local file to upload
    #[arg(short, long)]
    file: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured block size in bytes
    #[arg(long)]
    block_size: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,

    /// Print Prometheus metrics to stdout when done
    #[arg(long)]
    print_metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {:?}", path))?,
        None => Config::default(),
    };
    if let Some(block_size) = args.block_size {
        config.upload.block_size = block_size;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    config.logging.json |= args.json;
    config.validate()?;

    init_logging(&config.logging.level, config.logging.json)?;

    info!("Starting Blockblob Uploadr v{}", blockblob_uploadr::VERSION);

    let uploader = BlockBlobUploader::new(config.upload.clone())?;

    let cancel = CancellationToken::new();
    let mut ctx = SessionContext::new().with_cancellation(cancel.clone());
    if let Some(budget) = config.upload.deadline() {
        ctx = ctx.with_deadline(budget);
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling upload");
            cancel.cancel();
        }
    });

    let outcome = uploader
        .upload_file_with_context(&args.sas_uri, &args.file, &ctx)
        .await;

    if args.print_metrics {
        print!("{}", metrics::gather_text()?);
    }

    let result = outcome.with_context(|| format!("uploading {}", args.file.display()))?;
    info!(
        blocks = result.block_count,
        bytes = result.bytes_written,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "Upload complete"
    );

    Ok(())
}

fn init_logging(level: &str, json: bool) -> anyhow::Result<()> {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
    .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}
