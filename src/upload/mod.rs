//! Upload module
//!
//! Chunked block blob upload: the file is split into fixed-size blocks,
//! each block is staged with Put Block (retried on transient failures), and
//! the ordered block list is committed once every block was accepted.
//!
//! # Example
//!
//! ```no_run
//! use blockblob_uploadr::config::UploadConfig;
//! use blockblob_uploadr::upload::BlockBlobUploader;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let uploader = BlockBlobUploader::new(UploadConfig::default())?;
//! let result = uploader
//!     .upload_file("https://acct.blob.core.windows.net/c/app.msi?sv=...&sig=...", "app.msi")
//!     .await?;
//! println!("{} blocks, {} bytes", result.block_count, result.bytes_written);
//! # Ok(())
//! # }
//! ```

use crate::blob::block_id::BlockIdError;
use crate::blob::BlobClientError;
use crate::config::{ConfigError, UploadConfig};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub mod chunker;
pub mod committer;
pub mod context;
pub mod engine;
pub mod observer;
pub mod progress;
pub mod retry;
pub mod session;
pub mod uploader;

pub use context::SessionContext;
pub use engine::BlockBlobUploader;
pub use observer::{TracingObserver, UploadObserver};
pub use progress::ProgressSnapshot;

/// Step of an upload session an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    Chunk,
    UploadBlock(u64),
    Commit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Open => f.write_str("open"),
            Stage::Chunk => f.write_str("chunk"),
            Stage::UploadBlock(index) => write!(f, "upload-block-{}", index),
            Stage::Commit => f.write_str("commit"),
        }
    }
}

/// Upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("open: {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload-block-{index}: read failed: {source}")]
    Read {
        index: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("chunk: {0}")]
    InvalidBlockId(#[from] BlockIdError),

    #[error("chunk: {total_blocks} blocks exceed the block id space")]
    TooManyBlocks { total_blocks: u64 },

    #[error("chunk: source file {} is empty", .path.display())]
    EmptySource { path: PathBuf },

    #[error("{stage}: cannot build request: {message}")]
    RequestConstruction { stage: Stage, message: String },

    #[error("upload-block-{index}: failed after {attempts} attempt(s): {last_error}")]
    BlockUploadFailed {
        index: u64,
        attempts: u32,
        #[source]
        last_error: BlobClientError,
    },

    #[error("commit: block list rejected (status {}): {body}", .status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
    CommitFailed { status: Option<u16>, body: String },

    #[error("{stage}: deadline exceeded")]
    DeadlineExceeded { stage: Stage },

    #[error("{stage}: cancelled")]
    Cancelled { stage: Stage },

    #[error("invalid session transition from {from} on {event}")]
    InvalidTransition {
        from: &'static str,
        event: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("client setup failed: {0}")]
    Client(BlobClientError),
}

impl UploadError {
    /// Stage the error occurred in, when it belongs to one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            UploadError::Open { .. } => Some(Stage::Open),
            UploadError::Read { index, .. } => Some(Stage::UploadBlock(*index)),
            UploadError::InvalidBlockId(_)
            | UploadError::TooManyBlocks { .. }
            | UploadError::EmptySource { .. } => Some(Stage::Chunk),
            UploadError::RequestConstruction { stage, .. }
            | UploadError::DeadlineExceeded { stage }
            | UploadError::Cancelled { stage } => Some(*stage),
            UploadError::BlockUploadFailed { index, .. } => Some(Stage::UploadBlock(*index)),
            UploadError::CommitFailed { .. } => Some(Stage::Commit),
            UploadError::InvalidTransition { .. }
            | UploadError::Config(_)
            | UploadError::Client(_) => None,
        }
    }

    /// Whether restarting the whole session from block 0 may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UploadError::BlockUploadFailed { .. }
                | UploadError::CommitFailed { .. }
                | UploadError::DeadlineExceeded { .. }
        )
    }

    /// Short label used for the error metric
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::Open { .. } | UploadError::Read { .. } => "io",
            UploadError::InvalidBlockId(_)
            | UploadError::TooManyBlocks { .. }
            | UploadError::EmptySource { .. } => "invalid_argument",
            UploadError::RequestConstruction { .. } => "request_construction",
            UploadError::BlockUploadFailed { .. } => "block_upload_failed",
            UploadError::CommitFailed { .. } => "commit_failed",
            UploadError::DeadlineExceeded { .. } => "deadline_exceeded",
            UploadError::Cancelled { .. } => "cancelled",
            UploadError::InvalidTransition { .. } => "invalid_transition",
            UploadError::Config(_) | UploadError::Client(_) => "setup",
        }
    }
}

/// Upload result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub block_count: u64,
    pub bytes_written: u64,
    pub elapsed: Duration,
}

/// Upload one file with the default configuration.
///
/// A session always starts from block 0; on error nothing is kept, and
/// staged but uncommitted blocks are left for the service to discard.
pub async fn upload_file(
    sas_uri: &str,
    path: impl AsRef<Path>,
) -> Result<UploadResult, UploadError> {
    BlockBlobUploader::new(UploadConfig::default())?
        .upload_file(sas_uri, path)
        .await
}
