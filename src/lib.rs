//! Blockblob Uploadr Library
//!
//! Chunked, retrying uploads of large files into block blobs through a
//! SAS-authorized URI, using Put Block and Put Block List.
//!
//! # Features
//!
//! - **Fixed-size blocks**: 8 MiB by default, only the last block is shorter
//! - **Ordered block IDs**: base64 of a zero-padded six-digit index
//! - **Bounded retries**: per-attempt timeout, randomized backoff, attempt cap
//! - **Commit after all blocks**: the block list is sent once, never retried
//! - **Cancellation**: outer deadline and cancellation token abort in-flight calls
//!
//! # Example
//!
//! ```no_run
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sas_uri = "https://acct.blob.core.windows.net/content/app.msi?sv=...&sig=...";
//!     let result = blockblob_uploadr::upload::upload_file(sas_uri, "app.msi").await?;
//!     println!("committed {} blocks", result.block_count);
//!     Ok(())
//! }
//! ```

pub mod blob;
pub mod config;
pub mod metrics;
pub mod upload;

// Re-export commonly used types
pub use config::{Config, UploadConfig};
pub use upload::{BlockBlobUploader, SessionContext, UploadError, UploadResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
