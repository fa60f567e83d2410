//! Blob storage client module
//!
//! Issues the two block blob requests the upload engine needs, against a
//! SAS-authorized blob URI.
//!
//! # Example
//!
//! ```no_run
//! use blockblob_uploadr::blob::{block_id, BlobClient};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BlobClient::new()?;
//! let sas_uri = "https://acct.blob.core.windows.net/content/app.msi?sv=2022-11-02&sig=...";
//!
//! let id = block_id::encode(0)?;
//! client
//!     .put_block(sas_uri, &id, Bytes::from("hello"), Duration::from_secs(60))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Tracing
//!
//! | Operation | Span Name | Attributes |
//! |-----------|-----------|------------|
//! | Put Block | `blob.put_block` | block id, method, bytes, status_code |
//! | Put Block List | `blob.put_block_list` | method, blocks_count, status_code |
//!
//! The SAS token is never recorded; spans carry the redacted blob location.

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, StatusCode};
use std::time::Duration;
use thiserror::Error;

pub mod block_id;
pub mod block_list;
pub mod url;

pub use block_id::BlockId;
pub use block_list::BlockList;

/// Header identifying the blob type on `Put Block`
pub const BLOB_TYPE_HEADER: &str = "x-ms-blob-type";

/// Response bodies kept in errors are cut to this many bytes
const MAX_ERROR_BODY: usize = 1024;

/// Blob client errors
#[derive(Error, Debug)]
pub enum BlobClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The request could not be built; sending it again cannot help
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl BlobClientError {
    /// Whether an identical request may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BlobClientError::Status { .. }
                | BlobClientError::Transport(_)
                | BlobClientError::Timeout(_)
        )
    }
}

/// Blob storage client
#[derive(Debug, Clone)]
pub struct BlobClient {
    http_client: reqwest::Client,
}

impl BlobClient {
    /// Create a new blob client
    pub fn new() -> Result<Self, BlobClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("blockblob-uploadr/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BlobClientError::ConfigError(e.to_string()))?;

        Ok(Self { http_client })
    }

    /// Stage one block (Put Block)
    ///
    /// The whole exchange, including reading an error body, is bounded by
    /// `timeout`. Only `201 Created` counts as success.
    #[tracing::instrument(
        name = "blob.put_block",
        skip(self, sas_uri, body),
        fields(
            blob.path = %url::redact(sas_uri),
            block.id = %block_id,
            http.method = "PUT",
            upload.bytes = body.len(),
            http.status_code = tracing::field::Empty
        ),
        err
    )]
    pub async fn put_block(
        &self,
        sas_uri: &str,
        block_id: &BlockId,
        body: Bytes,
        timeout: Duration,
    ) -> Result<(), BlobClientError> {
        let url = url::block_url(sas_uri, block_id)?;
        let request = self
            .http_client
            .put(url)
            .header(BLOB_TYPE_HEADER, "BlockBlob")
            .body(body);

        self.execute(request, timeout).await
    }

    /// Commit staged blocks in order (Put Block List)
    #[tracing::instrument(
        name = "blob.put_block_list",
        skip(self, sas_uri, block_list),
        fields(
            blob.path = %url::redact(sas_uri),
            http.method = "PUT",
            blocks_count = block_list.len(),
            http.status_code = tracing::field::Empty
        ),
        err
    )]
    pub async fn put_block_list(
        &self,
        sas_uri: &str,
        block_list: &BlockList,
        timeout: Duration,
    ) -> Result<(), BlobClientError> {
        let url = url::block_list_url(sas_uri)?;
        let body = block_list.to_xml()?;
        let request = self
            .http_client
            .put(url)
            .header(CONTENT_TYPE, "application/xml")
            .body(body);

        self.execute(request, timeout).await
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<(), BlobClientError> {
        let exchange = async {
            let response = request.send().await.map_err(classify_reqwest_error)?;
            let status = response.status();
            tracing::Span::current().record("http.status_code", status.as_u16());

            if status == StatusCode::CREATED {
                return Ok(());
            }

            let body = response.text().await.unwrap_or_default();
            Err(BlobClientError::Status {
                status: status.as_u16(),
                body: truncate_body(body),
            })
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(BlobClientError::Timeout(timeout)),
        }
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> BlobClientError {
    // The request URL carries the SAS signature
    let e = e.without_url();
    let message = describe(&e);
    if e.is_builder() {
        BlobClientError::InvalidRequest(message)
    } else {
        BlobClientError::Transport(message)
    }
}

/// Error text with its causes, e.g. `error sending request: ... Connection refused`
fn describe(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
