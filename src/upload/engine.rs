//! Upload orchestrator
//!
//! Drives one [`UploadSession`] from open to commit: blocks are read, staged
//! and recorded strictly in index order on a single task, and the block
//! list is committed only after the last block was accepted.

use super::chunker::Chunker;
use super::committer::BlockListCommitter;
use super::context::SessionContext;
use super::observer::{TracingObserver, UploadObserver};
use super::progress::ProgressTracker;
use super::retry::RetryPolicy;
use super::session::UploadSession;
use super::uploader::BlockUploader;
use super::{Stage, UploadError, UploadResult};
use crate::blob::{block_id, url, BlobClient};
use crate::config::{EmptyFilePolicy, UploadConfig};
use crate::metrics;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Chunked uploader for block blobs behind a SAS URI
pub struct BlockBlobUploader {
    config: UploadConfig,
    uploader: BlockUploader,
    committer: BlockListCommitter,
    observer: Arc<dyn UploadObserver>,
}

impl BlockBlobUploader {
    /// Create an uploader with its own HTTP client
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let client = BlobClient::new().map_err(UploadError::Client)?;
        Self::with_client(config, client)
    }

    /// Create an uploader on top of an existing blob client
    pub fn with_client(config: UploadConfig, client: BlobClient) -> Result<Self, UploadError> {
        config.validate()?;

        let uploader = BlockUploader::new(
            client.clone(),
            RetryPolicy::from(&config.retry),
            config.block_timeout(),
        );
        let committer = BlockListCommitter::new(client, config.commit_timeout());

        Ok(Self {
            config,
            uploader,
            committer,
            observer: Arc::new(TracingObserver),
        })
    }

    /// Replace the default tracing observer
    pub fn with_observer(mut self, observer: Arc<dyn UploadObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the retry policy derived from the configuration
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.uploader = BlockUploader::new(
            self.uploader.client().clone(),
            policy,
            self.config.block_timeout(),
        );
        self
    }

    /// Upload `path` to `sas_uri`, bounded by the configured deadline if any
    pub async fn upload_file(
        &self,
        sas_uri: &str,
        path: impl AsRef<Path>,
    ) -> Result<UploadResult, UploadError> {
        let ctx = match self.config.deadline() {
            Some(budget) => SessionContext::new().with_deadline(budget),
            None => SessionContext::new(),
        };
        self.upload_file_with_context(sas_uri, path.as_ref(), &ctx)
            .await
    }

    /// Upload `path` to `sas_uri` under a caller-supplied cancellation scope
    #[tracing::instrument(
        name = "upload.session",
        skip(self, sas_uri, ctx),
        fields(
            blob.path = %url::redact(sas_uri),
            source = %path.display(),
            upload.block_size = self.config.block_size,
            upload.blocks = tracing::field::Empty,
            upload.bytes = tracing::field::Empty
        )
    )]
    pub async fn upload_file_with_context(
        &self,
        sas_uri: &str,
        path: &Path,
        ctx: &SessionContext,
    ) -> Result<UploadResult, UploadError> {
        let started = Instant::now();
        let mut session = UploadSession::new(sas_uri, path, self.config.block_size);

        let outcome = self.run_session(&mut session, ctx, started).await;
        let duration = started.elapsed();

        match outcome {
            Ok(result) => {
                metrics::record_upload_success(duration.as_secs_f64());
                tracing::info!(
                    blocks = result.block_count,
                    bytes = result.bytes_written,
                    duration_ms = duration.as_millis() as u64,
                    "Upload committed"
                );
                Ok(result)
            }
            Err(e) => {
                session.fail();
                metrics::record_upload_failure(duration.as_secs_f64());
                metrics::record_error(e.kind());
                self.observer.on_failure(&e);
                Err(e)
            }
        }
    }

    async fn run_session(
        &self,
        session: &mut UploadSession,
        ctx: &SessionContext,
        started: Instant,
    ) -> Result<UploadResult, UploadError> {
        // Opening
        let open = |source| UploadError::Open {
            path: session.source_path().to_path_buf(),
            source,
        };
        let file = ctx
            .run(Stage::Open, tokio::fs::File::open(session.source_path()))
            .await?
            .map_err(open)?;
        let metadata = file.metadata().await.map_err(open)?;
        if !metadata.is_file() {
            return Err(open(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }
        session.opened(metadata.len())?;

        // Chunking
        if session.total_size() == 0 && self.config.empty_file == EmptyFilePolicy::Reject {
            return Err(UploadError::EmptySource {
                path: session.source_path().to_path_buf(),
            });
        }
        session.chunked()?;

        let span = tracing::Span::current();
        span.record("upload.blocks", session.total_blocks());
        span.record("upload.bytes", session.total_size());

        let mut chunker = Chunker::new(file, session.block_size());
        let mut progress = ProgressTracker::new(session.total_size(), session.total_blocks());

        // Uploading blocks
        while let Some(index) = session.expected_index() {
            ctx.check(Stage::UploadBlock(index))?;

            let block = chunker.next_block().await?.ok_or_else(|| UploadError::Read {
                index,
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "source file shrank during upload",
                ),
            })?;
            let id = block_id::encode(block.index)?;

            self.uploader
                .upload(session.sas_uri(), &block, &id, ctx, self.observer.as_ref())
                .await?;

            session.record_block(block.index, id)?;
            metrics::record_block_uploaded(block.len() as u64);
            let snapshot = progress.record_block(block.index, block.len() as u64);
            self.observer.on_block_complete(&snapshot);
        }

        // Committing
        let block_list = session.block_list()?;
        self.committer
            .commit(session.sas_uri(), &block_list, ctx)
            .await?;
        session.committed()?;

        Ok(UploadResult {
            block_count: session.total_blocks(),
            bytes_written: progress.uploaded_bytes(),
            elapsed: started.elapsed(),
        })
    }
}
