//! Block uploader
//!
//! Stages a single block with Put Block. Each attempt gets its own timeout;
//! transient failures are retried with the same block ID and the same bytes
//! until the attempt cap is reached.

use super::chunker::Block;
use super::context::SessionContext;
use super::observer::{RetryEvent, UploadObserver};
use super::retry::RetryPolicy;
use super::{Stage, UploadError};
use crate::blob::{BlobClient, BlobClientError, BlockId};
use crate::metrics;
use std::time::Duration;

/// Put Block with bounded retries
#[derive(Debug, Clone)]
pub struct BlockUploader {
    client: BlobClient,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl BlockUploader {
    pub fn new(client: BlobClient, policy: RetryPolicy, attempt_timeout: Duration) -> Self {
        Self {
            client,
            policy,
            attempt_timeout,
        }
    }

    pub fn client(&self) -> &BlobClient {
        &self.client
    }

    /// Stage `block` under `block_id`, returning the number of attempts used
    #[tracing::instrument(
        name = "upload.block",
        skip(self, sas_uri, block, block_id, ctx, observer),
        fields(block.index = block.index, block.id = %block_id, upload.bytes = block.len()),
        err
    )]
    pub async fn upload(
        &self,
        sas_uri: &str,
        block: &Block,
        block_id: &BlockId,
        ctx: &SessionContext,
        observer: &dyn UploadObserver,
    ) -> Result<u32, UploadError> {
        let stage = Stage::UploadBlock(block.index);
        let mut attempt = 0;

        loop {
            attempt += 1;
            ctx.check(stage)?;

            let outcome = ctx
                .run(
                    stage,
                    self.client.put_block(
                        sas_uri,
                        block_id,
                        block.data.clone(),
                        self.attempt_timeout,
                    ),
                )
                .await?;

            let error = match outcome {
                Ok(()) => return Ok(attempt),
                Err(BlobClientError::InvalidRequest(message)) => {
                    return Err(UploadError::RequestConstruction { stage, message });
                }
                Err(e) => e,
            };

            if !error.is_retryable() || !self.policy.allows_retry_after(attempt) {
                return Err(UploadError::BlockUploadFailed {
                    index: block.index,
                    attempts: attempt,
                    last_error: error,
                });
            }

            let delay = self.policy.backoff();
            metrics::record_block_retry();
            observer.on_retry(&RetryEvent {
                block_index: block.index,
                block_id: block_id.to_string(),
                attempt,
                max_attempts: self.policy.max_attempts(),
                delay,
                error: error.to_string(),
            });

            ctx.run(stage, tokio::time::sleep(delay)).await?;
        }
    }
}
