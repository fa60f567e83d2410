//! Block list committer
//!
//! Issues exactly one Put Block List per session. A failed commit is never
//! retried here: the staged blocks may be in an unknown state, so the caller
//! has to start a new session from block 0.

use super::context::SessionContext;
use super::{Stage, UploadError};
use crate::blob::{BlobClient, BlobClientError, BlockList};
use crate::metrics;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BlockListCommitter {
    client: BlobClient,
    timeout: Duration,
}

impl BlockListCommitter {
    pub fn new(client: BlobClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Commit `block_list` as the blob's content
    pub async fn commit(
        &self,
        sas_uri: &str,
        block_list: &BlockList,
        ctx: &SessionContext,
    ) -> Result<(), UploadError> {
        ctx.check(Stage::Commit)?;

        let outcome = ctx
            .run(
                Stage::Commit,
                self.client.put_block_list(sas_uri, block_list, self.timeout),
            )
            .await?;

        metrics::record_commit(outcome.is_ok());

        outcome.map_err(|e| match e {
            BlobClientError::InvalidRequest(message) => UploadError::RequestConstruction {
                stage: Stage::Commit,
                message,
            },
            BlobClientError::Status { status, body } => UploadError::CommitFailed {
                status: Some(status),
                body,
            },
            other => UploadError::CommitFailed {
                status: None,
                body: other.to_string(),
            },
        })
    }
}
