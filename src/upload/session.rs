//! Upload session state
//!
//! ```text
//! Opening -> Chunking -> UploadingBlocks(0) -> ... -> UploadingBlocks(n-1) -> Committing -> Done
//!    \__________\_______________\__________________________________________\______-> Failed
//! ```
//!
//! Transitions are pure functions on [`SessionState`]; [`UploadSession`]
//! applies them and owns the growing list of accepted block IDs. No state
//! is ever revisited, and a failed session is never resumed.

use super::{Stage, UploadError};
use crate::blob::block_id::MAX_BLOCKS;
use crate::blob::{BlockId, BlockList};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Opening,
    Chunking,
    /// Waiting for block `n` to be accepted
    UploadingBlocks(u64),
    Committing,
    Done,
    Failed(Stage),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Opening => "opening",
            SessionState::Chunking => "chunking",
            SessionState::UploadingBlocks(_) => "uploading_blocks",
            SessionState::Committing => "committing",
            SessionState::Done => "done",
            SessionState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed(_))
    }

    /// Stage a failure in this state is attributed to
    pub fn stage(&self) -> Option<Stage> {
        match *self {
            SessionState::Opening => Some(Stage::Open),
            SessionState::Chunking => Some(Stage::Chunk),
            SessionState::UploadingBlocks(index) => Some(Stage::UploadBlock(index)),
            SessionState::Committing => Some(Stage::Commit),
            SessionState::Done | SessionState::Failed(_) => None,
        }
    }

    /// The source file was opened and measured
    pub fn opened(self) -> Result<Self, UploadError> {
        match self {
            SessionState::Opening => Ok(SessionState::Chunking),
            other => Err(other.invalid("opened")),
        }
    }

    /// The block count is known; an empty file goes straight to commit
    pub fn chunked(self, total_blocks: u64) -> Result<Self, UploadError> {
        match self {
            SessionState::Chunking if total_blocks == 0 => Ok(SessionState::Committing),
            SessionState::Chunking => Ok(SessionState::UploadingBlocks(0)),
            other => Err(other.invalid("chunked")),
        }
    }

    /// Block `index` was accepted by the service
    pub fn block_uploaded(self, index: u64, total_blocks: u64) -> Result<Self, UploadError> {
        match self {
            SessionState::UploadingBlocks(expected) if expected == index => {
                if index + 1 == total_blocks {
                    Ok(SessionState::Committing)
                } else {
                    Ok(SessionState::UploadingBlocks(index + 1))
                }
            }
            other => Err(other.invalid("block_uploaded")),
        }
    }

    /// The block list was committed
    pub fn committed(self) -> Result<Self, UploadError> {
        match self {
            SessionState::Committing => Ok(SessionState::Done),
            other => Err(other.invalid("committed")),
        }
    }

    /// Terminal states stay as they are
    pub fn failed(self) -> Self {
        match self.stage() {
            Some(stage) => SessionState::Failed(stage),
            None => self,
        }
    }

    fn invalid(self, event: &'static str) -> UploadError {
        UploadError::InvalidTransition {
            from: self.name(),
            event,
        }
    }
}

/// Number of blocks needed for `total_size` bytes
pub fn block_count(total_size: u64, block_size: usize) -> u64 {
    if block_size == 0 {
        return 0;
    }
    total_size.div_ceil(block_size as u64)
}

/// One end-to-end attempt to upload one file
#[derive(Debug)]
pub struct UploadSession {
    sas_uri: String,
    source_path: PathBuf,
    block_size: usize,
    total_size: u64,
    total_blocks: u64,
    block_ids: Vec<BlockId>,
    state: SessionState,
}

impl UploadSession {
    pub fn new(sas_uri: impl Into<String>, source_path: impl Into<PathBuf>, block_size: usize) -> Self {
        Self {
            sas_uri: sas_uri.into(),
            source_path: source_path.into(),
            block_size,
            total_size: 0,
            total_blocks: 0,
            block_ids: Vec::new(),
            state: SessionState::Opening,
        }
    }

    pub fn sas_uri(&self) -> &str {
        &self.sas_uri
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Index of the block the session is waiting for
    pub fn expected_index(&self) -> Option<u64> {
        match self.state {
            SessionState::UploadingBlocks(index) => Some(index),
            _ => None,
        }
    }

    /// Record the file size captured at open
    pub fn opened(&mut self, total_size: u64) -> Result<(), UploadError> {
        self.state = self.state.opened()?;
        self.total_size = total_size;
        self.total_blocks = block_count(total_size, self.block_size);
        Ok(())
    }

    /// Leave `Chunking`, refusing files that cannot be described by block IDs
    pub fn chunked(&mut self) -> Result<(), UploadError> {
        if self.total_blocks > MAX_BLOCKS {
            return Err(UploadError::TooManyBlocks {
                total_blocks: self.total_blocks,
            });
        }
        self.state = self.state.chunked(self.total_blocks)?;
        self.block_ids.reserve_exact(self.total_blocks as usize);
        Ok(())
    }

    /// Append the ID of the block that was just accepted
    pub fn record_block(&mut self, index: u64, id: BlockId) -> Result<(), UploadError> {
        self.state = self.state.block_uploaded(index, self.total_blocks)?;
        self.block_ids.push(id);
        Ok(())
    }

    /// Block list to commit; only available once every block was accepted
    pub fn block_list(&self) -> Result<BlockList, UploadError> {
        if self.state != SessionState::Committing || self.block_ids.len() as u64 != self.total_blocks {
            return Err(self.state.invalid("block_list"));
        }
        Ok(BlockList::from(self.block_ids.clone()))
    }

    pub fn committed(&mut self) -> Result<(), UploadError> {
        self.state = self.state.committed()?;
        Ok(())
    }

    pub fn fail(&mut self) {
        self.state = self.state.failed();
    }
}
