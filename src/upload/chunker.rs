//! Sequential block reader
//!
//! Splits a reader into fixed-size blocks. Short reads are accumulated until
//! the block is full, so only the final block can be shorter than
//! `block_size`. The chunker is forward-only; re-reading a file needs a new
//! chunker over a freshly opened handle.

use super::UploadError;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

/// One block of the source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub index: u64,
    pub data: Bytes,
}

impl Block {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Forward-only block reader
pub struct Chunker<R> {
    reader: R,
    block_size: usize,
    next_index: u64,
    finished: bool,
}

impl<R: AsyncRead + Unpin> Chunker<R> {
    pub fn new(reader: R, block_size: usize) -> Self {
        Self {
            reader,
            block_size,
            next_index: 0,
            finished: block_size == 0,
        }
    }

    /// Index the next returned block will carry
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Read the next block, or `None` once the reader is exhausted
    pub async fn next_block(&mut self) -> Result<Option<Block>, UploadError> {
        if self.finished {
            return Ok(None);
        }

        let index = self.next_index;
        let mut buf = vec![0u8; self.block_size];
        let mut filled = 0;

        while filled < self.block_size {
            match self.reader.read(&mut buf[filled..]).await {
                Ok(0) => {
                    self.finished = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    self.finished = true;
                    return Err(UploadError::Read { index, source });
                }
            }
        }

        if filled == 0 {
            return Ok(None);
        }

        buf.truncate(filled);
        self.next_index += 1;
        Ok(Some(Block {
            index,
            data: Bytes::from(buf),
        }))
    }
}
