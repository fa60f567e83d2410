//! Upload progress and throughput
//!
//! Presentation only: nothing in the session reads these numbers back.

use std::time::{Duration, Instant};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Progress after a completed block
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub block_index: u64,
    pub block_bytes: u64,
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
    pub blocks_remaining: u64,
    pub elapsed: Duration,
    pub percent_complete: f64,
    /// Average since the session started, in MiB/s
    pub throughput_mbps: f64,
    /// Throughput of the last block alone, in MiB/s
    pub block_throughput_mbps: f64,
    /// Linear estimate; `None` until some throughput was measured
    pub eta: Option<Duration>,
}

/// Accumulates transferred bytes for one session
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_bytes: u64,
    total_blocks: u64,
    uploaded_bytes: u64,
    completed_blocks: u64,
    started: Instant,
    last_block_at: Instant,
}

impl ProgressTracker {
    pub fn new(total_bytes: u64, total_blocks: u64) -> Self {
        Self::starting_at(total_bytes, total_blocks, Instant::now())
    }

    pub fn starting_at(total_bytes: u64, total_blocks: u64, started: Instant) -> Self {
        Self {
            total_bytes,
            total_blocks,
            uploaded_bytes: 0,
            completed_blocks: 0,
            started,
            last_block_at: started,
        }
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    /// Account for a block that was just accepted
    pub fn record_block(&mut self, block_index: u64, block_bytes: u64) -> ProgressSnapshot {
        self.record_block_at(block_index, block_bytes, Instant::now())
    }

    pub fn record_block_at(
        &mut self,
        block_index: u64,
        block_bytes: u64,
        now: Instant,
    ) -> ProgressSnapshot {
        self.uploaded_bytes += block_bytes;
        self.completed_blocks += 1;

        let elapsed = now.saturating_duration_since(self.started);
        let block_elapsed = now.saturating_duration_since(self.last_block_at);
        self.last_block_at = now;

        let throughput_bps = rate(self.uploaded_bytes, elapsed);
        let remaining_bytes = self.total_bytes.saturating_sub(self.uploaded_bytes);
        let eta = (throughput_bps > 0.0)
            .then(|| Duration::from_secs_f64(remaining_bytes as f64 / throughput_bps));

        let percent_complete = if self.total_bytes == 0 {
            100.0
        } else {
            self.uploaded_bytes as f64 / self.total_bytes as f64 * 100.0
        };

        ProgressSnapshot {
            block_index,
            block_bytes,
            uploaded_bytes: self.uploaded_bytes,
            total_bytes: self.total_bytes,
            blocks_remaining: self.total_blocks.saturating_sub(self.completed_blocks),
            elapsed,
            percent_complete,
            throughput_mbps: throughput_bps / BYTES_PER_MB,
            block_throughput_mbps: rate(block_bytes, block_elapsed) / BYTES_PER_MB,
            eta,
        }
    }
}

fn rate(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        bytes as f64 / secs
    } else {
        0.0
    }
}
