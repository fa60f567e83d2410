//! Upload event sink
//!
//! The engine reports progress, retries and failures through
//! [`UploadObserver`] instead of logging directly, so callers can route
//! events anywhere. [`TracingObserver`] is the default.

use super::progress::ProgressSnapshot;
use super::UploadError;
use std::time::Duration;

/// A failed Put Block attempt that will be retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEvent {
    pub block_index: u64,
    pub block_id: String,
    /// 1-based number of the attempt that failed
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay: Duration,
    pub error: String,
}

/// Receives session events. Every method defaults to doing nothing.
pub trait UploadObserver: Send + Sync {
    fn on_block_complete(&self, _progress: &ProgressSnapshot) {}

    fn on_retry(&self, _event: &RetryEvent) {}

    fn on_failure(&self, _error: &UploadError) {}
}

/// Logs events with `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl UploadObserver for TracingObserver {
    fn on_block_complete(&self, progress: &ProgressSnapshot) {
        tracing::info!(
            block.index = progress.block_index,
            block.bytes = progress.block_bytes,
            uploaded_bytes = progress.uploaded_bytes,
            total_bytes = progress.total_bytes,
            blocks_remaining = progress.blocks_remaining,
            percent = format_args!("{:.1}", progress.percent_complete),
            throughput_mbps = format_args!("{:.2}", progress.throughput_mbps),
            block_throughput_mbps = format_args!("{:.2}", progress.block_throughput_mbps),
            eta_secs = progress.eta.map(|eta| eta.as_secs()),
            elapsed_ms = progress.elapsed.as_millis() as u64,
            "Block uploaded"
        );
    }

    fn on_retry(&self, event: &RetryEvent) {
        tracing::warn!(
            block.index = event.block_index,
            block.id = %event.block_id,
            attempt = event.attempt,
            max_attempts = event.max_attempts,
            delay_ms = event.delay.as_millis() as u64,
            error = %event.error,
            "Block upload failed, retrying"
        );
    }

    fn on_failure(&self, error: &UploadError) {
        tracing::error!(
            error = %error,
            stage = %error.stage().map_or_else(|| "-".to_string(), |s| s.to_string()),
            retryable = error.is_retryable(),
            "Upload session failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::Stage;

    struct Silent;
    impl UploadObserver for Silent {}

    #[test]
    fn test_default_methods_are_noops() {
        let observer = Silent;
        observer.on_failure(&UploadError::Cancelled {
            stage: Stage::Open,
        });
    }

    #[test]
    fn test_tracing_observer_accepts_all_events() {
        let observer = TracingObserver;
        observer.on_retry(&RetryEvent {
            block_index: 1,
            block_id: "MDAwMDAx".into(),
            attempt: 1,
            max_attempts: 3,
            delay: Duration::from_secs(5),
            error: "Unexpected status 503: ".into(),
        });
        observer.on_failure(&UploadError::CommitFailed {
            status: Some(400),
            body: String::new(),
        });
    }
}
