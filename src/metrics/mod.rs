//! Metrics module
//!
//! Provides Prometheus metrics for upload sessions, blocks and commits.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Histogram,
    TextEncoder,
};

lazy_static! {
    // Session metrics
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "blockblob_uploads_total",
        "Total number of upload sessions",
        &["status"]
    ).unwrap();

    pub static ref UPLOAD_BYTES_TOTAL: Counter = register_counter!(
        "blockblob_upload_bytes_total",
        "Total bytes staged as blocks"
    ).unwrap();

    pub static ref UPLOAD_DURATION: Histogram = register_histogram!(
        "blockblob_upload_duration_seconds",
        "Upload session duration in seconds",
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0, 3600.0]
    ).unwrap();

    // Block metrics
    pub static ref BLOCKS_TOTAL: Counter = register_counter!(
        "blockblob_blocks_total",
        "Blocks accepted by the blob service"
    ).unwrap();

    pub static ref BLOCK_RETRIES_TOTAL: Counter = register_counter!(
        "blockblob_block_retries_total",
        "Put Block attempts that were retried"
    ).unwrap();

    // Commit metrics
    pub static ref COMMITS_TOTAL: CounterVec = register_counter_vec!(
        "blockblob_commits_total",
        "Put Block List calls",
        &["status"]
    ).unwrap();

    // Error metrics
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "blockblob_errors_total",
        "Total errors",
        &["type"]
    ).unwrap();
}

/// Record a successful upload session
pub fn record_upload_success(duration_secs: f64) {
    UPLOADS_TOTAL.with_label_values(&["success"]).inc();
    UPLOAD_DURATION.observe(duration_secs);
}

/// Record a failed upload session
pub fn record_upload_failure(duration_secs: f64) {
    UPLOADS_TOTAL.with_label_values(&["failure"]).inc();
    UPLOAD_DURATION.observe(duration_secs);
}

/// Record a block accepted by the service
pub fn record_block_uploaded(bytes: u64) {
    BLOCKS_TOTAL.inc();
    UPLOAD_BYTES_TOTAL.inc_by(bytes as f64);
}

/// Record a retried block attempt
pub fn record_block_retry() {
    BLOCK_RETRIES_TOTAL.inc();
}

/// Record the outcome of a commit
pub fn record_commit(success: bool) {
    let status = if success { "success" } else { "failure" };
    COMMITS_TOTAL.with_label_values(&[status]).inc();
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Render every registered metric in the Prometheus text format
pub fn gather_text() -> Result<String, prometheus::Error> {
    TextEncoder::new().encode_to_string(&prometheus::gather())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_block_uploaded() {
        let before = BLOCKS_TOTAL.get();
        record_block_uploaded(1024);
        assert!(BLOCKS_TOTAL.get() >= before + 1.0);
    }

    #[test]
    fn test_record_commit() {
        record_commit(true);
        record_commit(false);
        assert!(COMMITS_TOTAL.with_label_values(&["success"]).get() >= 1.0);
        assert!(COMMITS_TOTAL.with_label_values(&["failure"]).get() >= 1.0);
    }

    #[test]
    fn test_gather_text_contains_metrics() {
        record_error("test");
        record_upload_success(0.5);
        let text = gather_text().unwrap();
        assert!(text.contains("blockblob_errors_total"));
        assert!(text.contains("blockblob_uploads_total"));
    }
}
