//! Shared helpers for upload integration tests
//!
//! A `wiremock::MockServer` stands in for blob storage.

#![allow(dead_code)]

use blockblob_uploadr::config::{RetryConfig, UploadConfig};
use blockblob_uploadr::upload::observer::{RetryEvent, UploadObserver};
use blockblob_uploadr::upload::{ProgressSnapshot, UploadError};
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;
use wiremock::{MockServer, Request};

/// Blob path used by every test
pub const BLOB_PATH: &str = "/content/app.msi";

/// Stand-in for 1 MiB so scenarios stay fast
pub const UNIT: usize = 1024;

/// SAS URI pointing at the mock server
pub fn sas_uri(server: &MockServer) -> String {
    format!("{}{}?sv=2022-11-02&sr=b&sig=test-signature", server.uri(), BLOB_PATH)
}

/// SAS URI for a local port with no listener, so every request is refused
pub fn closed_port_sas_uri() -> String {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .expect("local addr")
        .port();
    format!("http://127.0.0.1:{}{}?sv=2022-11-02&sr=b&sig=test-signature", port, BLOB_PATH)
}

/// Upload config with small blocks and no backoff
pub fn test_config(block_size: usize) -> UploadConfig {
    UploadConfig {
        block_size,
        block_timeout_secs: 5,
        commit_timeout_secs: 5,
        retry: RetryConfig {
            max_attempts: 3,
            backoff_min_millis: 0,
            backoff_max_millis: 0,
        },
        ..Default::default()
    }
}

/// Deterministic, non-repeating-per-block payload
pub fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Write `data` to a temp file that lives as long as the handle
pub fn source_file(data: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(data).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

pub fn query_value(request: &Request, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Received Put Block requests, in arrival order
pub async fn block_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| query_value(r, "comp").as_deref() == Some("block"))
        .collect()
}

/// Received Put Block List requests
pub async fn commit_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| query_value(r, "comp").as_deref() == Some("blocklist"))
        .collect()
}

/// Expected commit body for the given block IDs
pub fn block_list_xml(ids: &[&str]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?><BlockList>");
    for id in ids {
        xml.push_str(&format!("<Latest>{}</Latest>", id));
    }
    xml.push_str("</BlockList>");
    xml
}

/// Observer that keeps every event for later assertions
#[derive(Default)]
pub struct RecordingObserver {
    pub blocks: Mutex<Vec<ProgressSnapshot>>,
    pub retries: Mutex<Vec<RetryEvent>>,
    pub failures: Mutex<Vec<String>>,
}

impl UploadObserver for RecordingObserver {
    fn on_block_complete(&self, progress: &ProgressSnapshot) {
        self.blocks.lock().unwrap().push(progress.clone());
    }

    fn on_retry(&self, event: &RetryEvent) {
        self.retries.lock().unwrap().push(event.clone());
    }

    fn on_failure(&self, error: &UploadError) {
        self.failures.lock().unwrap().push(error.to_string());
    }
}
