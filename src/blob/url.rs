//! Request URL composition
//!
//! The SAS URI is treated as opaque: operation parameters are appended to
//! whatever query string it already carries, and the result is only parsed
//! to reject URIs reqwest could not send.

use super::block_id::BlockId;
use super::BlobClientError;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Url;

/// URL for `Put Block`
pub fn block_url(sas_uri: &str, block_id: &BlockId) -> Result<Url, BlobClientError> {
    let id = utf8_percent_encode(block_id.as_str(), NON_ALPHANUMERIC);
    append_query(sas_uri, &format!("comp=block&blockid={}", id))
}

/// URL for `Put Block List`
pub fn block_list_url(sas_uri: &str) -> Result<Url, BlobClientError> {
    append_query(sas_uri, "comp=blocklist")
}

/// Blob location without the SAS token, safe to log
pub fn redact(sas_uri: &str) -> String {
    match Url::parse(sas_uri) {
        Ok(mut url) => {
            url.set_query(None);
            url.to_string()
        }
        Err(_) => "<invalid uri>".to_string(),
    }
}

fn append_query(sas_uri: &str, params: &str) -> Result<Url, BlobClientError> {
    let separator = match sas_uri.find('?') {
        None => "?",
        Some(_) if sas_uri.ends_with('?') || sas_uri.ends_with('&') => "",
        Some(_) => "&",
    };

    let raw = format!("{}{}{}", sas_uri, separator, params);
    let url = Url::parse(&raw)
        .map_err(|e| BlobClientError::InvalidRequest(format!("invalid SAS URI: {}", e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(BlobClientError::InvalidRequest(format!(
            "unsupported SAS URI scheme '{}'",
            other
        ))),
    }
}
