//! Block identifiers
//!
//! Block IDs are the base64 encoding of the block index rendered as a
//! six-digit, zero-padded decimal string. All IDs of a blob must have the
//! same encoded length, and the padding keeps lexicographic order equal to
//! numeric order for every index below [`MAX_BLOCKS`].

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;
use thiserror::Error;

/// Number of decimal digits in the unencoded block ID
pub const BLOCK_ID_DIGITS: usize = 6;

/// Exclusive upper bound on block indices (999,999 is the last valid one)
pub const MAX_BLOCKS: u64 = 1_000_000;

/// Block ID errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockIdError {
    #[error("block index {0} does not fit in {BLOCK_ID_DIGITS} decimal digits")]
    OutOfRange(u64),

    #[error("malformed block id {0:?}")]
    Malformed(String),
}

/// Wire-format block ID (already base64 encoded)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(String);

impl BlockId {
    /// Encoded form, as sent in `blockid=` and `<Latest>`
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlockId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<BlockId> for String {
    fn from(id: BlockId) -> Self {
        id.0
    }
}

/// Encode a zero-based block index into its wire-format ID.
///
/// ```
/// use blockblob_uploadr::blob::block_id::encode;
///
/// assert_eq!(encode(0).unwrap().as_str(), "MDAwMDAw");
/// assert_eq!(encode(2).unwrap().as_str(), "MDAwMDAy");
/// assert!(encode(1_000_000).is_err());
/// ```
pub fn encode(index: u64) -> Result<BlockId, BlockIdError> {
    if index >= MAX_BLOCKS {
        return Err(BlockIdError::OutOfRange(index));
    }
    let padded = format!("{:0width$}", index, width = BLOCK_ID_DIGITS);
    Ok(BlockId(STANDARD.encode(padded.as_bytes())))
}

/// Recover the block index from a wire-format ID.
pub fn decode(id: &BlockId) -> Result<u64, BlockIdError> {
    let malformed = || BlockIdError::Malformed(id.0.clone());

    let raw = STANDARD.decode(id.0.as_bytes()).map_err(|_| malformed())?;
    if raw.len() != BLOCK_ID_DIGITS || !raw.iter().all(u8::is_ascii_digit) {
        return Err(malformed());
    }

    std::str::from_utf8(&raw)
        .ok()
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_first_blocks() {
        assert_eq!(encode(0).unwrap().as_str(), STANDARD.encode("000000"));
        assert_eq!(encode(1).unwrap().as_str(), STANDARD.encode("000001"));
        assert_eq!(encode(2).unwrap().as_str(), STANDARD.encode("000002"));
    }

    #[test]
    fn test_encode_upper_bound() {
        assert_eq!(encode(999_999).unwrap().as_str(), STANDARD.encode("999999"));
        assert_eq!(encode(MAX_BLOCKS), Err(BlockIdError::OutOfRange(MAX_BLOCKS)));
        assert!(encode(u64::MAX).is_err());
    }

    #[test]
    fn test_ids_have_uniform_length() {
        let lengths: Vec<usize> = [0, 9, 10, 12_345, 999_999]
            .iter()
            .map(|&i| encode(i).unwrap().as_str().len())
            .collect();
        assert!(lengths.iter().all(|&len| len == 8));
    }

    #[test]
    fn test_ids_are_url_safe_without_escaping() {
        for index in (0..MAX_BLOCKS).step_by(7_919) {
            let id = encode(index).unwrap();
            assert!(
                id.as_str().chars().all(|c| c.is_ascii_alphanumeric()),
                "{id} needs escaping"
            );
        }
    }

    #[test]
    fn test_decode_roundtrip() {
        for index in [0, 1, 42, 100_000, 999_999] {
            assert_eq!(decode(&encode(index).unwrap()).unwrap(), index);
        }
    }

    #[test]
    fn test_decode_rejects_foreign_ids() {
        let not_base64 = BlockId("***".into());
        assert!(matches!(decode(&not_base64), Err(BlockIdError::Malformed(_))));

        let wrong_width = BlockId(STANDARD.encode("00000001"));
        assert!(decode(&wrong_width).is_err());

        let letters = BlockId(STANDARD.encode("abcdef"));
        assert!(decode(&letters).is_err());
    }

    #[test]
    fn test_decoded_order_matches_index_order() {
        // The zero-padded text must increase strictly across the whole id space
        let mut previous: Option<Vec<u8>> = None;
        for index in 0..MAX_BLOCKS {
            let raw = STANDARD.decode(encode(index).unwrap().as_str()).unwrap();
            if let Some(prev) = &previous {
                assert!(*prev < raw, "order breaks at index {}", index);
            }
            previous = Some(raw);
        }
    }
}
