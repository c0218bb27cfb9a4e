//! Fetches the current Bitcoin tip block header and derives its
//! reversed-byte-group form, used as the needle for the memory-scan
//! confirmation step. The fetch is behind a trait so the HTTP client is
//! a swappable collaborator.

pub mod mempool;

use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BlockHeader {
    pub previous_block_hash: String,
    #[serde(default)]
    pub merkle_root: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
    #[serde(default)]
    pub bits: Option<String>,
    #[serde(default)]
    pub nonce: Option<u64>,
    #[serde(default)]
    pub version: Option<i64>,
}

impl BlockHeader {
    /// `previous_block_hash` split into eight 8-character groups and
    /// reversed group-wise, matching the little-endian layout Bitcoin Core
    /// stores internally.
    pub fn previous_block_hash_modify(&self) -> String {
        hash_modify(&self.previous_block_hash)
    }
}

pub fn hash_modify(hash: &str) -> String {
    let chars: Vec<char> = hash.chars().collect();
    chars
        .chunks(8)
        .rev()
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("")
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("response did not contain a usable header: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait BlockHeaderSource: Send + Sync {
    async fn fetch(&self) -> Result<BlockHeader, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_modify_reverses_eight_byte_groups() {
        let canonical = "0000000000000000000000000000000000000000000000000000000000000001";
        // 68 chars is intentionally wrong length to exercise chunking robustness;
        // use a proper 64-char hash for the real assertion below.
        let _ = canonical;

        let hash: String = (0..8).map(|i| format!("{i:08x}")).collect();
        let modified = hash_modify(&hash);
        let expected: String = (0..8).rev().map(|i| format!("{i:08x}")).collect();
        assert_eq!(modified, expected);
    }
}
