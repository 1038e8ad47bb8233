use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

/// Bytes of one file, rebuilt from its chunks.
///
/// Chunks are appended in capture order with no range bookkeeping, so a
/// capture with missing, repeated or reordered chunks yields a corrupt file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamAsset {
    bytes: Vec<u8>,
    chunks: usize,
}

impl StreamAsset {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of chunks that went into this asset.
    pub fn chunks(&self) -> usize {
        self.chunks
    }
}

/// Per-file chunk accumulator. Everything stays in memory until `finish`.
#[derive(Debug, Default)]
pub struct Reassembler {
    assets: HashMap<String, StreamAsset>,
    order: Vec<String>,
}

impl Reassembler {
    /// Decode one base64 chunk body and append it to its file.
    pub fn push(&mut self, file_id: &str, body: &str) -> Result<()> {
        let decoded = STANDARD
            .decode(body.trim())
            .map_err(|source| Error::ChunkDecode {
                file_id: file_id.to_string(),
                source,
            })?;

        if !self.assets.contains_key(file_id) {
            self.order.push(file_id.to_string());
        }
        let asset = self.assets.entry(file_id.to_string()).or_default();
        asset.bytes.extend_from_slice(&decoded);
        asset.chunks += 1;
        log::trace!(
            "chunk {} for {file_id}: {} bytes",
            asset.chunks,
            decoded.len()
        );
        Ok(())
    }

    pub fn get(&self, file_id: &str) -> Option<&StreamAsset> {
        self.assets.get(file_id)
    }

    /// File ids with their assets, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StreamAsset)> {
        self.order
            .iter()
            .filter_map(|id| self.assets.get(id).map(|a| (id.as_str(), a)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn finish(self) -> HashMap<String, StreamAsset> {
        self.assets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    #[test]
    fn test_concatenates_in_push_order() {
        let (a, b, c) = (b"\x00\x01".as_slice(), b"\x02".as_slice(), b"\x03\x04\x05".as_slice());
        let mut r = Reassembler::default();
        for chunk in [a, b, c] {
            r.push("f1", &encode(chunk)).unwrap();
        }
        let assets = r.finish();
        let expected: Vec<u8> = [a, b, c].concat();
        assert_eq!(assets["f1"].bytes(), expected.as_slice());
        assert_eq!(assets["f1"].chunks(), 3);
    }

    #[test]
    fn test_order_matters() {
        let chunks = [b"\x0a".as_slice(), b"\x0b".as_slice(), b"\x0c".as_slice()];
        let mut forward = Reassembler::default();
        let mut shuffled = Reassembler::default();
        for c in chunks {
            forward.push("f1", &encode(c)).unwrap();
        }
        for c in [chunks[2], chunks[0], chunks[1]] {
            shuffled.push("f1", &encode(c)).unwrap();
        }
        assert_ne!(
            forward.get("f1").unwrap().bytes(),
            shuffled.get("f1").unwrap().bytes()
        );
    }

    #[test]
    fn test_files_are_kept_apart() {
        let mut r = Reassembler::default();
        r.push("f1", "AA==").unwrap();
        r.push("f2", "AQ==").unwrap();
        r.push("f1", "Ag==").unwrap();
        let ids: Vec<&str> = r.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["f1", "f2"]);
        assert_eq!(r.get("f1").unwrap().bytes(), &[0x00, 0x02]);
        assert_eq!(r.get("f2").unwrap().bytes(), &[0x01]);
    }

    #[test]
    fn test_duplicate_chunk_is_not_detected() {
        // Known limitation: a chunk captured twice is appended twice.
        let mut r = Reassembler::default();
        r.push("f1", "AA==").unwrap();
        r.push("f1", "AA==").unwrap();
        assert_eq!(r.get("f1").unwrap().bytes(), &[0x00, 0x00]);
    }

    #[test]
    fn test_bad_base64() {
        let mut r = Reassembler::default();
        match r.push("f9", "not base64!") {
            Err(Error::ChunkDecode { file_id, .. }) => assert_eq!(file_id, "f9"),
            other => panic!("expected ChunkDecode, got {other:?}"),
        }
        assert!(r.is_empty());
    }
}
