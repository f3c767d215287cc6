use base64::Engine;
use sha2::{Digest, Sha256};

/// SHA-256 content hash, base64-encoded. Used as the document dedup key.
pub fn content_hash(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    base64::engine::general_purpose::STANDARD.encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_hash_identically() {
        assert_eq!(content_hash(b"ihale"), content_hash(b"ihale"));
    }

    #[test]
    fn different_bytes_hash_differently() {
        assert_ne!(content_hash(b"ihale"), content_hash(b"ihale "));
    }

    #[test]
    fn hash_is_base64_of_32_bytes() {
        let hash = content_hash(b"");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&hash)
            .unwrap();
        assert_eq!(decoded.len(), 32);
    }
}
