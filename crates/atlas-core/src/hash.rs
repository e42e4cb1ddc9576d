//! Content hashing for change detection.

/// Hash file content for the change-gating comparison. Extraction only runs
/// when this value differs from the cached one.
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_content_hashes_identically() {
        assert_eq!(content_hash(b"function foo() {}"), content_hash(b"function foo() {}"));
    }

    #[test]
    fn test_different_content_hashes_differently() {
        assert_ne!(content_hash(b"a"), content_hash(b"b"));
    }
}
