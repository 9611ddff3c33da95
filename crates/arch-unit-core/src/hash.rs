//! Content hashing. Two distinct hashes are used throughout the cache:
//!
//! - [`content_hash`] — SHA-256 of raw file bytes, used for staleness
//!   detection. Independent of mtime by design: only byte
//!   content determines freshness.
//! - [`call_site_hash`] — base62(xxhash64(..)) of a call-site's resolution
//!   inputs, used as the key for the call-resolution cache (a fast,
//!   non-cryptographic hash is appropriate here since collisions only cost a
//!   cache miss, not incorrect staleness detection).

use sha2::{Digest, Sha256};
use xxhash_rust::xxh64::xxh64;

const BASE62_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encode a u64 value as a base62 string (11 chars, zero-padded).
fn base62_encode(mut value: u64) -> String {
    if value == 0 {
        return "0".repeat(11);
    }
    let mut result = Vec::with_capacity(11);
    while value > 0 {
        let idx = (value % 62) as usize;
        result.push(BASE62_CHARS[idx]);
        value /= 62;
    }
    while result.len() < 11 {
        result.push(b'0');
    }
    result.reverse();
    String::from_utf8(result).expect("base62 chars are valid UTF-8")
}

/// SHA-256 of file bytes, hex-encoded. Used as `file_metadata.content_hash`.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// A deterministic, collision-tolerant key for the call-resolution cache.
/// `site` should uniquely describe the call expression within its file
/// (e.g. `"{file_path}:{line}:{column}:{callee_text}"`).
pub fn call_site_hash(site: &str) -> String {
    base62_encode(xxh64(site.as_bytes(), 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_deterministic() {
        let h1 = content_hash(b"fn main() {}");
        let h2 = content_hash(b"fn main() {}");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_content_hash_changes_with_bytes() {
        let h1 = content_hash(b"a");
        let h2 = content_hash(b"b");
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_content_hash_length_is_sha256_hex() {
        let h = content_hash(b"");
        assert_eq!(h.len(), 64);
    }

    #[test]
    fn test_call_site_hash_deterministic() {
        let h1 = call_site_hash("src/a.go:10:4:fmt.Println");
        let h2 = call_site_hash("src/a.go:10:4:fmt.Println");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 11);
    }

    #[test]
    fn test_call_site_hash_changes_with_site() {
        let h1 = call_site_hash("src/a.go:10:4:fmt.Println");
        let h2 = call_site_hash("src/a.go:11:4:fmt.Println");
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_base62_encoding() {
        let encoded = base62_encode(0);
        assert_eq!(encoded.len(), 11);
        assert!(encoded.chars().all(|c| c == '0'));
        let encoded = base62_encode(1);
        assert_eq!(encoded.len(), 11);
    }
}
