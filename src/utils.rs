//! Hashing and encoding helpers shared across the crate.
//!
//! Mirrors `gillean::utils`: thin wrappers over `sha2`/`hex` plus the
//! additional digests the Light VM's opcode table needs.

use blake2::Blake2b512;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

/// SHA-256 hex digest of the given bytes.
pub fn sha256_hex<T: AsRef<[u8]>>(data: T) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}

/// Keccak-256 digest (used by the Light VM `KECCAK256` opcode).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&out);
    bytes
}

/// RIPEMD-160 digest (used by the Light VM `RIPEMD160` opcode).
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&out);
    bytes
}

/// BLAKE2b-256 digest (used by the Light VM `BLAKE2B256` opcode).
pub fn blake2b256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b512::new();
    hasher.update(data);
    let full = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&full[..32]);
    bytes
}

/// Check if a hash (hex string) meets a leading-zero difficulty target.
pub fn hash_meets_difficulty(hash_hex: &str, difficulty: u32) -> bool {
    if difficulty == 0 {
        return true;
    }
    hash_hex.starts_with(&"0".repeat(difficulty as usize))
}

/// Current unix timestamp in seconds.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_is_64_chars() {
        assert_eq!(sha256_hex("hello").len(), 64);
    }

    #[test]
    fn difficulty_check() {
        let hash = "0000abcdef";
        assert!(hash_meets_difficulty(hash, 4));
        assert!(!hash_meets_difficulty(hash, 5));
    }

    #[test]
    fn digests_are_distinct() {
        let a = keccak256(b"x");
        let b = blake2b256(b"x");
        assert_ne!(a, b);
    }
}
