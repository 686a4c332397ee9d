//! Core primitives shared by every component: addresses, hashes, token ids.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SynnergyError};

/// Opaque 20-byte account identifier. Hex-rendered with a `0x` prefix.
/// The all-zero address is the sentinel used for mint/burn/escrow sources and sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Derive an address from arbitrary seed bytes (e.g. a public key or a
    /// deterministic escrow derivation) by truncating a SHA-256 digest.
    pub fn derive(seed: &[u8]) -> Address {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Address(bytes)
    }

    /// Escrow address controlled by the protocol for a given purpose and id,
    /// e.g. `Address::escrow(b"bridge", bridge_id.as_bytes())`.
    pub fn escrow(namespace: &[u8], id: &[u8]) -> Address {
        let mut seed = Vec::with_capacity(namespace.len() + id.len() + 1);
        seed.extend_from_slice(namespace);
        seed.push(b':');
        seed.extend_from_slice(id);
        Address::derive(&seed)
    }

    /// Build an address from a byte slice, zero-padding or truncating to 20
    /// bytes. Used when decoding fixed-width fields out of untrusted wire
    /// payloads where a short read should not panic.
    pub fn from_bytes(bytes: &[u8]) -> Address {
        let mut arr = [0u8; 20];
        let len = bytes.len().min(20);
        arr[..len].copy_from_slice(&bytes[..len]);
        Address(arr)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = SynnergyError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed)
            .map_err(|e| SynnergyError::InvalidInput(format!("bad address hex: {e}")))?;
        if bytes.len() != 20 {
            return Err(SynnergyError::InvalidInput(format!(
                "address must be 20 bytes, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Address(arr))
    }
}

/// 32-byte digest used for block identity, transaction identity, state roots,
/// and channel ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn of(data: &[u8]) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Hash(bytes)
    }

    pub fn of_concat(pieces: &[&[u8]]) -> Hash {
        let mut hasher = Sha256::new();
        for piece in pieces {
            hasher.update(piece);
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Hash(bytes)
    }

    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Build a hash from a byte slice, zero-padding or truncating to 32
    /// bytes. Used when decoding fixed-width fields out of untrusted wire
    /// payloads where a short read should not panic.
    pub fn from_bytes(bytes: &[u8]) -> Hash {
        let mut arr = [0u8; 32];
        let len = bytes.len().min(32);
        arr[..len].copy_from_slice(&bytes[..len]);
        Hash(arr)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Hash {
    type Err = SynnergyError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| SynnergyError::InvalidInput(format!("bad hash hex: {e}")))?;
        if bytes.len() != 32 {
            return Err(SynnergyError::InvalidInput(format!(
                "hash must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Hash(arr))
    }
}

/// 32-bit identifier derived deterministically from a token standard code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub u32);

impl TokenId {
    /// Derive a TokenId from a human-readable standard code, e.g. "SYNN".
    pub fn from_code(code: &str) -> TokenId {
        let digest = Hash::of(code.as_bytes());
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&digest.0[..4]);
        TokenId(u32::from_be_bytes(buf))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Identifier for a liquidity pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolId(pub u32);

/// A network-location hint for a node (used by the node-location table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_through_hex() {
        let a = Address::derive(b"alice");
        let rendered = a.to_string();
        let parsed: Address = rendered.parse().unwrap();
        assert_eq!(a, parsed);
    }

    #[test]
    fn zero_address_is_sentinel() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::derive(b"bob").is_zero());
    }

    #[test]
    fn token_id_is_deterministic() {
        assert_eq!(TokenId::from_code("SYNN"), TokenId::from_code("SYNN"));
        assert_ne!(TokenId::from_code("SYNN"), TokenId::from_code("OTHER"));
    }

    #[test]
    fn hash_rejects_wrong_length() {
        assert!("deadbeef".parse::<Hash>().is_err());
    }
}
