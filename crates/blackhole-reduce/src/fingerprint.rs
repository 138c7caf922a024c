//! Content identities: SHA-256 over block payloads
//!
//! Two schemes hash the same bytes differently and are never interchangeable:
//! the BLHO container stores [`IdentityScheme::RawDigest`], the block store
//! protocol keys blocks by [`IdentityScheme::LengthPrefixedDigest`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{FormatError, ReduceError, Result};

/// Length of a SHA-256 digest in bytes
pub const DIGEST_LEN: usize = 32;

/// How a payload is fed to SHA-256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityScheme {
    /// `SHA-256(payload)`; used by the BLHO container
    RawDigest,
    /// `SHA-256(u32_be(len) || payload)`; used by the block store protocol
    LengthPrefixedDigest,
}

/// A 32-byte digest tagged with the scheme that produced it.
/// Identities from different schemes never compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentIdentity {
    scheme: IdentityScheme,
    digest: [u8; DIGEST_LEN],
}

impl ContentIdentity {
    /// Hash `payload` under `scheme`
    pub fn compute(scheme: IdentityScheme, payload: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        if scheme == IdentityScheme::LengthPrefixedDigest {
            hasher.update((payload.len() as u32).to_be_bytes());
        }
        hasher.update(payload);
        Self {
            scheme,
            digest: hasher.finalize().into(),
        }
    }

    /// `SHA-256(payload)`
    pub fn raw(payload: &[u8]) -> Self {
        Self::compute(IdentityScheme::RawDigest, payload)
    }

    /// `SHA-256(u32_be(len) || payload)`
    pub fn length_prefixed(payload: &[u8]) -> Self {
        Self::compute(IdentityScheme::LengthPrefixedDigest, payload)
    }

    /// Wrap an already computed digest
    pub fn from_digest(scheme: IdentityScheme, digest: [u8; DIGEST_LEN]) -> Self {
        Self { scheme, digest }
    }

    /// Wrap a stored digest, rejecting anything that is not exactly 32 bytes
    pub fn from_slice(scheme: IdentityScheme, bytes: &[u8]) -> std::result::Result<Self, FormatError> {
        let digest: [u8; DIGEST_LEN] = bytes.try_into().map_err(|_| FormatError::InvalidHashLength {
            expected: DIGEST_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self { scheme, digest })
    }

    /// Parse a 64-character hex digest
    pub fn from_hex(scheme: IdentityScheme, hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| ReduceError::Validation(format!("invalid hex digest {:?}: {}", hex_str, e)))?;
        Self::from_slice(scheme, &bytes).map_err(|e| ReduceError::Validation(e.to_string()))
    }

    /// Scheme that produced this digest
    pub fn scheme(&self) -> IdentityScheme {
        self.scheme
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

impl std::fmt::Display for ContentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for ContentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self.scheme, self.to_hex())
    }
}
