//! Deterministic cache-key derivation.
//!
//! A [`Fingerprint`] is the hex SHA-256 of three inputs: the record identity
//! key, the canonical byte encoding of the operation descriptor, and the
//! target unit tag. The function is pure and touches no storage; the same
//! inputs hash to the same key on any machine and across process runs.
//!
//! Any difference in a step, a parameter value, the step order, or the
//! target unit changes the key. Colliding keys for distinct requests would
//! be a correctness bug, not a performance loss, which is why the descriptor
//! is canonicalized (key-sorted parameters) before hashing.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::descriptor::OperationDescriptor;
use crate::error::GmResult;
use crate::waveform::UnitKind;

/// An opaque cache key derived from a resolved request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps an already-computed hex digest, e.g. one read back from the
    /// cache's record index.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Fingerprint(hex.into())
    }

    /// The hex digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hex digest as bytes, for key-value store keys.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the fingerprint of (record identity, descriptor, target unit).
///
/// The three inputs are separated by NUL bytes so that no concatenation of
/// one input can masquerade as part of another.
pub fn fingerprint(
    record_key: &str,
    descriptor: &OperationDescriptor,
    target: UnitKind,
) -> GmResult<Fingerprint> {
    let mut hasher = Sha256::new();
    hasher.update(record_key.as_bytes());
    hasher.update([0u8]);
    hasher.update(descriptor.canonical_bytes()?);
    hasher.update([0u8]);
    hasher.update(target.tag().as_bytes());
    Ok(Fingerprint(format!("{:x}", hasher.finalize())))
}
