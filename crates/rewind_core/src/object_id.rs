//! Object identification and canonical envelope format.

use crate::error::{Result, RewindError};
use std::fmt;

/// A 32-byte BLAKE3 content hash identifying a blob in the local store.
///
/// The same bytes always produce the same ObjectId, so recording the same
/// file content twice is free.
///
/// # Examples
///
/// ```
/// use rewind_core::ObjectId;
///
/// let id = ObjectId::from_bytes([0xab; 32]);
/// assert_eq!(id.as_hex().len(), 64);
/// assert_eq!(id.shard(), "ab");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    /// The length of an ObjectId as a hex string.
    pub const HEX_LEN: usize = 64;

    /// Creates an ObjectId from raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns a reference to the underlying 32-byte BLAKE3 hash.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns this ObjectId as a lowercase hex string.
    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the shard prefix (first 2 hex characters).
    ///
    /// Objects live at `.rewind/objects/{shard}/{full_hex}`.
    pub fn shard(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// Parses an ObjectId from a hex string.
    ///
    /// # Errors
    ///
    /// Returns `RewindError::InvalidHex` if the string is not valid hex
    /// or is not exactly 64 characters long.
    ///
    /// # Examples
    ///
    /// ```
    /// use rewind_core::ObjectId;
    ///
    /// let hex = "a".repeat(64);
    /// let id = ObjectId::from_hex(&hex).unwrap();
    /// assert_eq!(id.as_hex(), hex);
    /// ```
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != Self::HEX_LEN {
            return Err(RewindError::InvalidHex(format!(
                "expected {} hex chars, got {}",
                Self::HEX_LEN,
                s.len()
            )));
        }

        let bytes = hex::decode(s).map_err(|e| RewindError::InvalidHex(e.to_string()))?;

        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| RewindError::InvalidHex("invalid length".to_string()))?;

        Ok(Self(arr))
    }

    /// Computes the ObjectId for raw blob bytes.
    pub(crate) fn hash_blob(data: &[u8]) -> Self {
        let canonical = canonical_bytes(data);
        Self::from_bytes(*blake3::hash(&canonical).as_bytes())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}...)", &self.as_hex()[..12])
    }
}

/// Canonical envelope magic bytes.
pub(crate) const MAGIC: &[u8; 5] = b"RWND1";

/// Envelope kind byte for blobs. Only blobs are stored.
pub(crate) const BLOB_KIND: u8 = 1;

/// Size of the envelope header: magic, kind, payload length.
pub(crate) const HEADER_LEN: usize = 5 + 1 + 8;

/// Constructs canonical bytes for hashing.
///
/// Format:
/// - Magic: "RWND1" (5 bytes)
/// - Kind: u8 (1 byte)
/// - Length: u64 LE (8 bytes)
/// - Payload: variable bytes
pub(crate) fn canonical_bytes(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.push(BLOB_KIND);
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(payload);
    out
}
