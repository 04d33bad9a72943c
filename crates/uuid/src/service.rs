//! Internal implementation of the identifier types.

use crate::{UuidError, UuidResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Stash's canonical UUID representation (32 lowercase hex characters, no hyphens).
///
/// Once constructed, the contained UUID is guaranteed to be canonical, so callers can use it to
/// build storage paths and compare identifiers without re-validating.
///
/// # Construction
/// - [`ShardableUuid::new`] generates a fresh identifier for a new record.
/// - [`ShardableUuid::parse`] validates an externally supplied identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardableUuid(Uuid);

impl Default for ShardableUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardableUuid {
    /// Generates a new random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be canonical.
    ///
    /// Hyphenated or uppercase forms are **not** normalised; they are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "UUID must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("invalid UUID '{}': {}", input, e)))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical form.
    ///
    /// Purely syntactic: exactly 32 bytes, each one of `0-9` or `a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<uuid>` where `s1`/`s2` are the first four hex characters.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl fmt::Display for ShardableUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for ShardableUuid {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShardableUuid::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ShardableUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ShardableUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ShardableUuid::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A SHA-256 digest in lowercase hexadecimal (64 characters).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Builds the hex form of a raw 32-byte digest.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Validates a hex digest string.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] unless `input` is 64 lowercase hex characters.
    pub fn parse(input: &str) -> UuidResult<Self> {
        let valid = input.len() == 64
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !valid {
            return Err(UuidError::InvalidInput(format!(
                "SHA-256 hash must be 64 lowercase hex characters, got: '{}'",
                input
            )));
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Sha256Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Sha256Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Sha256Hash::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_canonical_uuid() {
        let id = ShardableUuid::new();
        let canonical = id.to_string();

        assert_eq!(canonical.len(), 32);
        assert!(ShardableUuid::is_canonical(&canonical));
    }

    #[test]
    fn test_parse_valid_canonical_uuid() {
        let canonical = "550e8400e29b41d4a716446655440000";
        let id = ShardableUuid::parse(canonical).unwrap();

        assert_eq!(id.to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_hyphenated_uuid() {
        let result = ShardableUuid::parse("550e8400-e29b-41d4-a716-446655440000");

        match result {
            Err(UuidError::InvalidInput(msg)) => {
                assert!(msg.contains("32 lowercase hex characters"));
            }
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_parse_rejects_non_canonical_forms() {
        assert!(ShardableUuid::parse("550E8400E29B41D4A716446655440000").is_err());
        assert!(ShardableUuid::parse("550e8400e29b41d4a71644665544000").is_err());
        assert!(ShardableUuid::parse("550e8400e29b41d4a7164466554400000").is_err());
        assert!(ShardableUuid::parse("550e8400e29b41d4a716446655440zzz").is_err());
        assert!(ShardableUuid::parse("").is_err());
    }

    #[test]
    fn test_sharded_dir_structure() {
        let id = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        let dir = id.sharded_dir(Path::new("/var/lib/stash/blobs"));

        assert_eq!(
            dir,
            PathBuf::from("/var/lib/stash/blobs/55/0e/550e8400e29b41d4a716446655440000")
        );
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let back: ShardableUuid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let bad: Result<ShardableUuid, _> =
            serde_json::from_str("\"550e8400-e29b-41d4-a716-446655440000\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_sha256_hash_parse() {
        let digest = Sha256Hash::from_bytes(&[0xab; 32]);
        assert_eq!(digest.as_str().len(), 64);
        assert!(digest.as_str().starts_with("abab"));

        assert!(Sha256Hash::parse(digest.as_str()).is_ok());
        assert!(Sha256Hash::parse("abc").is_err());
        assert!(Sha256Hash::parse(&"AB".repeat(32)).is_err());
    }
}
