//! Compact 16-byte form of the canonical 36-character item identifier.
//!
//! The registry keys on this form: it is less than half the size of the text
//! and compares/hashes as a plain byte array.

use std::fmt;
use uuid::Uuid;

/// Length of the canonical hyphenated identifier (8-4-4-4-12).
pub const CANONICAL_LEN: usize = 36;

/// Returned when text is not a canonical hyphenated identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identifier {0:?}")]
pub struct InvalidIdentifier(pub String);

/// 16-byte representation of a 36-character identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompactId([u8; 16]);

impl CompactId {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Decode the hex groups of a canonical identifier, case-insensitively.
    ///
    /// Only the hyphenated 36-character layout is accepted; braced, URN and
    /// hyphen-less spellings are rejected.
    pub fn parse(text: &str) -> Result<Self, InvalidIdentifier> {
        if text.len() != CANONICAL_LEN {
            return Err(InvalidIdentifier(text.to_string()));
        }
        Uuid::try_parse(text)
            .map(|uuid| Self(uuid.into_bytes()))
            .map_err(|_| InvalidIdentifier(text.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for CompactId {
    /// Writes the lower-case canonical form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Uuid::from_bytes(self.0).hyphenated(), f)
    }
}

impl std::str::FromStr for CompactId {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
