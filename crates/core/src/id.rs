//! Unique identifiers for shipments.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use ulid::Ulid;

/// Public shipment identifier, e.g. `SH1729252000123457`.
///
/// Built from the creation time in unix milliseconds plus a suffix in
/// `0..1000`. Two shipments created in the same millisecond can collide;
/// storage backends reject the duplicate on insert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipmentId(String);

impl ShipmentId {
    /// Generate a new ShipmentId
    pub fn generate() -> Self {
        let seed = Ulid::new();
        Self(format!("SH{}{}", seed.timestamp_ms(), seed.random() % 1000))
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ShipmentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ShipmentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Error returned when a string is not a valid record key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("record key must be 24 hexadecimal characters, got '{0}'")]
pub struct KeyError(pub String);

/// Storage-native record key: 24 lowercase hexadecimal characters.
///
/// The first six bytes carry the creation timestamp, so keys sort roughly
/// by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordKey(String);

impl RecordKey {
    /// Generate a new RecordKey
    pub fn new() -> Self {
        let bytes = Ulid::new().to_bytes();
        let hex = bytes[..12].iter().map(|b| format!("{:02x}", b)).collect();
        Self(hex)
    }

    /// Whether `s` has the shape of a record key (`^[0-9a-fA-F]{24}$`).
    pub fn looks_like(s: &str) -> bool {
        static PATTERN: OnceLock<Option<regex::Regex>> = OnceLock::new();
        PATTERN
            .get_or_init(|| regex::Regex::new(r"^[0-9a-fA-F]{24}$").ok())
            .as_ref()
            .is_some_and(|re| re.is_match(s))
    }

    /// Borrow the key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for RecordKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::looks_like(s) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(KeyError(s.to_string()))
        }
    }
}

impl TryFrom<String> for RecordKey {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RecordKey> for String {
    fn from(key: RecordKey) -> Self {
        key.0
    }
}
