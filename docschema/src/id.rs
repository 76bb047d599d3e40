use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use nanoid::nanoid;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Lowercase hex alphabet used for the random tail of generated identifiers.
const HEX_ALPHABET: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
];
/// Number of raw bytes in an object id.
pub const OBJECT_ID_BYTES: usize = 12;
/// Length of the canonical hex rendering.
pub const OBJECT_ID_HEX_LENGTH: usize = OBJECT_ID_BYTES * 2;
/// Hex characters following the 4-byte timestamp prefix.
const TAIL_HEX_LENGTH: usize = OBJECT_ID_HEX_LENGTH - 8;

#[derive(Debug, Error, PartialEq)]
pub enum ObjectIdError {
    #[error("object id must be {OBJECT_ID_HEX_LENGTH} hex characters, got {0}")]
    InvalidLength(usize),
    #[error("object id is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// 12-byte document identifier rendered as 24 lowercase hex characters.
///
/// The first four bytes hold the creation time in seconds (big endian), the rest is random.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_BYTES]);

impl ObjectId {
    /// Generates a new identifier stamped with the current time.
    pub fn new() -> Self {
        let mut bytes = [0u8; OBJECT_ID_BYTES];
        let seconds = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        let tail = nanoid!(TAIL_HEX_LENGTH, HEX_ALPHABET);
        // the alphabet is hex and the length even, so decoding always succeeds
        let _ = hex::decode_to_slice(tail, &mut bytes[4..]);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; OBJECT_ID_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn parse_str(value: &str) -> Result<Self, ObjectIdError> {
        if value.len() != OBJECT_ID_HEX_LENGTH {
            return Err(ObjectIdError::InvalidLength(value.len()));
        }
        let mut bytes = [0u8; OBJECT_ID_BYTES];
        hex::decode_to_slice(value, &mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn bytes(&self) -> [u8; OBJECT_ID_BYTES] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creation time encoded in the leading four bytes.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let seconds = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        DateTime::<Utc>::from_timestamp(i64::from(seconds), 0).unwrap_or_default()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_has_expected_length_and_charset() {
        let id = ObjectId::new().to_hex();
        assert_eq!(id.len(), OBJECT_ID_HEX_LENGTH);
        assert!(id.chars().all(|c| HEX_ALPHABET.contains(&c)));
    }

    #[test]
    fn parses_and_renders_canonical_hex() {
        let id = ObjectId::parse_str("507f1f77bcf86cd799439011").expect("valid id");
        assert_eq!(id.to_string(), "507f1f77bcf86cd799439011");
        assert_eq!(id, "507f1f77bcf86cd799439011".parse().expect("valid id"));
    }

    #[test]
    fn rejects_wrong_length_and_non_hex() {
        assert_eq!(ObjectId::parse_str("507f1f77bc"), Err(ObjectIdError::InvalidLength(10)));
        assert!(matches!(
            ObjectId::parse_str("zz7f1f77bcf86cd799439011"),
            Err(ObjectIdError::InvalidHex(_))
        ));
    }

    #[test]
    fn timestamp_prefix_round_trips() {
        let before = Utc::now().timestamp();
        let id = ObjectId::new();
        let stamped = id.timestamp().timestamp();
        assert!(stamped >= before - 1 && stamped <= Utc::now().timestamp());
    }
}
