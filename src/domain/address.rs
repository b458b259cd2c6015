use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 20-byte EVM address, always rendered and compared in lowercase hex.
///
/// Storage and wire format is `0x` + 40 lowercase hex chars. The invariant
/// (lowercase, unique) is enforced once here instead of at every call site
/// that touches `contracts.address` or `transaction_details.wallet_address`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(alloy_primitives::Address);

#[derive(Debug, Error)]
pub enum AddressParseError {
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must be 40 hex characters, got {0}")]
    WrongLength(usize),
    #[error("address contains non-hex characters")]
    InvalidHex,
}

impl Address {
    pub fn parse(s: &str) -> Result<Self, AddressParseError> {
        let stripped = s.strip_prefix("0x").ok_or(AddressParseError::MissingPrefix)?;
        if stripped.len() != 40 {
            return Err(AddressParseError::WrongLength(stripped.len()));
        }
        if !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressParseError::InvalidHex);
        }
        let inner = alloy_primitives::Address::from_str(s).map_err(|_| AddressParseError::InvalidHex)?;
        Ok(Self(inner))
    }

    pub fn inner(&self) -> alloy_primitives::Address {
        self.0
    }

    /// Canonical `0x`-prefixed, lowercase, 40-hex-char representation.
    pub fn as_lowercase(&self) -> String {
        format!("0x{:x}", self.0)
    }
}

impl From<alloy_primitives::Address> for Address {
    fn from(inner: alloy_primitives::Address) -> Self {
        Self(inner)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_lowercase())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.as_lowercase())
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.as_lowercase())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_lowercase() {
        let a = Address::parse("0xAbCdEf0123456789aBcDef0123456789ABCDEF01").unwrap();
        assert_eq!(a.as_lowercase(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(matches!(
            Address::parse("abcdef0123456789abcdef0123456789abcdef01"),
            Err(AddressParseError::MissingPrefix)
        ));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            Address::parse("0xabcdef"),
            Err(AddressParseError::WrongLength(_))
        ));
    }

    #[test]
    fn rejects_non_hex() {
        assert!(matches!(
            Address::parse("0xZZcdef0123456789abcdef0123456789abcdef01"),
            Err(AddressParseError::InvalidHex)
        ));
    }

    #[test]
    fn case_insensitive_equality_after_parse() {
        let a = Address::parse("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        let b = Address::parse("0xABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
        assert_eq!(a, b);
    }
}
