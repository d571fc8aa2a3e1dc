//! Fixed-length hexadecimal account addresses.
//!
//! An address is a `0x`-prefixed, 40-hex-digit identifier. Parsing is the
//! only way to construct one, so every `Address` in the system is
//! well-formed; the transfer path relies on this to reject bad recipients
//! before any ledger call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Total length of a well-formed address string, `0x` prefix included.
pub const ADDRESS_LEN: usize = 42;

/// Error returned when an address string fails format validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed address: {0:?}")]
pub struct AddressParseError(pub String);

/// A validated account address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a raw string is a well-formed address.
    pub fn is_well_formed(raw: &str) -> bool {
        raw.len() == ADDRESS_LEN
            && raw.starts_with("0x")
            && raw[2..].bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if Self::is_well_formed(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(AddressParseError(raw.to_string()))
        }
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_address() {
        let raw = "0x1234567890abcdef1234567890ABCDEF12345678";
        let addr: Address = raw.parse().unwrap();
        assert_eq!(addr.as_str(), raw);
    }

    #[test]
    fn test_reject_missing_prefix() {
        let raw = "1234567890abcdef1234567890abcdef123456789a";
        assert!(raw.parse::<Address>().is_err());
    }

    #[test]
    fn test_reject_wrong_length() {
        assert!("0x1234".parse::<Address>().is_err());
        let long = format!("0x{}", "a".repeat(41));
        assert!(long.parse::<Address>().is_err());
    }

    #[test]
    fn test_reject_non_hex() {
        let raw = format!("0x{}", "g".repeat(40));
        assert!(raw.parse::<Address>().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let addr: Address = format!("0x{}", "ab".repeat(20)).parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }

    #[test]
    fn test_serde_rejects_malformed() {
        let result: Result<Address, _> = serde_json::from_str("\"0xnope\"");
        assert!(result.is_err());
    }
}
