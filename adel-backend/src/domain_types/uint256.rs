//! DomainUint256 - token amounts as they appear in JSON and on the command line
//!
//! Accepts decimal strings ("1500000000000000000"), 0x-prefixed hex strings
//! and JSON integers. `U256::from_str` reads every string as hex, so decimal
//! text must go through `from_dec_str` instead.

use ethers::types::U256;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct DomainUint256(pub U256);

/// Parse a decimal or 0x-hex amount
pub fn parse_uint256(value: &str) -> Result<U256, String> {
    let value = value.trim().trim_matches('"');
    if value.is_empty() {
        return Err("empty amount".to_string());
    }

    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(digits) => U256::from_str_radix(digits, 16)
            .map_err(|e| format!("invalid hex amount '{}': {}", value, e)),
        None => U256::from_dec_str(value)
            .map_err(|e| format!("invalid decimal amount '{}': {}", value, e)),
    }
}

impl FromStr for DomainUint256 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_uint256(s).map(Self)
    }
}

impl fmt::Display for DomainUint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for DomainUint256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for DomainUint256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = DomainUint256;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a non-negative integer or a decimal/hex amount string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                parse_uint256(value).map(DomainUint256).map_err(de::Error::custom)
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(DomainUint256(U256::from(value)))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(value)
                    .map(|v| DomainUint256(U256::from(v)))
                    .map_err(|_| de::Error::custom("negative amount"))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

impl From<U256> for DomainUint256 {
    fn from(input: U256) -> Self {
        Self(input)
    }
}

impl From<DomainUint256> for U256 {
    fn from(input: DomainUint256) -> Self {
        input.0
    }
}

impl std::ops::Deref for DomainUint256 {
    type Target = U256;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
