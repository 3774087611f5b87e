//! DomainEthAddress - account and contract addresses in JSON and CLI input

use ethers::types::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct DomainEthAddress(pub Address);

/// Parse a 20-byte hex address; the 0x prefix and letter case are optional
pub fn parse_address(value: &str) -> Result<Address, String> {
    let value = value.trim();
    let normalized = match value.strip_prefix("0X") {
        Some(digits) => format!("0x{}", digits),
        None => value.to_string(),
    };
    Address::from_str(&normalized).map_err(|e| format!("invalid address '{}': {}", value, e))
}

impl FromStr for DomainEthAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_address(s).map(Self)
    }
}

impl From<Address> for DomainEthAddress {
    fn from(input: Address) -> Self {
        Self(input)
    }
}

impl From<DomainEthAddress> for Address {
    fn from(input: DomainEthAddress) -> Self {
        input.0
    }
}

impl std::ops::Deref for DomainEthAddress {
    type Target = Address;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for DomainEthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Serialize for DomainEthAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:?}", self.0))
    }
}

impl<'de> Deserialize<'de> for DomainEthAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_address(&s).map(Self).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAVINGS_MODULE: &str = "0x73fC3038B4cD8FfD07482b92a52Ea806505e5748";

    #[test]
    fn test_case_insensitive() {
        let checksummed: DomainEthAddress = SAVINGS_MODULE.parse().unwrap();
        let lower: DomainEthAddress = SAVINGS_MODULE.to_lowercase().parse().unwrap();
        let upper_prefix: DomainEthAddress =
            format!("0X{}", &SAVINGS_MODULE[2..].to_uppercase()).parse().unwrap();
        assert_eq!(checksummed, lower);
        assert_eq!(checksummed, upper_prefix);
    }

    #[test]
    fn test_without_prefix() {
        let bare: DomainEthAddress = SAVINGS_MODULE[2..].parse().unwrap();
        assert_eq!(format!("{}", bare), SAVINGS_MODULE.to_lowercase());
    }

    #[test]
    fn test_json_round_trip_form() {
        let addr: DomainEthAddress =
            serde_json::from_str(&format!(r#""{}""#, SAVINGS_MODULE)).unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!(r#""{}""#, SAVINGS_MODULE.to_lowercase()));
    }

    #[test]
    fn test_invalid() {
        assert!("0xinvalid".parse::<DomainEthAddress>().is_err());
        assert!("0x73fc3038".parse::<DomainEthAddress>().is_err());
        assert!(serde_json::from_str::<DomainEthAddress>("12").is_err());
    }

    #[test]
    fn test_parse_address_length_and_whitespace() {
        let padded = format!("  {}\n", SAVINGS_MODULE);
        assert_eq!(
            parse_address(&padded).unwrap(),
            Address::from_str(SAVINGS_MODULE).unwrap()
        );
        // 21 bytes
        let long = format!("{}ff", SAVINGS_MODULE);
        assert!(parse_address(&long).is_err());
        assert!(parse_address("").is_err());
    }
}
