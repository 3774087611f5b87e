//! MetaMask suggested gas fees client

use ethers::types::U256;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{DynamicFeeQuote, Eip1559Fees};

/// Suggested fees for Ethereum mainnet (network id 1)
pub const DEFAULT_GAS_FEES_URL: &str =
    "https://gas-api.metaswap.codefi.network/networks/1/suggestedGasFees";

/// Request timeout, also the feed's refresh period
const FETCH_TIMEOUT: Duration = Duration::from_secs(8);

/// Digits after the decimal point in a gwei amount
const GWEI_DECIMALS: usize = 9;

/// One tier of the suggested-fees response. Values are gwei decimal strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedTier {
    pub suggested_max_priority_fee_per_gas: String,
    pub suggested_max_fee_per_gas: String,
}

/// Suggested-fees response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedGasFees {
    pub low: SuggestedTier,
    pub medium: SuggestedTier,
    pub high: SuggestedTier,
    pub estimated_base_fee: String,
}

impl SuggestedTier {
    fn to_fees(&self) -> Result<Eip1559Fees, String> {
        Ok(Eip1559Fees {
            max_fee_per_gas: parse_gwei(&self.suggested_max_fee_per_gas)?,
            max_priority_fee_per_gas: parse_gwei(&self.suggested_max_priority_fee_per_gas)?,
        })
    }
}

impl SuggestedGasFees {
    /// Convert to wei. low/medium/high map to slow/standard/fast.
    pub fn to_quote(&self) -> Result<DynamicFeeQuote, String> {
        Ok(DynamicFeeQuote {
            slow: self.low.to_fees()?,
            standard: self.medium.to_fees()?,
            fast: self.high.to_fees()?,
            base_fee_per_gas: parse_gwei(&self.estimated_base_fee)?,
        })
    }
}

/// Parse a gwei decimal string ("23.5", "1.000000001") into exact wei.
///
/// Digits past the ninth fractional place are truncated.
pub fn parse_gwei(value: &str) -> Result<U256, String> {
    let value = value.trim();
    let (whole, frac) = match value.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (value, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(format!("Invalid gwei amount: '{}'", value));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("Invalid gwei amount: '{}'", value));
    }

    let whole = if whole.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(whole).map_err(|e| format!("Invalid gwei amount '{}': {}", value, e))?
    };

    let mut frac: String = frac.chars().take(GWEI_DECIMALS).collect();
    while frac.len() < GWEI_DECIMALS {
        frac.push('0');
    }
    let frac = U256::from_dec_str(&frac)
        .map_err(|e| format!("Invalid gwei amount '{}': {}", value, e))?;

    whole
        .checked_mul(U256::exp10(GWEI_DECIMALS))
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| format!("Gwei amount out of range: '{}'", value))
}

/// HTTP client for the suggested-fees endpoint
pub struct SuggestedFeesClient {
    client: Client,
    url: String,
}

impl SuggestedFeesClient {
    pub fn new(url: &str) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub async fn fetch(&self) -> Result<DynamicFeeQuote, String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| format!("Suggested fees request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "Suggested fees request returned {}",
                response.status()
            ));
        }

        let body: SuggestedGasFees = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse suggested fees: {}", e))?;

        body.to_quote()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gwei() {
        assert_eq!(parse_gwei("30").unwrap(), U256::from(30_000_000_000u64));
        assert_eq!(parse_gwei("1.5").unwrap(), U256::from(1_500_000_000u64));
        assert_eq!(parse_gwei(" 0.000000001 ").unwrap(), U256::from(1u64));
        assert_eq!(parse_gwei(".25").unwrap(), U256::from(250_000_000u64));
        assert_eq!(parse_gwei("12.").unwrap(), U256::from(12_000_000_000u64));
    }

    #[test]
    fn test_parse_gwei_truncates_extra_digits() {
        assert_eq!(
            parse_gwei("2.1234567899").unwrap(),
            U256::from(2_123_456_789u64)
        );
    }

    #[test]
    fn test_parse_gwei_rejects_garbage() {
        assert!(parse_gwei("").is_err());
        assert!(parse_gwei(".").is_err());
        assert!(parse_gwei("-1").is_err());
        assert!(parse_gwei("1e9").is_err());
        assert!(parse_gwei("1.2.3").is_err());
    }

    #[test]
    fn test_response_to_quote() {
        let body = r#"{
            "low": {
                "suggestedMaxPriorityFeePerGas": "0.05",
                "suggestedMaxFeePerGas": "24.086058416",
                "minWaitTimeEstimate": 15000,
                "maxWaitTimeEstimate": 30000
            },
            "medium": {
                "suggestedMaxPriorityFeePerGas": "0.1",
                "suggestedMaxFeePerGas": "32.548059594",
                "minWaitTimeEstimate": 15000,
                "maxWaitTimeEstimate": 45000
            },
            "high": {
                "suggestedMaxPriorityFeePerGas": "0.3",
                "suggestedMaxFeePerGas": "41.161290651",
                "minWaitTimeEstimate": 15000,
                "maxWaitTimeEstimate": 60000
            },
            "estimatedBaseFee": "24.036058416",
            "networkCongestion": 0.7143
        }"#;

        let fees: SuggestedGasFees = serde_json::from_str(body).unwrap();
        let quote = fees.to_quote().unwrap();

        assert_eq!(quote.standard.max_fee_per_gas, U256::from(32_548_059_594u64));
        assert_eq!(quote.standard.max_priority_fee_per_gas, U256::from(100_000_000u64));
        assert_eq!(quote.slow.max_priority_fee_per_gas, U256::from(50_000_000u64));
        assert_eq!(quote.fast.max_fee_per_gas, U256::from(41_161_290_651u64));
        assert_eq!(quote.base_fee_per_gas, U256::from(24_036_058_416u64));
    }
}
