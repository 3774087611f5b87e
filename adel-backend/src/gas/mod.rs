//! Gas Price Feeds
//!
//! Two kinds of fee quotes feed the submission pipeline:
//!
//! - **Dynamic** (EIP-1559): slow / standard / fast tiers of max fee and
//!   priority fee, from the MetaMask suggested-fees API
//! - **Legacy**: a single gas price, read from the node
//!
//! Snapshots are immutable and refreshed on a fixed interval by [`GasPriceFeed`].

mod feed;
mod suggested_fees;

pub use feed::GasPriceFeed;
pub use suggested_fees::DEFAULT_GAS_FEES_URL;

use async_trait::async_trait;
use ethers::types::U256;

use crate::ledger::FeeParams;

/// One EIP-1559 pricing tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eip1559Fees {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// Dynamic-fee quote snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicFeeQuote {
    pub slow: Eip1559Fees,
    pub standard: Eip1559Fees,
    pub fast: Eip1559Fees,
    pub base_fee_per_gas: U256,
}

/// Legacy single-price quote snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyFeeQuote {
    pub gas_price: U256,
}

impl From<Eip1559Fees> for FeeParams {
    fn from(fees: Eip1559Fees) -> Self {
        FeeParams::Dynamic {
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
        }
    }
}

impl From<LegacyFeeQuote> for FeeParams {
    fn from(quote: LegacyFeeQuote) -> Self {
        FeeParams::Legacy {
            gas_price: quote.gas_price,
        }
    }
}

/// Source of fee quotes, read once per send attempt
#[async_trait]
pub trait FeeQuoteSource: Send + Sync {
    async fn dynamic_fee_quote(&self) -> Result<DynamicFeeQuote, String>;

    async fn legacy_fee_quote(&self) -> Result<LegacyFeeQuote, String>;
}

/// Format a wei amount as gwei for logs
pub fn format_gwei(wei: U256) -> String {
    let gwei = U256::exp10(9);
    let whole = wei / gwei;
    let frac = wei % gwei;
    if frac.is_zero() {
        format!("{} gwei", whole)
    } else {
        let frac = format!("{:09}", frac.as_u64());
        format!("{}.{} gwei", whole, frac.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_params_from_quotes() {
        let tier = Eip1559Fees {
            max_fee_per_gas: U256::from(50_000_000_000u64),
            max_priority_fee_per_gas: U256::from(1_000_000_000u64),
        };
        assert_eq!(
            FeeParams::from(tier),
            FeeParams::Dynamic {
                max_fee_per_gas: U256::from(50_000_000_000u64),
                max_priority_fee_per_gas: U256::from(1_000_000_000u64),
            }
        );

        let legacy = LegacyFeeQuote { gas_price: U256::from(42u64) };
        assert_eq!(FeeParams::from(legacy), FeeParams::Legacy { gas_price: U256::from(42u64) });
    }

    #[test]
    fn test_format_gwei() {
        assert_eq!(format_gwei(U256::from(30_000_000_000u64)), "30 gwei");
        assert_eq!(format_gwei(U256::from(1_500_000_000u64)), "1.5 gwei");
        assert_eq!(format_gwei(U256::from(7u64)), "0.000000007 gwei");
    }
}
