//! Cached gas price feed combining the suggested-fees API and the node

use async_trait::async_trait;
use ethers::prelude::{Http, Middleware, Provider};
use moka::sync::Cache;
use std::time::Duration;

use super::suggested_fees::SuggestedFeesClient;
use super::{format_gwei, DynamicFeeQuote, FeeQuoteSource, LegacyFeeQuote};

/// How long a fetched quote is served before it is fetched again
pub const QUOTE_REFRESH_INTERVAL: Duration = Duration::from_secs(8);

const DYNAMIC_KEY: &str = "dynamic";
const LEGACY_KEY: &str = "legacy";

/// Legacy quote from the node's `eth_gasPrice`
pub struct NodeGasPrice {
    provider: Provider<Http>,
}

impl NodeGasPrice {
    pub fn new(provider: Provider<Http>) -> Self {
        Self { provider }
    }

    pub async fn fetch(&self) -> Result<LegacyFeeQuote, String> {
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| format!("eth_gasPrice failed: {}", e))?;
        Ok(LegacyFeeQuote { gas_price })
    }
}

/// Fee quote source used by the transaction queue.
///
/// Each quote kind is a singleton cache entry that expires after
/// [`QUOTE_REFRESH_INTERVAL`], so attempts inside one interval share a fetch.
pub struct GasPriceFeed {
    suggested: SuggestedFeesClient,
    node: NodeGasPrice,
    dynamic: Cache<&'static str, DynamicFeeQuote>,
    legacy: Cache<&'static str, LegacyFeeQuote>,
}

impl GasPriceFeed {
    pub fn new(gas_fees_url: &str, provider: Provider<Http>) -> Result<Self, String> {
        Ok(Self {
            suggested: SuggestedFeesClient::new(gas_fees_url)?,
            node: NodeGasPrice::new(provider),
            dynamic: Cache::builder()
                .time_to_live(QUOTE_REFRESH_INTERVAL)
                .max_capacity(1)
                .build(),
            legacy: Cache::builder()
                .time_to_live(QUOTE_REFRESH_INTERVAL)
                .max_capacity(1)
                .build(),
        })
    }
}

#[async_trait]
impl FeeQuoteSource for GasPriceFeed {
    async fn dynamic_fee_quote(&self) -> Result<DynamicFeeQuote, String> {
        if let Some(quote) = self.dynamic.get(&DYNAMIC_KEY) {
            return Ok(quote);
        }

        let quote = self.suggested.fetch().await.map_err(|e| {
            log::warn!("[GasFeed] Dynamic fee quote unavailable: {}", e);
            e
        })?;
        log::debug!(
            "[GasFeed] Dynamic quote: standard max fee {}, priority {}, base fee {}",
            format_gwei(quote.standard.max_fee_per_gas),
            format_gwei(quote.standard.max_priority_fee_per_gas),
            format_gwei(quote.base_fee_per_gas)
        );
        self.dynamic.insert(DYNAMIC_KEY, quote);
        Ok(quote)
    }

    async fn legacy_fee_quote(&self) -> Result<LegacyFeeQuote, String> {
        if let Some(quote) = self.legacy.get(&LEGACY_KEY) {
            return Ok(quote);
        }

        let quote = self.node.fetch().await.map_err(|e| {
            log::warn!("[GasFeed] Legacy gas price unavailable: {}", e);
            e
        })?;
        log::debug!("[GasFeed] Legacy quote: {}", format_gwei(quote.gas_price));
        self.legacy.insert(LEGACY_KEY, quote);
        Ok(quote)
    }
}
