//! Vested ADEL rewards claiming
//!
//! Merkle proofs are published as static JSON: the latest snapshot date, an
//! account-to-index map for that date, and one proofs file per index. Keys
//! are account addresses in arbitrary letter case.

use ethers::types::{Address, TransactionReceipt, H256, U256};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{abi, known_address, ProtocolError};
use crate::domain_types::{parse_address, DomainUint256};
use crate::ledger::MutatingCall;
use crate::tx_queue::{TransactionQueue, TxError};

pub const REWARDS_CLAIMING_ADDRESS: &str = "0x0EB87250ce2C66a66269E09c3A7FCB7AebdB7Bb6";

pub const DEFAULT_PROOFS_URL: &str =
    "https://akropolisio.github.io/rewards-claiming-merkle-proofs/";

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Rewards snapshot for one account
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    /// Total amount the account may claim
    pub total: DomainUint256,
    /// Per-product breakdown (delphi, dex, sparta)
    #[serde(default)]
    pub balances: HashMap<String, DomainUint256>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimingProofs {
    pub snapshot: Snapshot,
    pub merkle_index: u64,
    pub merkle_proofs: Vec<H256>,
}

/// Take the entry keyed by `account`, comparing addresses rather than strings
fn take_account_entry<T>(entries: HashMap<String, T>, account: Address) -> Option<T> {
    entries
        .into_iter()
        .find(|(key, _)| parse_address(key).map(|a| a == account).unwrap_or(false))
        .map(|(_, value)| value)
}

pub struct ProofsClient {
    client: Client,
    base_url: String,
}

impl ProofsClient {
    pub fn new(base_url: &str) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/mainnet/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Request to {} failed: {}", url, e))?;

        if !response.status().is_success() {
            return Err(format!("{} returned {}", url, response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| format!("Failed to parse {}: {}", url, e))
    }

    /// Date directory of the most recent proofs
    pub async fn last_proofs_date(&self) -> Result<String, String> {
        self.get_json(&self.url("adelLastProofsDate.json")).await
    }

    /// Proofs for `account` from the latest snapshot, `None` if it has no entry
    pub async fn fetch_proofs(&self, account: Address) -> Result<Option<ClaimingProofs>, String> {
        let date = self.last_proofs_date().await?;

        let indexes: HashMap<String, u64> = self
            .get_json(&self.url(&format!("{}/adel/merkleIndexes.json", date)))
            .await?;
        let Some(index) = take_account_entry(indexes, account) else {
            log::debug!("[Rewards] {:?} not in snapshot {}", account, date);
            return Ok(None);
        };

        let proofs: HashMap<String, ClaimingProofs> = self
            .get_json(&self.url(&format!("{}/adel/proofs/{}.json", date, index)))
            .await?;
        Ok(take_account_entry(proofs, account))
    }
}

pub struct RewardsClaiming {
    address: Address,
    proofs: ProofsClient,
    queue: TransactionQueue,
}

impl RewardsClaiming {
    pub fn new(address: Address, proofs: ProofsClient, queue: TransactionQueue) -> Self {
        Self {
            address,
            proofs,
            queue,
        }
    }

    pub fn mainnet(proofs_url: &str, queue: TransactionQueue) -> Result<Self, String> {
        Ok(Self::new(
            known_address(REWARDS_CLAIMING_ADDRESS)?,
            ProofsClient::new(proofs_url)?,
            queue,
        ))
    }

    /// Latest proofs for the connected account
    pub async fn proofs(&self) -> Result<Option<ClaimingProofs>, ProtocolError> {
        let account = self
            .queue
            .current_account()
            .ok_or(ProtocolError::Submission(TxError::NotConnected))?;
        self.proofs
            .fetch_proofs(account)
            .await
            .map_err(ProtocolError::Proofs)
    }

    /// Claim the full snapshot total for the connected account
    pub async fn claim(&self) -> Result<TransactionReceipt, ProtocolError> {
        let proofs = self.proofs().await?.ok_or(ProtocolError::NothingToClaim)?;
        self.submit_claim(&proofs).await
    }

    pub async fn submit_claim(
        &self,
        proofs: &ClaimingProofs,
    ) -> Result<TransactionReceipt, ProtocolError> {
        log::info!(
            "[Rewards] Claiming {} with merkle index {}",
            proofs.snapshot.total,
            proofs.merkle_index
        );
        for (product, amount) in &proofs.snapshot.balances {
            log::debug!("[Rewards]   {}: {}", product, amount);
        }
        let data = abi::encode_claim(
            U256::from(proofs.merkle_index),
            *proofs.snapshot.total,
            &proofs.merkle_proofs,
        );
        Ok(self.queue.submit(MutatingCall::new(self.address, data)).await?)
    }
}
