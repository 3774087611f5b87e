use std::env;
use std::time::Duration;

use crate::gas::DEFAULT_GAS_FEES_URL;
use crate::protocol::DEFAULT_PROOFS_URL;
use crate::tx_queue::SUBMISSION_GRACE_PERIOD;

/// Environment variable names
pub mod env_vars {
    pub const ETH_RPC_URL: &str = "ETH_RPC_URL";
    pub const WALLET_PRIVATE_KEY: &str = "WALLET_PRIVATE_KEY";
    pub const GAS_FEES_URL: &str = "GAS_FEES_URL";
    pub const REWARDS_PROOFS_URL: &str = "REWARDS_PROOFS_URL";
    pub const SUBMISSION_GRACE_MS: &str = "SUBMISSION_GRACE_MS";
}

#[derive(Clone, Debug)]
pub struct Config {
    pub rpc_url: String,
    pub gas_fees_url: String,
    pub rewards_proofs_url: String,
    pub submission_grace: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any name -> value lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rpc_url = lookup(env_vars::ETH_RPC_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| format!("{} must be set", env_vars::ETH_RPC_URL))?;

        let submission_grace = match lookup(env_vars::SUBMISSION_GRACE_MS) {
            Some(ms) => Duration::from_millis(ms.trim().parse().map_err(|e| {
                format!("{} must be a number of milliseconds: {}", env_vars::SUBMISSION_GRACE_MS, e)
            })?),
            None => SUBMISSION_GRACE_PERIOD,
        };

        Ok(Self {
            rpc_url,
            gas_fees_url: lookup(env_vars::GAS_FEES_URL)
                .unwrap_or_else(|| DEFAULT_GAS_FEES_URL.to_string()),
            rewards_proofs_url: lookup(env_vars::REWARDS_PROOFS_URL)
                .unwrap_or_else(|| DEFAULT_PROOFS_URL.to_string()),
            submission_grace,
        })
    }
}
