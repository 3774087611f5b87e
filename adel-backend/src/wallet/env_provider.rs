//! Environment-based wallet
//!
//! Loads the signing key from WALLET_PRIVATE_KEY at startup.

use ethers::core::k256::ecdsa::SigningKey;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;

use super::AccountSource;
use crate::config::env_vars;

/// Local signing key, always connected
pub struct EnvWalletProvider {
    wallet: LocalWallet,
}

impl EnvWalletProvider {
    /// Requires: WALLET_PRIVATE_KEY
    pub fn from_env() -> Result<Self, String> {
        let private_key = std::env::var(env_vars::WALLET_PRIVATE_KEY)
            .map_err(|_| format!("{} not set", env_vars::WALLET_PRIVATE_KEY))?;

        Self::from_private_key(&private_key)
    }

    /// Parse a hex private key, with or without the 0x prefix
    pub fn from_private_key(private_key: &str) -> Result<Self, String> {
        let key_hex = private_key.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let key_bytes =
            hex::decode(key_hex).map_err(|e| format!("Invalid private key hex: {}", e))?;
        if key_bytes.len() != 32 {
            return Err(format!(
                "Invalid private key: expected 32 bytes, got {}",
                key_bytes.len()
            ));
        }

        let signing_key = SigningKey::from_bytes(key_bytes.as_slice().into())
            .map_err(|e| format!("Invalid private key: {}", e))?;

        Ok(Self {
            wallet: LocalWallet::from(signing_key),
        })
    }

    /// Signer for the ledger adapter
    pub fn wallet(&self) -> LocalWallet {
        self.wallet.clone()
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }
}

impl AccountSource for EnvWalletProvider {
    fn current_account(&self) -> Option<Address> {
        Some(self.wallet.address())
    }
}
