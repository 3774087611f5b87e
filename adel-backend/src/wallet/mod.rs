//! Connected Account
//!
//! The submission pipeline asks an [`AccountSource`] which account is active
//! each time a call is enqueued. `None` means no wallet is connected and the
//! submission fails without touching the ledger.
//!
//! The standard source is [`EnvWalletProvider`], a local key loaded from
//! `WALLET_PRIVATE_KEY`.

mod env_provider;

pub use env_provider::EnvWalletProvider;

use ethers::types::Address;

/// Source of the currently connected account
pub trait AccountSource: Send + Sync {
    fn current_account(&self) -> Option<Address>;
}
