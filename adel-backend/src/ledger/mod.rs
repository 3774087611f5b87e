//! Ledger Access
//!
//! The only seam through which this crate talks to the chain:
//!
//! - `current_network_id` gates submissions to mainnet
//! - `send` signs and broadcasts a [`MutatingCall`] with the given fees and
//!   reports progress as a stream of [`SendEvent`]s
//! - `simulate` executes a call without committing (`eth_call`)
//!
//! Errors are classified into [`LedgerErrorKind`] by the adapter so callers
//! never inspect message text.

mod ethers_ledger;
mod types;

pub use ethers_ledger::EthersLedger;
pub use types::{
    FeeParams, FeeStrategy, LedgerError, LedgerErrorKind, MutatingCall, SendEvent, SendEvents,
    SimulationError,
};

use async_trait::async_trait;
use ethers::types::{Address, Bytes};

/// Chain access used by the submission pipeline and the protocol modules
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Chain id of the connected network
    async fn current_network_id(&self) -> Result<u64, LedgerError>;

    /// Send `call` from `from` priced with `fees`.
    ///
    /// An `Err` means the attempt could not be built and nothing reached the
    /// network. Once `Ok`, every later failure arrives as [`SendEvent::Failed`].
    async fn send(
        &self,
        call: &MutatingCall,
        fees: FeeParams,
        from: Address,
    ) -> Result<SendEvents, LedgerError>;

    /// Execute `call` against current state without committing it
    async fn simulate(&self, call: &MutatingCall, from: Address) -> Result<Bytes, SimulationError>;
}
