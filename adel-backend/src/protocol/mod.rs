//! Protocol Modules
//!
//! Contract-level operations for the savings module, the ADEL staking pool,
//! reward withdrawal and vested rewards claiming. Reads go through `Ledger::simulate`; every
//! mutation is built as a [`MutatingCall`](crate::ledger::MutatingCall) and
//! handed to the [`TransactionQueue`](crate::tx_queue::TransactionQueue).

pub mod abi;
mod distribution;
mod rewards;
mod savings;
mod staking;
mod vested_akro;

pub use distribution::{parse_pool_reward, PoolReward, RewardDistribution};
pub use rewards::{RewardsClaiming, DEFAULT_PROOFS_URL};
pub use savings::SavingsModule;
pub use staking::StakingPool;
pub use vested_akro::VestedAkro;

use ethers::types::{Address, Bytes, U256};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::ledger::{Ledger, MutatingCall, SimulationError};
use crate::tx_queue::TxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    Simulation(SimulationError),
    Submission(TxError),
    /// Merkle proofs could not be fetched or parsed
    Proofs(String),
    /// No rewards snapshot entry, unlocked vAKRO or listed pool reward
    NothingToClaim,
    /// The computed withdrawal amount is zero
    NothingToWithdraw,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Simulation(e) => write!(f, "{}", e),
            ProtocolError::Submission(e) => write!(f, "{}", e),
            ProtocolError::Proofs(msg) => write!(f, "rewards proofs unavailable: {}", msg),
            ProtocolError::NothingToClaim => write!(f, "nothing to claim"),
            ProtocolError::NothingToWithdraw => write!(f, "nothing to withdraw"),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<SimulationError> for ProtocolError {
    fn from(e: SimulationError) -> Self {
        ProtocolError::Simulation(e)
    }
}

impl From<TxError> for ProtocolError {
    fn from(e: TxError) -> Self {
        ProtocolError::Submission(e)
    }
}

/// Parse one of the address constants above
pub(crate) fn known_address(value: &str) -> Result<Address, String> {
    Address::from_str(value).map_err(|e| format!("Invalid contract address {}: {}", value, e))
}

/// `eth_call` `data` on `to` from `from` and decode a uint256 result
pub(crate) async fn read_uint256(
    ledger: &Arc<dyn Ledger>,
    to: Address,
    data: Bytes,
    from: Address,
) -> Result<U256, SimulationError> {
    let output = ledger.simulate(&MutatingCall::new(to, data), from).await?;
    abi::decode_uint256(&output).map_err(SimulationError::Reverted)
}
