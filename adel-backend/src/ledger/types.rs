//! Ledger-facing data types

use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// A replayable ledger mutation: target, calldata and value.
///
/// Fee fields are deliberately absent; they are attached per attempt as
/// [`FeeParams`], so the same call can be sent with either pricing strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutatingCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl MutatingCall {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
            value: U256::zero(),
        }
    }

    /// First four bytes of calldata, if present
    #[cfg(test)]
    pub fn selector(&self) -> Option<[u8; 4]> {
        let data = self.data.as_ref();
        if data.len() < 4 {
            return None;
        }
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[..4]);
        Some(selector)
    }
}

/// Pricing strategy used for a send attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeeStrategy {
    /// EIP-1559 max fee / priority fee
    Dynamic,
    /// Single gas price
    Legacy,
}

/// Fee parameters attached to a [`MutatingCall`] at send time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeParams {
    Dynamic {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
    Legacy {
        gas_price: U256,
    },
}

impl FeeParams {
    pub fn strategy(&self) -> FeeStrategy {
        match self {
            FeeParams::Dynamic { .. } => FeeStrategy::Dynamic,
            FeeParams::Legacy { .. } => FeeStrategy::Legacy,
        }
    }
}

/// Progress reported by a send attempt
#[derive(Debug, Clone)]
pub enum SendEvent {
    /// Accepted into the pending pool
    Acknowledged(H256),
    /// Mined with a successful status
    Confirmed(TransactionReceipt),
    /// Rejected, reverted, dropped, or otherwise failed
    Failed(LedgerError),
}

/// Stream of events for one send attempt. Ends after a terminal event.
pub type SendEvents = mpsc::UnboundedReceiver<SendEvent>;

/// Structured failure classes reported by the ledger layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LedgerErrorKind {
    /// The node or wallet does not accept the attached fee scheme
    UnsupportedFeeScheme,
    /// The signer refused the request
    Rejected,
    /// Execution reverted
    Reverted,
    /// The transaction disappeared from the pending pool
    Dropped,
    /// Network or provider failure
    Transport,
    Other,
}

/// Error from a ledger interaction, classified once at the adapter boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerError {
    pub kind: LedgerErrorKind,
    pub message: String,
}

impl LedgerError {
    pub fn new(kind: LedgerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unsupported_fee_scheme(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::UnsupportedFeeScheme, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::Transport, message)
    }

    pub fn is_unsupported_fee_scheme(&self) -> bool {
        self.kind == LedgerErrorKind::UnsupportedFeeScheme
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for LedgerError {}

/// Failure of a simulated (non-committing) call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// The node executed the call and it reverted, or the result is unusable
    Reverted(String),
    /// The node could not be reached or answered with a transport error
    Transport(String),
    /// Inputs outside the representable range
    InvalidInput(String),
}

impl SimulationError {
    /// Whether the failure says something about the proposed input, rather
    /// than about the connection to the node
    pub fn is_infeasible(&self) -> bool {
        !matches!(self, SimulationError::Transport(_))
    }
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Reverted(msg) => write!(f, "simulation reverted: {}", msg),
            SimulationError::Transport(msg) => write!(f, "simulation transport error: {}", msg),
            SimulationError::InvalidInput(msg) => write!(f, "invalid simulation input: {}", msg),
        }
    }
}

impl std::error::Error for SimulationError {}
