//! Serde and CLI wrappers for chain values
//!
//! Amounts and addresses arrive as JSON from the rewards proofs host and as
//! command-line arguments; both go through these types.

pub mod eth_address;
pub mod uint256;

pub use eth_address::{parse_address, DomainEthAddress};
pub use uint256::{parse_uint256, DomainUint256};
