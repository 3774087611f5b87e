//! vAKRO: unlock vested AKRO and redeem it

use ethers::types::{Address, TransactionReceipt, U256};
use std::sync::Arc;

use super::{abi, known_address, read_uint256, ProtocolError};
use crate::ledger::{Ledger, MutatingCall, SimulationError};
use crate::tx_queue::{TransactionQueue, TxError};

pub const VAKRO_TOKEN_ADDRESS: &str = "0x5593143eAE5000983bB015b2E0AC35C125B3376C";

pub struct VestedAkro {
    address: Address,
    ledger: Arc<dyn Ledger>,
    queue: TransactionQueue,
}

impl VestedAkro {
    pub fn new(address: Address, ledger: Arc<dyn Ledger>, queue: TransactionQueue) -> Self {
        Self {
            address,
            ledger,
            queue,
        }
    }

    pub fn mainnet(ledger: Arc<dyn Ledger>, queue: TransactionQueue) -> Result<Self, String> {
        Ok(Self::new(known_address(VAKRO_TOKEN_ADDRESS)?, ledger, queue))
    }

    /// AKRO that `unlockAndRedeemAll` would pay `account` right now
    pub async fn available_to_claim(&self, account: Address) -> Result<U256, SimulationError> {
        read_uint256(
            &self.ledger,
            self.address,
            abi::encode_unlock_and_redeem_all(),
            account,
        )
        .await
    }

    pub async fn claim(&self) -> Result<TransactionReceipt, ProtocolError> {
        let account = self
            .queue
            .current_account()
            .ok_or(ProtocolError::Submission(TxError::NotConnected))?;
        let available = self.available_to_claim(account).await?;
        if available.is_zero() {
            return Err(ProtocolError::NothingToClaim);
        }

        log::info!("[Rewards] Redeeming {} unlocked vAKRO", available);
        let call = MutatingCall::new(self.address, abi::encode_unlock_and_redeem_all());
        Ok(self.queue.submit(call).await?)
    }
}
