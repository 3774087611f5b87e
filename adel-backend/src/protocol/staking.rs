//! ADEL staking pool

use ethers::types::{Address, TransactionReceipt, U256};
use std::sync::Arc;

use super::{abi, known_address, read_uint256, ProtocolError};
use crate::ledger::{Ledger, MutatingCall, SimulationError};
use crate::tx_queue::{TransactionQueue, TxError};

pub const ADEL_STAKING_POOL_ADDRESS: &str = "0x1a547c3dd03c39fb2b5aeafc524033879bd28f13";
pub const ADEL_TOKEN_ADDRESS: &str = "0x94d863173EE77439E4292284fF13fAD54b3BA182";

pub struct StakingPool {
    address: Address,
    deposit_token: Address,
    ledger: Arc<dyn Ledger>,
    queue: TransactionQueue,
}

impl StakingPool {
    pub fn new(
        address: Address,
        deposit_token: Address,
        ledger: Arc<dyn Ledger>,
        queue: TransactionQueue,
    ) -> Self {
        Self {
            address,
            deposit_token,
            ledger,
            queue,
        }
    }

    /// The ADEL staking pool on mainnet
    pub fn adel(ledger: Arc<dyn Ledger>, queue: TransactionQueue) -> Result<Self, String> {
        Ok(Self::new(
            known_address(ADEL_STAKING_POOL_ADDRESS)?,
            known_address(ADEL_TOKEN_ADDRESS)?,
            ledger,
            queue,
        ))
    }

    fn connected_account(&self) -> Result<Address, ProtocolError> {
        self.queue
            .current_account()
            .ok_or(ProtocolError::Submission(TxError::NotConnected))
    }

    /// Deposit token allowance granted by `owner` to the pool
    pub async fn allowance(&self, owner: Address) -> Result<U256, SimulationError> {
        read_uint256(
            &self.ledger,
            self.deposit_token,
            abi::encode_allowance(owner, self.address),
            owner,
        )
        .await
    }

    /// Amount `unstakeAllUnlocked` would return to `account` right now
    pub async fn unlocked_balance(&self, account: Address) -> Result<U256, SimulationError> {
        read_uint256(
            &self.ledger,
            self.address,
            abi::encode_unstake_all_unlocked(),
            account,
        )
        .await
    }

    /// Stake `amount`, approving the pool first when the allowance is short.
    ///
    /// The approval must be mined before `stake` can be estimated, so the two
    /// submissions run one after the other.
    pub async fn stake(&self, amount: U256) -> Result<TransactionReceipt, ProtocolError> {
        let owner = self.connected_account()?;
        let allowance = self.allowance(owner).await?;

        if allowance < amount {
            log::info!(
                "[Staking] Allowance {} below {}, approving pool {:?}",
                allowance,
                amount,
                self.address
            );
            let approve = MutatingCall::new(
                self.deposit_token,
                abi::encode_approve(self.address, amount),
            );
            self.queue.submit(approve).await?;
        }

        let stake = MutatingCall::new(self.address, abi::encode_stake(amount));
        Ok(self.queue.submit(stake).await?)
    }

    pub async fn unstake_all_unlocked(&self) -> Result<TransactionReceipt, ProtocolError> {
        let account = self.connected_account()?;
        let unlocked = self.unlocked_balance(account).await?;
        if unlocked.is_zero() {
            return Err(ProtocolError::NothingToWithdraw);
        }

        log::info!("[Staking] Unstaking {} unlocked from {:?}", unlocked, self.address);
        let call = MutatingCall::new(self.address, abi::encode_unstake_all_unlocked());
        Ok(self.queue.submit(call).await?)
    }
}
