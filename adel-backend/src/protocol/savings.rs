//! Savings module: withdraw fee simulation, max withdraw and withdrawals

use ethers::types::{Address, TransactionReceipt, I256, U256};
use std::sync::Arc;

use super::{abi, known_address, read_uint256, ProtocolError};
use crate::ledger::{Ledger, MutatingCall, SimulationError};
use crate::tx_queue::{TransactionQueue, TxError};
use crate::withdraw::{max_withdraw, WithdrawFeeCache, WithdrawFeeKey};

/// Delphi savings module on mainnet
pub const SAVINGS_MODULE_ADDRESS: &str = "0x73fC3038B4cD8FfD07482b92a52Ea806505e5748";

/// A deposit token of a savings pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolToken {
    pub address: Address,
    pub decimals: u32,
}

pub struct SavingsModule {
    address: Address,
    ledger: Arc<dyn Ledger>,
    queue: TransactionQueue,
    fees: WithdrawFeeCache,
}

fn signed(value: U256) -> Result<I256, SimulationError> {
    I256::try_from(value)
        .map_err(|_| SimulationError::InvalidInput(format!("{} exceeds the signed range", value)))
}

impl SavingsModule {
    pub fn new(address: Address, ledger: Arc<dyn Ledger>, queue: TransactionQueue) -> Self {
        Self {
            address,
            ledger,
            queue,
            fees: WithdrawFeeCache::new(),
        }
    }

    pub fn mainnet(ledger: Arc<dyn Ledger>, queue: TransactionQueue) -> Result<Self, String> {
        Ok(Self::new(known_address(SAVINGS_MODULE_ADDRESS)?, ledger, queue))
    }

    fn connected_account(&self) -> Result<Address, ProtocolError> {
        self.queue
            .current_account()
            .ok_or(ProtocolError::Submission(TxError::NotConnected))
    }

    /// Read `decimals()` of a deposit token
    pub async fn pool_token(&self, token: Address) -> Result<PoolToken, SimulationError> {
        let output = self
            .ledger
            .simulate(&MutatingCall::new(token, abi::encode_decimals()), Address::zero())
            .await?;
        let decimals = abi::decode_decimals(&output).map_err(SimulationError::Reverted)?;
        Ok(PoolToken {
            address: token,
            decimals,
        })
    }

    /// Fee for withdrawing `amount` of `token` from `pool`, in token units.
    ///
    /// Simulates `withdraw` from `from` and compares the normalized amount it
    /// would debit with the requested amount. Negative when the pool pays a bonus.
    pub async fn withdraw_fee(
        &self,
        from: Address,
        pool: Address,
        token: PoolToken,
        amount: U256,
    ) -> Result<I256, SimulationError> {
        let key = WithdrawFeeKey {
            from,
            pool,
            token: token.address,
            amount,
        };
        if let Some(fee) = self.fees.get(&key) {
            return Ok(fee);
        }

        let call = MutatingCall::new(
            self.address,
            abi::encode_withdraw(pool, token.address, amount, U256::zero()),
        );
        let output = self.ledger.simulate(&call, from).await?;
        let n_amount = abi::decode_uint256(&output).map_err(SimulationError::Reverted)?;
        let debited = abi::denormalize(n_amount, token.decimals);

        let fee = signed(debited)?
            .checked_sub(signed(amount)?)
            .ok_or_else(|| SimulationError::InvalidInput("fee out of range".to_string()))?;

        self.fees.insert(key, fee);
        Ok(fee)
    }

    /// Normalized (18-decimal) pool balance of `account`
    pub async fn pool_balance(
        &self,
        account: Address,
        lp_token: Address,
    ) -> Result<U256, SimulationError> {
        read_uint256(
            &self.ledger,
            lp_token,
            abi::encode_full_balance_of(account),
            account,
        )
        .await
    }

    /// Largest amount of `token` that `from` can withdraw from `pool`,
    /// leaving less than one whole token behind
    pub async fn max_withdraw_amount(
        &self,
        from: Address,
        pool: Address,
        token: PoolToken,
        lp_token: Address,
    ) -> Result<U256, SimulationError> {
        let n_balance = self.pool_balance(from, lp_token).await?;
        let balance = abi::denormalize(n_balance, token.decimals);
        let allowed_remaining = U256::exp10(token.decimals as usize);

        let amount = max_withdraw(balance, allowed_remaining, |amount| {
            self.withdraw_fee(from, pool, token, amount)
        })
        .await?;

        log::info!(
            "[Savings] Max withdraw of {:?} from pool {:?}: {} (balance {})",
            token.address,
            pool,
            amount,
            balance
        );
        Ok(amount)
    }

    /// Withdraw the maximum amount of one token
    pub async fn withdraw_one_token(
        &self,
        pool: Address,
        token: PoolToken,
        lp_token: Address,
    ) -> Result<TransactionReceipt, ProtocolError> {
        let from = self.connected_account()?;
        let amount = self.max_withdraw_amount(from, pool, token, lp_token).await?;
        if amount.is_zero() {
            return Err(ProtocolError::NothingToWithdraw);
        }

        let call = MutatingCall::new(
            self.address,
            abi::encode_withdraw(pool, token.address, amount, U256::zero()),
        );
        let receipt = self.queue.submit(call).await?;
        self.invalidate_pool(pool);
        Ok(receipt)
    }

    /// Withdraw the whole pool balance across all pool tokens
    pub async fn withdraw_all_tokens(
        &self,
        pool: Address,
        lp_token: Address,
    ) -> Result<TransactionReceipt, ProtocolError> {
        let from = self.connected_account()?;
        let n_amount = self.pool_balance(from, lp_token).await?;
        if n_amount.is_zero() {
            return Err(ProtocolError::NothingToWithdraw);
        }

        let call = MutatingCall::new(self.address, abi::encode_withdraw_all(pool, n_amount));
        let receipt = self.queue.submit(call).await?;
        self.invalidate_pool(pool);
        Ok(receipt)
    }

    /// Forget simulated fees for `pool` after its state changed
    pub fn invalidate_pool(&self, pool: Address) {
        log::debug!("[Savings] Invalidating cached fees for pool {:?}", pool);
        self.fees.invalidate_pool(pool);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::testing::{queue_for, user, FakeChain, TOKEN_DECIMALS};
    use std::sync::atomic::Ordering;

    fn pool() -> Address {
        Address::repeat_byte(0x0a)
    }

    fn lp_token() -> Address {
        Address::repeat_byte(0x1b)
    }

    fn usdc() -> PoolToken {
        PoolToken {
            address: Address::repeat_byte(0xa0),
            decimals: TOKEN_DECIMALS,
        }
    }

    /// `tokens` whole tokens, normalized to 18 decimals
    fn normalized(tokens: u64) -> U256 {
        U256::from(tokens) * U256::exp10(18)
    }

    fn module(chain: Arc<FakeChain>) -> SavingsModule {
        SavingsModule::new(
            Address::repeat_byte(0x73),
            chain.clone(),
            queue_for(chain),
        )
    }

    #[tokio::test]
    async fn test_withdraw_fee_is_cached() {
        let chain = FakeChain::new(normalized(1000));
        let savings = module(chain.clone());
        let amount = U256::from(500_000_000u64);

        let fee = savings.withdraw_fee(user(), pool(), usdc(), amount).await.unwrap();
        assert_eq!(fee, I256::from(5_000_000));
        let again = savings.withdraw_fee(user(), pool(), usdc(), amount).await.unwrap();
        assert_eq!(again, fee);
        assert_eq!(chain.simulations.load(Ordering::SeqCst), 1);

        savings.invalidate_pool(pool());
        savings.withdraw_fee(user(), pool(), usdc(), amount).await.unwrap();
        assert_eq!(chain.simulations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pool_token_decimals() {
        let savings = module(FakeChain::new(normalized(1)));
        assert_eq!(savings.pool_token(usdc().address).await.unwrap(), usdc());
    }

    #[tokio::test]
    async fn test_max_withdraw_amount_leaves_less_than_one_token() {
        let chain = FakeChain::new(normalized(1000));
        let savings = module(chain);

        let amount = savings
            .max_withdraw_amount(user(), pool(), usdc(), lp_token())
            .await
            .unwrap();

        let balance = U256::from(1000u64) * U256::exp10(6);
        let fee = amount / 100;
        assert!(!amount.is_zero());
        assert!(amount + fee <= balance);
        assert!(balance - amount - fee < U256::exp10(6));
    }

    #[tokio::test]
    async fn test_withdraw_one_token_submits_and_invalidates() {
        let chain = FakeChain::new(normalized(1000));
        let savings = module(chain.clone());

        savings.withdraw_one_token(pool(), usdc(), lp_token()).await.unwrap();

        assert_eq!(chain.sent_selectors(), vec![abi::selector(abi::WITHDRAW_SIG)]);
        let simulations = chain.simulations.load(Ordering::SeqCst);
        // Cached fees were dropped: the same search simulates again
        savings
            .max_withdraw_amount(user(), pool(), usdc(), lp_token())
            .await
            .unwrap();
        assert!(chain.simulations.load(Ordering::SeqCst) > simulations + 1);
    }

    #[tokio::test]
    async fn test_withdraw_all_tokens_uses_normalized_balance() {
        let chain = FakeChain::new(normalized(42));
        let savings = module(chain.clone());

        savings.withdraw_all_tokens(pool(), lp_token()).await.unwrap();

        let sent = chain.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].data, abi::encode_withdraw_all(pool(), normalized(42)));
    }

    #[tokio::test]
    async fn test_empty_pool_has_nothing_to_withdraw() {
        let chain = FakeChain::new(U256::zero());
        let savings = module(chain.clone());

        assert_eq!(
            savings.withdraw_all_tokens(pool(), lp_token()).await.unwrap_err(),
            ProtocolError::NothingToWithdraw
        );
        assert!(chain.sent.lock().is_empty());
    }
}
