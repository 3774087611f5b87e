//! Reward distribution module: withdraw accrued pool rewards

use ethers::types::{Address, TransactionReceipt};

use super::{abi, known_address, ProtocolError};
use crate::domain_types::parse_address;
use crate::ledger::MutatingCall;
use crate::tx_queue::TransactionQueue;

pub const REWARD_DISTRIBUTION_MODULE_ADDRESS: &str = "0x84056675382c851cf42FAAFCeC3FCa90E21AE645";

/// One reward to withdraw: the pool's token (LP token for savings pools,
/// the pool itself for staking) and the reward token it pays in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolReward {
    pub pool_token: Address,
    pub reward_token: Address,
}

/// Parse `POOL_TOKEN:REWARD_TOKEN`
pub fn parse_pool_reward(value: &str) -> Result<PoolReward, String> {
    let (pool_token, reward_token) = value
        .split_once(':')
        .ok_or_else(|| format!("expected POOL_TOKEN:REWARD_TOKEN, got '{}'", value))?;
    Ok(PoolReward {
        pool_token: parse_address(pool_token)?,
        reward_token: parse_address(reward_token)?,
    })
}

pub struct RewardDistribution {
    address: Address,
    queue: TransactionQueue,
}

impl RewardDistribution {
    pub fn new(address: Address, queue: TransactionQueue) -> Self {
        Self { address, queue }
    }

    pub fn mainnet(queue: TransactionQueue) -> Result<Self, String> {
        Ok(Self::new(
            known_address(REWARD_DISTRIBUTION_MODULE_ADDRESS)?,
            queue,
        ))
    }

    /// Withdraw every listed reward in one `withdrawReward` call
    pub async fn withdraw_rewards(
        &self,
        rewards: &[PoolReward],
    ) -> Result<TransactionReceipt, ProtocolError> {
        if rewards.is_empty() {
            return Err(ProtocolError::NothingToClaim);
        }

        let pairs: Vec<_> = rewards
            .iter()
            .map(|r| (r.pool_token, r.reward_token))
            .collect();
        log::info!("[Rewards] Withdrawing {} pool rewards", pairs.len());

        let call = MutatingCall::new(self.address, abi::encode_withdraw_reward(&pairs));
        Ok(self.queue.submit(call).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::testing::{queue_for, FakeChain};
    use ethers::types::U256;

    #[test]
    fn test_parse_pool_reward() {
        let reward = parse_pool_reward(
            "0x1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b:0x94d863173EE77439E4292284fF13fAD54b3BA182",
        )
        .unwrap();
        assert_eq!(reward.pool_token, Address::repeat_byte(0x1b));
        assert_eq!(
            reward.reward_token,
            known_address("0x94d863173EE77439E4292284fF13fAD54b3BA182").unwrap()
        );

        assert!(parse_pool_reward("0x1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b1b").is_err());
        assert!(parse_pool_reward("nope:0x94d863173EE77439E4292284fF13fAD54b3BA182").is_err());
    }

    #[tokio::test]
    async fn test_withdraw_rewards_submits_one_call() {
        let chain = FakeChain::new(U256::zero());
        let distribution = RewardDistribution::new(Address::repeat_byte(0x84), queue_for(chain.clone()));
        let rewards = vec![
            PoolReward {
                pool_token: Address::repeat_byte(0x1b),
                reward_token: Address::repeat_byte(0xa1),
            },
            PoolReward {
                pool_token: Address::repeat_byte(0x1a),
                reward_token: Address::repeat_byte(0xa2),
            },
        ];

        distribution.withdraw_rewards(&rewards).await.unwrap();

        let sent = chain.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, Address::repeat_byte(0x84));
        assert_eq!(
            sent[0].data,
            abi::encode_withdraw_reward(&[
                (Address::repeat_byte(0x1b), Address::repeat_byte(0xa1)),
                (Address::repeat_byte(0x1a), Address::repeat_byte(0xa2)),
            ])
        );
    }

    #[tokio::test]
    async fn test_no_rewards_listed() {
        let chain = FakeChain::new(U256::zero());
        let distribution = RewardDistribution::new(Address::repeat_byte(0x84), queue_for(chain.clone()));

        assert_eq!(
            distribution.withdraw_rewards(&[]).await.unwrap_err(),
            ProtocolError::NothingToClaim
        );
        assert!(chain.sent.lock().is_empty());
    }
}
