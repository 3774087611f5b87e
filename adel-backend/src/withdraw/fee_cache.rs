//! Simulated withdraw fee cache
//!
//! Fee simulations are keyed by the full argument tuple. Entries for a pool
//! are dropped after any withdrawal from that pool, since its fee schedule
//! depends on pool state.

use ethers::types::{Address, I256, U256};
use moka::sync::Cache;
use std::time::Duration;

/// Upper bound on how long a simulated fee is reused
const FEE_TTL: Duration = Duration::from_secs(60);

const MAX_ENTRIES: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WithdrawFeeKey {
    pub from: Address,
    pub pool: Address,
    pub token: Address,
    pub amount: U256,
}

pub struct WithdrawFeeCache {
    fees: Cache<WithdrawFeeKey, I256>,
}

impl WithdrawFeeCache {
    pub fn new() -> Self {
        Self {
            fees: Cache::builder()
                .time_to_live(FEE_TTL)
                .max_capacity(MAX_ENTRIES)
                .support_invalidation_closures()
                .build(),
        }
    }

    pub fn get(&self, key: &WithdrawFeeKey) -> Option<I256> {
        self.fees.get(key)
    }

    pub fn insert(&self, key: WithdrawFeeKey, fee: I256) {
        self.fees.insert(key, fee);
    }

    /// Drop every cached fee for `pool`
    pub fn invalidate_pool(&self, pool: Address) {
        if let Err(e) = self.fees.invalidate_entries_if(move |key, _| key.pool == pool) {
            log::warn!(
                "[Savings] Could not invalidate fees for pool {:?}, clearing all: {}",
                pool,
                e
            );
            self.fees.invalidate_all();
        }
    }
}

impl Default for WithdrawFeeCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(pool: u8, amount: u64) -> WithdrawFeeKey {
        WithdrawFeeKey {
            from: Address::repeat_byte(0x01),
            pool: Address::repeat_byte(pool),
            token: Address::repeat_byte(0xda),
            amount: U256::from(amount),
        }
    }

    #[test]
    fn test_keyed_by_full_tuple() {
        let cache = WithdrawFeeCache::new();
        cache.insert(key(0x0a, 500), I256::from(5));

        assert_eq!(cache.get(&key(0x0a, 500)), Some(I256::from(5)));
        assert_eq!(cache.get(&key(0x0a, 501)), None);
        assert_eq!(cache.get(&key(0x0b, 500)), None);
    }

    #[test]
    fn test_invalidate_pool_keeps_other_pools() {
        let cache = WithdrawFeeCache::new();
        cache.insert(key(0x0a, 500), I256::from(5));
        cache.insert(key(0x0a, 750), I256::from(7));
        cache.insert(key(0x0b, 500), I256::from(3));

        cache.invalidate_pool(Address::repeat_byte(0x0a));

        assert_eq!(cache.get(&key(0x0a, 500)), None);
        assert_eq!(cache.get(&key(0x0a, 750)), None);
        assert_eq!(cache.get(&key(0x0b, 500)), Some(I256::from(3)));
    }
}
