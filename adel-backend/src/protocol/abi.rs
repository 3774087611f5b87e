//! ABI encoding/decoding for the savings, staking, rewards and vAKRO contracts
//!
//! Calldata is built by hand from function signatures, without abigen!.

use ethers::abi::{AbiDecode, Token};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::keccak256;

/// Decimals the savings module accounts in
pub const NORMALIZED_DECIMALS: u32 = 18;

pub const WITHDRAW_SIG: &str = "withdraw(address,address,uint256,uint256)";
pub const WITHDRAW_ALL_SIG: &str = "withdrawAll(address,uint256)";
pub const FULL_BALANCE_OF_SIG: &str = "fullBalanceOf(address)";
pub const DECIMALS_SIG: &str = "decimals()";
pub const ALLOWANCE_SIG: &str = "allowance(address,address)";
pub const APPROVE_SIG: &str = "approve(address,uint256)";
pub const STAKE_SIG: &str = "stake(uint256,bytes)";
pub const UNSTAKE_ALL_UNLOCKED_SIG: &str = "unstakeAllUnlocked(bytes)";
pub const CLAIM_SIG: &str = "claim(uint256,uint256,bytes32[])";
pub const WITHDRAW_REWARD_SIG: &str = "withdrawReward(address[],address[])";
pub const UNLOCK_AND_REDEEM_ALL_SIG: &str = "unlockAndRedeemAll()";

/// `_data` argument the staking pool expects
const EMPTY_STAKING_DATA: [u8; 1] = [0x00];

/// First four bytes of the signature hash
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut data = selector(signature).to_vec();
    data.extend_from_slice(&ethers::abi::encode(args));
    data.into()
}

/// Savings module `withdraw(_protocol, token, dnAmount, maxNAmount)`.
/// `max_n_amount = 0` disables the slippage cap.
pub fn encode_withdraw(pool: Address, token: Address, dn_amount: U256, max_n_amount: U256) -> Bytes {
    encode_call(
        WITHDRAW_SIG,
        &[
            Token::Address(pool),
            Token::Address(token),
            Token::Uint(dn_amount),
            Token::Uint(max_n_amount),
        ],
    )
}

/// Savings module `withdrawAll(_protocol, nAmount)`
pub fn encode_withdraw_all(pool: Address, n_amount: U256) -> Bytes {
    encode_call(
        WITHDRAW_ALL_SIG,
        &[Token::Address(pool), Token::Uint(n_amount)],
    )
}

/// Pool token `fullBalanceOf(account)`
pub fn encode_full_balance_of(account: Address) -> Bytes {
    encode_call(FULL_BALANCE_OF_SIG, &[Token::Address(account)])
}

pub fn encode_decimals() -> Bytes {
    encode_call(DECIMALS_SIG, &[])
}

pub fn encode_allowance(owner: Address, spender: Address) -> Bytes {
    encode_call(
        ALLOWANCE_SIG,
        &[Token::Address(owner), Token::Address(spender)],
    )
}

pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    encode_call(APPROVE_SIG, &[Token::Address(spender), Token::Uint(amount)])
}

pub fn encode_stake(amount: U256) -> Bytes {
    encode_call(
        STAKE_SIG,
        &[Token::Uint(amount), Token::Bytes(EMPTY_STAKING_DATA.to_vec())],
    )
}

pub fn encode_unstake_all_unlocked() -> Bytes {
    encode_call(
        UNSTAKE_ALL_UNLOCKED_SIG,
        &[Token::Bytes(EMPTY_STAKING_DATA.to_vec())],
    )
}

/// Rewards claiming `claim(merkleRootIndex, amountAllowedToClaim, merkleProofs)`
pub fn encode_claim(merkle_root_index: U256, amount_allowed: U256, proofs: &[H256]) -> Bytes {
    let proofs = proofs
        .iter()
        .map(|p| Token::FixedBytes(p.as_bytes().to_vec()))
        .collect();
    encode_call(
        CLAIM_SIG,
        &[
            Token::Uint(merkle_root_index),
            Token::Uint(amount_allowed),
            Token::Array(proofs),
        ],
    )
}

/// Reward distribution `withdrawReward(poolTokens, rewardTokens)`.
/// Pairs are split into two index-aligned arrays.
pub fn encode_withdraw_reward(pairs: &[(Address, Address)]) -> Bytes {
    let (pool_tokens, reward_tokens): (Vec<Token>, Vec<Token>) = pairs
        .iter()
        .map(|(pool_token, reward_token)| (Token::Address(*pool_token), Token::Address(*reward_token)))
        .unzip();
    encode_call(
        WITHDRAW_REWARD_SIG,
        &[Token::Array(pool_tokens), Token::Array(reward_tokens)],
    )
}

pub fn encode_unlock_and_redeem_all() -> Bytes {
    encode_call(UNLOCK_AND_REDEEM_ALL_SIG, &[])
}

/// Decode a single uint256 return value
pub fn decode_uint256(data: &[u8]) -> Result<U256, String> {
    if data.len() < 32 {
        return Err(format!("uint256 response too short: {} bytes", data.len()));
    }
    U256::decode(&data[..32]).map_err(|e| format!("Failed to decode uint256: {}", e))
}

/// Decode a `decimals()` return value
pub fn decode_decimals(data: &[u8]) -> Result<u32, String> {
    let value = decode_uint256(data)?;
    if value > U256::from(77u8) {
        return Err(format!("Decimals value out of range: {}", value));
    }
    Ok(value.as_u32())
}

/// Convert an 18-decimal amount to `decimals`, truncating
pub fn denormalize(n_amount: U256, decimals: u32) -> U256 {
    if decimals >= NORMALIZED_DECIMALS {
        n_amount.saturating_mul(U256::exp10((decimals - NORMALIZED_DECIMALS) as usize))
    } else {
        n_amount / U256::exp10((NORMALIZED_DECIMALS - decimals) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::{decode, ParamType};

    #[test]
    fn test_known_selectors() {
        assert_eq!(selector(APPROVE_SIG), [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(selector(ALLOWANCE_SIG), [0xdd, 0x62, 0xed, 0x3e]);
        assert_eq!(selector(DECIMALS_SIG), [0x31, 0x3c, 0xe5, 0x67]);
    }

    #[test]
    fn test_encode_withdraw() {
        let pool = Address::repeat_byte(0x0a);
        let token = Address::repeat_byte(0x0b);
        let data = encode_withdraw(pool, token, U256::from(983u64), U256::zero());

        assert_eq!(data.len(), 4 + 4 * 32);
        assert_eq!(&data[..4], &selector(WITHDRAW_SIG));
        let args = decode(
            &[ParamType::Address, ParamType::Address, ParamType::Uint(256), ParamType::Uint(256)],
            &data[4..],
        )
        .unwrap();
        assert_eq!(args[0], Token::Address(pool));
        assert_eq!(args[2], Token::Uint(U256::from(983u64)));
        assert_eq!(args[3], Token::Uint(U256::zero()));
    }

    #[test]
    fn test_encode_stake_carries_data_byte() {
        let data = encode_stake(U256::from(5u64));
        let args = decode(&[ParamType::Uint(256), ParamType::Bytes], &data[4..]).unwrap();
        assert_eq!(args[0], Token::Uint(U256::from(5u64)));
        assert_eq!(args[1], Token::Bytes(vec![0x00]));

        let data = encode_unstake_all_unlocked();
        let args = decode(&[ParamType::Bytes], &data[4..]).unwrap();
        assert_eq!(args[0], Token::Bytes(vec![0x00]));
    }

    #[test]
    fn test_encode_claim() {
        let proofs = vec![H256::repeat_byte(0x01), H256::repeat_byte(0x02)];
        let data = encode_claim(U256::from(3u64), U256::from(1000u64), &proofs);

        let args = decode(
            &[
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::Array(Box::new(ParamType::FixedBytes(32))),
            ],
            &data[4..],
        )
        .unwrap();
        assert_eq!(args[0], Token::Uint(U256::from(3u64)));
        assert_eq!(
            args[2],
            Token::Array(vec![
                Token::FixedBytes(vec![0x01; 32]),
                Token::FixedBytes(vec![0x02; 32]),
            ])
        );
    }

    #[test]
    fn test_encode_withdraw_reward() {
        let pairs = vec![
            (Address::repeat_byte(0x1b), Address::repeat_byte(0xa1)),
            (Address::repeat_byte(0x1a), Address::repeat_byte(0xa2)),
        ];
        let data = encode_withdraw_reward(&pairs);

        assert_eq!(&data[..4], &selector(WITHDRAW_REWARD_SIG));
        let args = decode(
            &[
                ParamType::Array(Box::new(ParamType::Address)),
                ParamType::Array(Box::new(ParamType::Address)),
            ],
            &data[4..],
        )
        .unwrap();
        assert_eq!(
            args[0],
            Token::Array(vec![
                Token::Address(Address::repeat_byte(0x1b)),
                Token::Address(Address::repeat_byte(0x1a)),
            ])
        );
        assert_eq!(
            args[1],
            Token::Array(vec![
                Token::Address(Address::repeat_byte(0xa1)),
                Token::Address(Address::repeat_byte(0xa2)),
            ])
        );
    }

    #[test]
    fn test_encode_unlock_and_redeem_all() {
        let data = encode_unlock_and_redeem_all();
        assert_eq!(data.len(), 4);
        assert_eq!(&data[..], &selector(UNLOCK_AND_REDEEM_ALL_SIG));
    }

    #[test]
    fn test_decode_uint256() {
        let mut word = [0u8; 32];
        word[31] = 0x2a;
        assert_eq!(decode_uint256(&word).unwrap(), U256::from(42u64));
        assert!(decode_uint256(&word[..16]).is_err());

        word[31] = 6;
        assert_eq!(decode_decimals(&word).unwrap(), 6);
    }

    #[test]
    fn test_denormalize() {
        // 1.5 normalized units
        let n_amount = U256::from(15u64) * U256::exp10(17);
        assert_eq!(denormalize(n_amount, 18), n_amount);
        assert_eq!(denormalize(n_amount, 6), U256::from(1_500_000u64));
        // Truncates sub-unit remainders
        assert_eq!(denormalize(U256::from(999_999_999_999u64), 6), U256::zero());
    }
}
