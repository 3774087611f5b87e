//! Withdrawal sizing
//!
//! [`max_withdraw`] searches for the largest withdrawable amount given a fee
//! that can only be sampled by simulation; [`WithdrawFeeCache`] memoizes
//! those samples per pool.

mod fee_cache;
mod solver;

pub use fee_cache::{WithdrawFeeCache, WithdrawFeeKey};
pub use solver::max_withdraw;
