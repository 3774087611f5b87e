//! Maximum withdrawable amount under a simulated, amount-dependent fee
//!
//! The fee for withdrawing `x` is only known by simulating the withdrawal,
//! and the largest feasible `x` satisfies `x + fee(x) <= balance`. The solver
//! bisects towards that bound, capping each proposal by the fee rate seen so
//! far, and stops once less than `allowed_remaining_balance` would be left.

use ethers::types::{I256, U256};
use std::future::Future;

use crate::ledger::SimulationError;

/// Upper bound on fee samples taken inside the search loop
pub const MAX_FEE_SAMPLES: usize = 256;

fn to_signed(value: U256, what: &str) -> Result<I256, SimulationError> {
    if value > I256::MAX.into_raw() {
        return Err(SimulationError::InvalidInput(format!(
            "{} {} does not fit a signed 256-bit amount",
            what, value
        )));
    }
    Ok(I256::from_raw(value))
}

/// Last accepted sample of the search. `amount + fee <= balance` holds for
/// every accepted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalState {
    pub balance: I256,
    pub allowed_remaining: I256,
    pub amount: I256,
    pub fee: I256,
}

impl WithdrawalState {
    fn start(balance: I256, allowed_remaining: I256) -> Self {
        Self {
            balance,
            allowed_remaining,
            amount: I256::zero(),
            fee: I256::zero(),
        }
    }

    /// Headroom left after the accepted withdrawal and its fee
    pub fn remaining(&self) -> Option<I256> {
        self.balance.checked_sub(self.amount)?.checked_sub(self.fee)
    }

    /// Fee the whole balance would pay at the observed fee rate
    pub fn max_estimated_fee(&self) -> Option<I256> {
        if self.amount.is_zero() {
            return Some(I256::zero());
        }
        let spent = self.amount.checked_add(self.fee)?;
        self.balance.checked_mul(self.fee)?.checked_div(spent)
    }

    /// Next amount to sample, or `None` when no proposal can improve on the
    /// accepted amount
    pub fn next_proposal(&self) -> Option<I256> {
        let remaining = self.remaining()?;
        let halfway = self.amount.checked_add(remaining.checked_div(I256::from(2))?)?;
        let ceiling = self.balance.checked_sub(self.max_estimated_fee()?)?;
        let next = halfway.min(ceiling);

        if next <= self.amount || next > self.balance {
            return None;
        }
        Some(next)
    }

    /// Whether withdrawing `amount` with `fee` stays within the balance
    pub fn is_affordable(&self, amount: I256, fee: I256) -> bool {
        match amount.checked_add(fee) {
            Some(total) => total <= self.balance,
            None => false,
        }
    }
}

/// Largest amount that can be withdrawn from `balance` once the fee reported
/// by `fee_of` is taken out.
///
/// A transport failure on the first (full-balance) sample is returned to the
/// caller. Any other failed or infeasible sample ends the search with the
/// last accepted amount.
pub async fn max_withdraw<F, Fut>(
    balance: U256,
    allowed_remaining_balance: U256,
    mut fee_of: F,
) -> Result<U256, SimulationError>
where
    F: FnMut(U256) -> Fut,
    Fut: Future<Output = Result<I256, SimulationError>>,
{
    let signed_balance = to_signed(balance, "balance")?;
    let allowed_remaining = to_signed(allowed_remaining_balance, "allowed remaining balance")?;

    match fee_of(balance).await {
        // balance + fee <= balance
        Ok(fee) if fee <= I256::zero() => {
            log::debug!("[Solver] Full balance {} withdrawable (fee {})", balance, fee);
            return Ok(balance);
        }
        Ok(_) => {}
        Err(e) if e.is_infeasible() => {
            log::debug!("[Solver] Full-balance sample infeasible: {}", e);
        }
        Err(e) => return Err(e),
    }

    let mut state = WithdrawalState::start(signed_balance, allowed_remaining);
    let mut samples = 0usize;

    loop {
        let Some(remaining) = state.remaining() else {
            break;
        };
        if remaining < state.allowed_remaining {
            break;
        }
        if samples >= MAX_FEE_SAMPLES {
            log::warn!(
                "[Solver] Stopped after {} fee samples at {} (remaining {})",
                samples,
                state.amount,
                remaining
            );
            break;
        }

        let Some(next) = state.next_proposal() else {
            break;
        };

        samples += 1;
        let fee = match fee_of(next.into_raw()).await {
            Ok(fee) => fee,
            Err(e) => {
                log::debug!("[Solver] Sample at {} failed: {}", next, e);
                break;
            }
        };

        if !state.is_affordable(next, fee) {
            log::debug!("[Solver] Sample at {} infeasible (fee {})", next, fee);
            break;
        }

        state.amount = next;
        state.fee = fee;
    }

    log::debug!(
        "[Solver] Max withdraw {} of {} after {} samples (fee {})",
        state.amount,
        balance,
        samples,
        state.fee
    );
    Ok(state.amount.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    fn one_percent(x: U256) -> Result<I256, SimulationError> {
        Ok(I256::from_raw(x / 100))
    }

    #[tokio::test]
    async fn test_one_percent_fee_example() {
        let sampled = RefCell::new(Vec::new());
        let amount = max_withdraw(u(1000), u(10), |x| {
            sampled.borrow_mut().push(x.as_u64());
            async move { one_percent(x) }
        })
        .await
        .unwrap();

        assert_eq!(amount, u(983));
        assert_eq!(
            sampled.into_inner(),
            vec![1000, 500, 747, 870, 931, 961, 976, 983]
        );
        // Feasible and within the dust threshold
        let fee = u(983) / 100;
        assert!(amount + fee <= u(1000));
        assert!(u(1000) - amount - fee < u(10));
    }

    #[tokio::test]
    async fn test_proportional_fee_terminates_within_dust() {
        let fee_of = |x: U256| async move { Ok::<_, SimulationError>(I256::from_raw(x * 3 / 10)) };
        let amount = max_withdraw(u(1000), u(10), fee_of).await.unwrap();

        assert_eq!(amount, u(765));
        let fee = amount * 3 / 10;
        assert!(amount + fee <= u(1000));
        assert!(u(1000) - amount - fee < u(10));
    }

    #[tokio::test]
    async fn test_zero_fee_fast_path_samples_once() {
        let mut calls = 0;
        let amount = max_withdraw(u(1000), u(10), |_| {
            calls += 1;
            async { Ok::<_, SimulationError>(I256::zero()) }
        })
        .await
        .unwrap();

        assert_eq!(amount, u(1000));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_negative_fee_fast_path() {
        let mut calls = 0;
        let amount = max_withdraw(u(1000), u(10), |_| {
            calls += 1;
            async { Ok::<_, SimulationError>(I256::from(-3)) }
        })
        .await
        .unwrap();

        assert_eq!(amount, u(1000));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_reverted_full_balance_sample_continues() {
        let amount = max_withdraw(u(1000), u(10), |x| async move {
            if x == u(1000) {
                Err(SimulationError::Reverted("insufficient liquidity".into()))
            } else {
                one_percent(x)
            }
        })
        .await
        .unwrap();

        assert_eq!(amount, u(983));
    }

    #[tokio::test]
    async fn test_transport_failure_on_first_sample_propagates() {
        let result = max_withdraw(u(1000), u(10), |_| async {
            Err::<I256, _>(SimulationError::Transport("connection refused".into()))
        })
        .await;

        assert_eq!(
            result,
            Err(SimulationError::Transport("connection refused".into()))
        );
    }

    #[tokio::test]
    async fn test_loop_failure_returns_last_accepted_amount() {
        let amount = max_withdraw(u(1000), u(10), |x| async move {
            if x > u(800) {
                Err(SimulationError::Transport("timeout".into()))
            } else {
                one_percent(x)
            }
        })
        .await;

        // 1000 fails on the first sample with a transport error
        assert!(amount.is_err());

        let amount = max_withdraw(u(1000), u(10), |x| async move {
            if x > u(800) && x < u(1000) {
                Err(SimulationError::Transport("timeout".into()))
            } else {
                one_percent(x)
            }
        })
        .await
        .unwrap();
        assert_eq!(amount, u(747));
    }

    #[tokio::test]
    async fn test_infeasible_sample_is_discarded() {
        // Fee jumps past the balance above 600
        let amount = max_withdraw(u(1000), u(10), |x| async move {
            if x > u(600) {
                Ok(I256::from(900))
            } else {
                one_percent(x)
            }
        })
        .await
        .unwrap();

        assert_eq!(amount, u(500));
    }

    #[tokio::test]
    async fn test_zero_balance() {
        let amount = max_withdraw(U256::zero(), u(10), |_| async { Ok::<_, SimulationError>(I256::zero()) })
            .await
            .unwrap();
        assert_eq!(amount, U256::zero());

        // Positive fee on an empty balance: nothing can be withdrawn
        let amount = max_withdraw(U256::zero(), U256::zero(), |_| async { Ok::<_, SimulationError>(I256::one()) })
            .await
            .unwrap();
        assert_eq!(amount, U256::zero());
    }

    #[tokio::test]
    async fn test_out_of_range_balance() {
        let result = max_withdraw(U256::MAX, u(10), |_| async { Ok::<_, SimulationError>(I256::one()) }).await;
        assert!(matches!(result, Err(SimulationError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_search_ends_without_dust_threshold() {
        // With no dust threshold the search stops once a proposal cannot move
        let mut calls = 0usize;
        let balance = U256::exp10(30);
        let amount = max_withdraw(balance, U256::zero(), |x| {
            calls += 1;
            async move { Ok::<_, SimulationError>(I256::from_raw(x / 1000 + 1)) }
        })
        .await
        .unwrap();

        assert!(calls <= MAX_FEE_SAMPLES + 1);
        assert!(amount + amount / 1000 + 1 <= balance);
    }

    #[test]
    fn test_state_helpers() {
        let state = WithdrawalState {
            balance: I256::from(1000),
            allowed_remaining: I256::from(10),
            amount: I256::from(500),
            fee: I256::from(5),
        };
        assert_eq!(state.remaining(), Some(I256::from(495)));
        assert_eq!(state.max_estimated_fee(), Some(I256::from(9)));
        assert_eq!(state.next_proposal(), Some(I256::from(747)));
        assert!(state.is_affordable(I256::from(990), I256::from(10)));
        assert!(!state.is_affordable(I256::from(991), I256::from(10)));
    }
}
