//! Transaction Submission Pipeline
//!
//! Every ledger mutation goes through [`TransactionQueue`]:
//!
//! ## Flow
//! 1. `submit` / `enqueue` resolves the connected account and queues the call
//! 2. The worker dequeues in FIFO order and checks the network is mainnet
//! 3. The call is sent with dynamic fees, or once with a legacy gas price if
//!    dynamic fees cannot be used
//! 4. Acknowledgment plus a grace period (or any terminal outcome) lets the
//!    next item go; the caller gets exactly one outcome
//!
//! The queue's `SubmissionTracker` keeps the lifecycle of every submission
//! for inspection and prunes finished ones after a day.

mod error;
mod manager;
mod pipeline;
mod types;

pub use error::TxError;
pub use pipeline::{TransactionQueue, SUBMISSION_GRACE_PERIOD};
