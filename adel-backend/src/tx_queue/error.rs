//! Submission failures reported to the caller of `submit`

use std::fmt;

use crate::ledger::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    /// No account is connected
    NotConnected,
    /// The active network is not the one submissions are allowed on
    WrongNetwork { expected: u64, actual: u64 },
    /// Neither fee scheme was accepted
    UnsupportedFeeScheme(LedgerError),
    /// Terminal failure of the send attempt
    SubmissionFailed(LedgerError),
    /// No fee quote could be obtained for the legacy attempt
    FeeQuoteUnavailable(String),
    /// The queue worker has stopped
    QueueClosed,
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxError::NotConnected => write!(f, "no wallet connected"),
            TxError::WrongNetwork { expected, actual } => write!(
                f,
                "wrong network: expected chain {}, connected to chain {}",
                expected, actual
            ),
            TxError::UnsupportedFeeScheme(e) => {
                write!(f, "no supported fee scheme: {}", e)
            }
            TxError::SubmissionFailed(e) => write!(f, "submission failed: {}", e),
            TxError::FeeQuoteUnavailable(msg) => write!(f, "fee quote unavailable: {}", msg),
            TxError::QueueClosed => write!(f, "transaction queue is closed"),
        }
    }
}

impl std::error::Error for TxError {}
