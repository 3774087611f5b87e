//! Submission tracking data types

use chrono::{DateTime, Utc};
use ethers::types::{Address, H256};
use serde::{Deserialize, Serialize};

use crate::domain_types::{DomainEthAddress, DomainUint256};
use crate::ledger::{FeeStrategy, MutatingCall};

/// Lifecycle of a submission
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubmissionStatus {
    /// Waiting in the queue
    Queued,
    /// Dequeued; network check and send in progress
    Sending,
    /// Accepted into the pending pool, has a tx hash
    Acknowledged,
    /// Mined successfully
    Confirmed,
    /// Failed before or after reaching the network
    Failed,
}

impl SubmissionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::Confirmed | SubmissionStatus::Failed)
    }
}

/// Everything known about one submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: String,
    pub from: DomainEthAddress,
    pub to: DomainEthAddress,
    /// Hex-encoded calldata
    pub data: String,
    pub value: DomainUint256,
    pub status: SubmissionStatus,
    /// Strategy of the latest send attempt
    pub fee_strategy: Option<FeeStrategy>,
    pub tx_hash: Option<H256>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SubmissionRecord {
    pub fn new(id: String, from: Address, call: &MutatingCall) -> Self {
        Self {
            id,
            from: from.into(),
            to: call.to.into(),
            data: format!("0x{}", hex::encode(&call.data)),
            value: call.value.into(),
            status: SubmissionStatus::Queued,
            fee_strategy: None,
            tx_hash: None,
            error: None,
            created_at: Utc::now(),
            acknowledged_at: None,
            finished_at: None,
        }
    }

    /// Call data selector as 0x-prefixed hex, for listings
    pub fn selector(&self) -> Option<String> {
        if self.data.len() >= 10 {
            Some(self.data[..10].to_string())
        } else {
            None
        }
    }
}

/// Lighter view of a record for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionSummary {
    pub id: String,
    pub from: DomainEthAddress,
    pub to: DomainEthAddress,
    pub selector: Option<String>,
    pub value: DomainUint256,
    pub status: SubmissionStatus,
    pub fee_strategy: Option<FeeStrategy>,
    pub tx_hash: Option<H256>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&SubmissionRecord> for SubmissionSummary {
    fn from(record: &SubmissionRecord) -> Self {
        Self {
            id: record.id.clone(),
            from: record.from,
            to: record.to,
            selector: record.selector(),
            value: record.value,
            status: record.status,
            fee_strategy: record.fee_strategy,
            tx_hash: record.tx_hash,
            error: record.error.clone(),
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SubmissionRecord {
        let call = MutatingCall::new(Address::repeat_byte(0x11), vec![0x09, 0x5e, 0xa7, 0xb3, 0x01]);
        SubmissionRecord::new("sub-1".into(), Address::repeat_byte(0x22), &call)
    }

    #[test]
    fn test_new_record_is_queued() {
        let record = sample_record();
        assert_eq!(record.status, SubmissionStatus::Queued);
        assert_eq!(record.data, "0x095ea7b301");
        assert_eq!(record.selector().as_deref(), Some("0x095ea7b3"));
    }

    #[test]
    fn test_status_display_and_terminal() {
        assert_eq!(SubmissionStatus::Acknowledged.to_string(), "acknowledged");
        assert!(SubmissionStatus::Failed.is_terminal());
        assert!(!SubmissionStatus::Sending.is_terminal());
    }

    #[test]
    fn test_summary_serializes_snake_case_status() {
        let summary = SubmissionSummary::from(&sample_record());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["selector"], "0x095ea7b3");
    }
}
