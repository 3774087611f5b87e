//! Submission tracker
//!
//! Thread-safe history of every submission that passed through the queue.

use chrono::Utc;
use dashmap::DashMap;
use ethers::types::{Address, H256};
use std::collections::HashMap;
use strum::IntoEnumIterator;

use super::types::{SubmissionRecord, SubmissionStatus, SubmissionSummary};
use crate::ledger::{FeeStrategy, MutatingCall};

/// Records submission lifecycles, keyed by submission id.
/// Uses DashMap so the worker and callers can read and write concurrently.
pub struct SubmissionTracker {
    records: DashMap<String, SubmissionRecord>,
}

impl SubmissionTracker {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Record a newly enqueued submission
    pub fn record(&self, id: &str, from: Address, call: &MutatingCall) {
        log::debug!("[TxQueue] Tracking submission {} to {:?}", id, call.to);
        self.records
            .insert(id.to_string(), SubmissionRecord::new(id.to_string(), from, call));
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<SubmissionRecord> {
        self.records.get(id).map(|r| r.clone())
    }

    #[cfg(test)]
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Most recent first
    pub fn list_recent(&self, limit: usize) -> Vec<SubmissionSummary> {
        let mut summaries: Vec<_> = self
            .records
            .iter()
            .map(|r| SubmissionSummary::from(r.value()))
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries.truncate(limit);
        summaries
    }

    pub(super) fn update<F>(&self, id: &str, apply: F) -> bool
    where
        F: FnOnce(&mut SubmissionRecord),
    {
        match self.records.get_mut(id) {
            Some(mut record) => {
                apply(record.value_mut());
                true
            }
            None => false,
        }
    }

    pub fn mark_sending(&self, id: &str) -> bool {
        self.update(id, |r| r.status = SubmissionStatus::Sending)
    }

    pub fn mark_strategy(&self, id: &str, strategy: FeeStrategy) -> bool {
        self.update(id, |r| r.fee_strategy = Some(strategy))
    }

    pub fn mark_acknowledged(&self, id: &str, tx_hash: H256) -> bool {
        self.update(id, |r| {
            log::info!("[TxQueue] Submission {} acknowledged as {:?}", id, tx_hash);
            r.status = SubmissionStatus::Acknowledged;
            r.tx_hash = Some(tx_hash);
            r.acknowledged_at = Some(Utc::now());
        })
    }

    pub fn mark_confirmed(&self, id: &str, tx_hash: H256) -> bool {
        self.update(id, |r| {
            log::info!("[TxQueue] Submission {} confirmed", id);
            r.status = SubmissionStatus::Confirmed;
            r.tx_hash = Some(tx_hash);
            r.finished_at = Some(Utc::now());
        })
    }

    pub fn mark_failed(&self, id: &str, error: &str) -> bool {
        self.update(id, |r| {
            log::warn!("[TxQueue] Submission {} failed: {}", id, error);
            r.status = SubmissionStatus::Failed;
            r.error = Some(error.to_string());
            r.finished_at = Some(Utc::now());
        })
    }

    pub fn count_by_status(&self, status: SubmissionStatus) -> usize {
        self.records
            .iter()
            .filter(|r| r.value().status == status)
            .count()
    }

    /// Count for every status, including zeros
    pub fn status_counts(&self) -> HashMap<SubmissionStatus, usize> {
        SubmissionStatus::iter()
            .map(|status| (status, self.count_by_status(status)))
            .collect()
    }

    /// Drop terminal records created more than `max_age_hours` ago
    pub fn cleanup_old(&self, max_age_hours: i64) -> usize {
        let cutoff = Utc::now() - chrono::Duration::hours(max_age_hours);
        let before = self.records.len();
        self.records
            .retain(|_, r| !(r.status.is_terminal() && r.created_at < cutoff));
        let count = before.saturating_sub(self.records.len());

        if count > 0 {
            log::info!("[TxQueue] Cleaned up {} old submissions", count);
        }
        count
    }
}

impl Default for SubmissionTracker {
    fn default() -> Self {
        Self::new()
    }
}
