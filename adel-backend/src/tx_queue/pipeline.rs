//! Serialized submission pipeline
//!
//! One worker task drains an unbounded channel of pending submissions in
//! FIFO order. For each item it checks the network, sends with dynamic fees
//! (falling back to a legacy gas price at most once), and holds the queue
//! until the send is acknowledged plus a short grace period, or finishes.
//! The wait for a receipt runs in its own task so the next item can start
//! once the queue slot is released.

use ethers::types::{Address, TransactionReceipt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::error::TxError;
use super::manager::SubmissionTracker;
use crate::gas::FeeQuoteSource;
use crate::ledger::{
    FeeParams, FeeStrategy, Ledger, LedgerError, LedgerErrorKind, MutatingCall, SendEvent,
    SendEvents,
};
use crate::wallet::AccountSource;

/// Ethereum mainnet
pub const EXPECTED_NETWORK_ID: u64 = 1;

/// Delay between acknowledgment and dequeuing the next item
pub const SUBMISSION_GRACE_PERIOD: Duration = Duration::from_millis(200);

/// Finished submissions older than this are dropped from the tracker
pub const TRACKER_RETENTION_HOURS: i64 = 24;

pub type SubmissionOutcome = Result<TransactionReceipt, TxError>;

/// A submission waiting for the worker. The reply channel resolves once.
struct PendingSubmission {
    id: String,
    call: MutatingCall,
    from: Address,
    reply: oneshot::Sender<SubmissionOutcome>,
}

/// Handle to an enqueued submission
pub struct SubmissionTicket {
    pub id: String,
    receiver: oneshot::Receiver<SubmissionOutcome>,
}

impl SubmissionTicket {
    /// Wait for the single terminal outcome
    pub async fn outcome(self) -> SubmissionOutcome {
        self.receiver.await.unwrap_or(Err(TxError::QueueClosed))
    }
}

/// Process-wide queue through which every ledger mutation goes
#[derive(Clone)]
pub struct TransactionQueue {
    sender: mpsc::UnboundedSender<PendingSubmission>,
    accounts: Arc<dyn AccountSource>,
    tracker: Arc<SubmissionTracker>,
}

impl TransactionQueue {
    /// Start the worker with the default grace period
    #[cfg(test)]
    pub fn spawn(
        ledger: Arc<dyn Ledger>,
        fees: Arc<dyn FeeQuoteSource>,
        accounts: Arc<dyn AccountSource>,
    ) -> Self {
        Self::spawn_with_grace(ledger, fees, accounts, SUBMISSION_GRACE_PERIOD)
    }

    pub fn spawn_with_grace(
        ledger: Arc<dyn Ledger>,
        fees: Arc<dyn FeeQuoteSource>,
        accounts: Arc<dyn AccountSource>,
        grace: Duration,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let tracker = Arc::new(SubmissionTracker::new());

        let worker = QueueWorker {
            receiver,
            ledger,
            fees,
            tracker: tracker.clone(),
            grace,
        };
        tokio::spawn(worker.run());

        Self {
            sender,
            accounts,
            tracker,
        }
    }

    /// Queue `call` for the connected account without waiting for it
    pub fn enqueue(&self, call: MutatingCall) -> Result<SubmissionTicket, TxError> {
        let from = self
            .accounts
            .current_account()
            .ok_or(TxError::NotConnected)?;

        let id = Uuid::new_v4().to_string();
        let (reply, receiver) = oneshot::channel();

        self.tracker.record(&id, from, &call);
        let pending = PendingSubmission {
            id: id.clone(),
            call,
            from,
            reply,
        };
        if self.sender.send(pending).is_err() {
            self.tracker.mark_failed(&id, "queue closed");
            return Err(TxError::QueueClosed);
        }

        log::info!("[TxQueue] Queued submission {} from {:?}", id, from);
        Ok(SubmissionTicket { id, receiver })
    }

    /// Queue `call` and wait for its receipt
    pub async fn submit(&self, call: MutatingCall) -> SubmissionOutcome {
        let ticket = self.enqueue(call)?;
        log::debug!("[TxQueue] Waiting for submission {}", ticket.id);
        ticket.outcome().await
    }

    pub fn current_account(&self) -> Option<Address> {
        self.accounts.current_account()
    }

    pub fn tracker(&self) -> Arc<SubmissionTracker> {
        self.tracker.clone()
    }
}

/// Releases the worker to dequeue the next item. Only the first release
/// has an effect; dropping every handle also releases.
#[derive(Clone)]
struct QueueSlot {
    release: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl QueueSlot {
    fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                release: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    fn release(&self) {
        if let Some(tx) = self.release.lock().take() {
            let _ = tx.send(());
        }
    }

    fn release_after(&self, grace: Duration) {
        let slot = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            slot.release();
        });
    }
}

struct QueueWorker {
    receiver: mpsc::UnboundedReceiver<PendingSubmission>,
    ledger: Arc<dyn Ledger>,
    fees: Arc<dyn FeeQuoteSource>,
    tracker: Arc<SubmissionTracker>,
    grace: Duration,
}

impl QueueWorker {
    async fn run(mut self) {
        log::info!("[TxQueue] Worker started");
        while let Some(pending) = self.receiver.recv().await {
            self.process(pending).await;
            self.tracker.cleanup_old(TRACKER_RETENTION_HOURS);
        }
        log::info!("[TxQueue] Worker stopped");
    }

    /// Returns once the item no longer holds the queue
    async fn process(&self, pending: PendingSubmission) {
        let PendingSubmission {
            id,
            call,
            from,
            reply,
        } = pending;

        self.tracker.mark_sending(&id);

        match self.ledger.current_network_id().await {
            Ok(EXPECTED_NETWORK_ID) => {}
            Ok(actual) => {
                let err = TxError::WrongNetwork {
                    expected: EXPECTED_NETWORK_ID,
                    actual,
                };
                finish(&self.tracker, &id, reply, Err(err));
                return;
            }
            Err(e) => {
                finish(&self.tracker, &id, reply, Err(TxError::SubmissionFailed(e)));
                return;
            }
        }

        let (slot, released) = QueueSlot::new();
        let attempt = SubmissionAttempt {
            id,
            call,
            from,
            ledger: self.ledger.clone(),
            fees: self.fees.clone(),
            tracker: self.tracker.clone(),
            slot: slot.clone(),
            grace: self.grace,
        };

        tokio::spawn(async move {
            let outcome = attempt.send_with_fallback().await;
            finish(&attempt.tracker, &attempt.id, reply, outcome);
            slot.release();
        });

        // Err means every slot handle was dropped, which also frees the queue
        let _ = released.await;
    }
}

fn finish(
    tracker: &SubmissionTracker,
    id: &str,
    reply: oneshot::Sender<SubmissionOutcome>,
    outcome: SubmissionOutcome,
) {
    match &outcome {
        Ok(receipt) => {
            tracker.mark_confirmed(id, receipt.transaction_hash);
        }
        Err(e) => {
            tracker.mark_failed(id, &e.to_string());
        }
    }
    if reply.send(outcome).is_err() {
        log::debug!("[TxQueue] Caller of {} stopped waiting", id);
    }
}

/// Failure of one send attempt, with whether it had been acknowledged
struct AttemptFailure {
    error: LedgerError,
    acknowledged: bool,
}

struct SubmissionAttempt {
    id: String,
    call: MutatingCall,
    from: Address,
    ledger: Arc<dyn Ledger>,
    fees: Arc<dyn FeeQuoteSource>,
    tracker: Arc<SubmissionTracker>,
    slot: QueueSlot,
    grace: Duration,
}

impl SubmissionAttempt {
    async fn send_with_fallback(&self) -> SubmissionOutcome {
        let events = match self.start_dynamic().await {
            Ok(events) => events,
            Err(reason) => {
                log::info!(
                    "[TxQueue] Dynamic-fee send for {} not possible ({}), using legacy gas price",
                    self.id,
                    reason
                );
                return self.send_legacy().await;
            }
        };

        match self.follow(events).await {
            Ok(receipt) => Ok(receipt),
            Err(failure) if !failure.acknowledged && failure.error.is_unsupported_fee_scheme() => {
                log::warn!(
                    "[TxQueue] Dynamic fees rejected for {} ({}), retrying with legacy gas price",
                    self.id,
                    failure.error
                );
                self.send_legacy().await
            }
            Err(failure) => Err(TxError::SubmissionFailed(failure.error)),
        }
    }

    /// Build and start the dynamic-fee attempt
    async fn start_dynamic(&self) -> Result<SendEvents, String> {
        let quote = self.fees.dynamic_fee_quote().await?;
        self.tracker.mark_strategy(&self.id, FeeStrategy::Dynamic);

        self.ledger
            .send(&self.call, FeeParams::from(quote.standard), self.from)
            .await
            .map_err(|e| e.to_string())
    }

    async fn send_legacy(&self) -> SubmissionOutcome {
        let quote = self
            .fees
            .legacy_fee_quote()
            .await
            .map_err(TxError::FeeQuoteUnavailable)?;
        self.tracker.mark_strategy(&self.id, FeeStrategy::Legacy);

        let events = self
            .ledger
            .send(&self.call, FeeParams::from(quote), self.from)
            .await
            .map_err(legacy_failure)?;

        self.follow(events)
            .await
            .map_err(|failure| legacy_failure(failure.error))
    }

    /// Consume events until a terminal one. The first acknowledgment
    /// schedules the queue release.
    async fn follow(&self, mut events: SendEvents) -> Result<TransactionReceipt, AttemptFailure> {
        let mut acknowledged = false;

        while let Some(event) = events.recv().await {
            match event {
                SendEvent::Acknowledged(tx_hash) => {
                    if !acknowledged {
                        acknowledged = true;
                        self.tracker.mark_acknowledged(&self.id, tx_hash);
                        self.slot.release_after(self.grace);
                    }
                }
                SendEvent::Confirmed(receipt) => return Ok(receipt),
                SendEvent::Failed(error) => {
                    return Err(AttemptFailure {
                        error,
                        acknowledged,
                    })
                }
            }
        }

        Err(AttemptFailure {
            error: LedgerError::new(
                LedgerErrorKind::Other,
                "event stream closed before a receipt",
            ),
            acknowledged,
        })
    }
}

/// No further fallback exists after the legacy attempt
fn legacy_failure(error: LedgerError) -> TxError {
    if error.is_unsupported_fee_scheme() {
        TxError::UnsupportedFeeScheme(error)
    } else {
        TxError::SubmissionFailed(error)
    }
}
