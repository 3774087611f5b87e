//! ethers-backed ledger adapter
//!
//! Signs with a local key through `SignerMiddleware` and talks JSON-RPC over
//! HTTP. This is the one place where provider errors are turned into
//! [`LedgerErrorKind`]s, using JSON-RPC error codes and block data.

use async_trait::async_trait;
use ethers::prelude::{Http, LocalWallet, Middleware, Provider, Signer, SignerMiddleware};
use ethers::providers::MiddlewareError;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, BlockId, BlockNumber, Bytes, Eip1559TransactionRequest, TransactionRequest, U64,
};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::types::{
    FeeParams, FeeStrategy, LedgerError, LedgerErrorKind, MutatingCall, SendEvent, SendEvents,
    SimulationError,
};
use super::Ledger;

/// EIP-1193 "user rejected request"
const RPC_USER_REJECTED: i64 = 4001;
/// JSON-RPC "method not found"
const RPC_METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC "invalid params" (nodes without typed transaction support)
const RPC_INVALID_PARAMS: i64 = -32602;
/// geth "execution reverted" with revert data
const RPC_EXECUTION_REVERTED: i64 = 3;
/// geth execution error on `eth_call` (includes reverts without data)
const RPC_EXECUTION_ERROR: i64 = -32000;

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Ledger implementation over an HTTP JSON-RPC node and a local signer
pub struct EthersLedger {
    client: Arc<SignerClient>,
}

impl EthersLedger {
    /// Bind `wallet` to the chain id reported by `provider`
    pub async fn new(provider: Provider<Http>, wallet: LocalWallet) -> Result<Self, String> {
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| format!("Failed to read chain id: {}", e))?;

        log::info!(
            "[Ledger] Connected signer {:?} on chain {}",
            wallet.address(),
            chain_id
        );

        let wallet = wallet.with_chain_id(chain_id.as_u64());
        Ok(Self {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
        })
    }

    /// Read-only provider handle (for gas price reads)
    pub fn provider(&self) -> Provider<Http> {
        self.client.inner().clone()
    }

    async fn supports_dynamic_fees(&self) -> Result<bool, LedgerError> {
        let block = self
            .client
            .get_block(BlockNumber::Latest)
            .await
            .map_err(|e| classify(&e, FeeStrategy::Legacy))?;
        Ok(block.and_then(|b| b.base_fee_per_gas).is_some())
    }
}

/// Build a typed transaction for `call` priced with `fees`
pub(crate) fn build_transaction(
    call: &MutatingCall,
    fees: FeeParams,
    from: Address,
) -> TypedTransaction {
    match fees {
        FeeParams::Dynamic {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => Eip1559TransactionRequest::new()
            .from(from)
            .to(call.to)
            .data(call.data.clone())
            .value(call.value)
            .max_fee_per_gas(max_fee_per_gas)
            .max_priority_fee_per_gas(max_priority_fee_per_gas)
            .into(),
        FeeParams::Legacy { gas_price } => TransactionRequest::new()
            .from(from)
            .to(call.to)
            .data(call.data.clone())
            .value(call.value)
            .gas_price(gas_price)
            .into(),
    }
}

/// Block the nonce and gas estimate are read at. The queue moves on once a
/// send is acknowledged, so earlier transactions may still be pending.
fn pending_block() -> Option<BlockId> {
    Some(BlockNumber::Pending.into())
}

/// Fill nonce, gas limit and any missing pricing for `tx`
pub(crate) async fn prepare_transaction<M: Middleware>(
    client: &M,
    tx: &mut TypedTransaction,
) -> Result<(), M::Error> {
    client.fill_transaction(tx, pending_block()).await
}

/// Map a JSON-RPC error code to a failure class
pub(crate) fn kind_for_rpc_code(code: i64, strategy: FeeStrategy) -> LedgerErrorKind {
    match code {
        RPC_USER_REJECTED => LedgerErrorKind::Rejected,
        RPC_EXECUTION_REVERTED => LedgerErrorKind::Reverted,
        RPC_METHOD_NOT_FOUND | RPC_INVALID_PARAMS if strategy == FeeStrategy::Dynamic => {
            LedgerErrorKind::UnsupportedFeeScheme
        }
        _ => LedgerErrorKind::Other,
    }
}

/// Map an `eth_call` error response. Only execution failures say anything
/// about the proposed call; rate limits and internal errors are transport.
pub(crate) fn simulation_failure(code: i64, message: &str) -> SimulationError {
    match kind_for_rpc_code(code, FeeStrategy::Legacy) {
        LedgerErrorKind::Reverted => SimulationError::Reverted(message.to_string()),
        _ if code == RPC_EXECUTION_ERROR => SimulationError::Reverted(message.to_string()),
        _ => SimulationError::Transport(format!("rpc error {}: {}", code, message)),
    }
}

fn classify<E: MiddlewareError>(err: &E, strategy: FeeStrategy) -> LedgerError {
    match err.as_error_response() {
        Some(response) => LedgerError::new(
            kind_for_rpc_code(response.code, strategy),
            response.message.clone(),
        ),
        None => LedgerError::transport(err.to_string()),
    }
}

#[async_trait]
impl Ledger for EthersLedger {
    async fn current_network_id(&self) -> Result<u64, LedgerError> {
        let chain_id = self
            .client
            .get_chainid()
            .await
            .map_err(|e| classify(&e, FeeStrategy::Legacy))?;
        Ok(chain_id.as_u64())
    }

    async fn send(
        &self,
        call: &MutatingCall,
        fees: FeeParams,
        from: Address,
    ) -> Result<SendEvents, LedgerError> {
        let strategy = fees.strategy();

        if strategy == FeeStrategy::Dynamic && !self.supports_dynamic_fees().await? {
            return Err(LedgerError::unsupported_fee_scheme(
                "latest block carries no base fee",
            ));
        }

        let mut tx = build_transaction(call, fees, from);
        prepare_transaction(self.client.as_ref(), &mut tx)
            .await
            .map_err(|e| classify(&e, strategy))?;

        log::info!(
            "[Ledger] Sending {} tx to {:?} (gas={:?}, nonce={:?})",
            strategy,
            call.to,
            tx.gas(),
            tx.nonce()
        );

        let (events, receiver) = mpsc::unbounded_channel();
        let client = self.client.clone();

        tokio::spawn(async move {
            let pending = match client.send_transaction(tx, pending_block()).await {
                Ok(pending) => pending,
                Err(e) => {
                    let _ = events.send(SendEvent::Failed(classify(&e, strategy)));
                    return;
                }
            };

            let tx_hash = *pending;
            let _ = events.send(SendEvent::Acknowledged(tx_hash));

            let event = match pending.await {
                Ok(Some(receipt)) if receipt.status == Some(U64::from(1)) => {
                    SendEvent::Confirmed(receipt)
                }
                Ok(Some(receipt)) => SendEvent::Failed(LedgerError::new(
                    LedgerErrorKind::Reverted,
                    format!(
                        "transaction {:?} reverted in block {:?}",
                        tx_hash, receipt.block_number
                    ),
                )),
                Ok(None) => SendEvent::Failed(LedgerError::new(
                    LedgerErrorKind::Dropped,
                    format!("transaction {:?} dropped from the pending pool", tx_hash),
                )),
                Err(e) => SendEvent::Failed(classify(&e, strategy)),
            };
            let _ = events.send(event);
        });

        Ok(receiver)
    }

    async fn simulate(&self, call: &MutatingCall, from: Address) -> Result<Bytes, SimulationError> {
        let tx: TypedTransaction = TransactionRequest::new()
            .from(from)
            .to(call.to)
            .data(call.data.clone())
            .value(call.value)
            .into();

        self.client.inner().call(&tx, None).await.map_err(|e| {
            match e.as_error_response() {
                Some(response) => simulation_failure(response.code, &response.message),
                None => SimulationError::Transport(e.to_string()),
            }
        })
    }
}
