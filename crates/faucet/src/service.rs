//! Faucet service core logic

use crate::builder::build_transaction;
use crate::context::FaucetContext;
use crate::error::{FaucetError, FaucetResult};
use crate::guard::{GuardError, UsageGuard};
use crate::metrics::FaucetMetrics;
use crate::rpc::{NodeRpc, RpcError};
use crate::selector::{fetch_spendable_utxos, select_utxos};
use crate::signer::sign_transaction;
use faucet_common::traits::UsageStore;
use faucet_crypto::{decode_address, Address};
use kaspa_consensus_core::tx::TransactionId;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Progress of one dispense, used to label failures in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispenseStage {
    Start,
    GuardChecked,
    FundsSelected,
    TxBuilt,
    TxSigned,
    Submitted,
    GuardCommitted,
}

impl fmt::Display for DispenseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispenseStage::Start => "start",
            DispenseStage::GuardChecked => "guard_checked",
            DispenseStage::FundsSelected => "funds_selected",
            DispenseStage::TxBuilt => "tx_built",
            DispenseStage::TxSigned => "tx_signed",
            DispenseStage::Submitted => "submitted",
            DispenseStage::GuardCommitted => "guard_committed",
        };
        f.write_str(name)
    }
}

pub struct FaucetService {
    context: Arc<FaucetContext>,
    rpc: Arc<dyn NodeRpc>,
    guard: UsageGuard,
    metrics: FaucetMetrics,
}

impl FaucetService {
    pub fn new(
        context: Arc<FaucetContext>,
        rpc: Arc<dyn NodeRpc>,
        store: Arc<dyn UsageStore>,
        metrics: FaucetMetrics,
    ) -> Self {
        let guard = UsageGuard::new(store, context.request_interval);
        Self { context, rpc, guard, metrics }
    }

    pub fn context(&self) -> &FaucetContext {
        &self.context
    }

    pub fn metrics(&self) -> &FaucetMetrics {
        &self.metrics
    }

    /// Send the configured amount to `address` on behalf of `ip`.
    pub async fn dispense(&self, ip: &str, address: Option<&str>) -> FaucetResult<TransactionId> {
        let started = Instant::now();
        let mut stage = DispenseStage::Start;

        let result = self.run(ip, address, &mut stage).await;
        match &result {
            Ok(transaction_id) => {
                info!(ip, %transaction_id, amount = self.context.send_amount, "Dispensed funds");
                self.metrics.record_success(self.context.send_amount, started.elapsed());
            }
            Err(err) => {
                match err {
                    FaucetError::StoreUnavailable(_) | FaucetError::SigningFailure(_) => {
                        error!(ip, %stage, kind = err.kind(), "Dispense failed: {}", err)
                    }
                    _ => warn!(ip, %stage, kind = err.kind(), "Dispense failed: {}", err),
                }
                self.metrics.record_failure(err.kind(), started.elapsed());
            }
        }
        result
    }

    async fn run(&self, ip: &str, address: Option<&str>, stage: &mut DispenseStage) -> FaucetResult<TransactionId> {
        let ticket = self.guard.check(ip).await.map_err(|e| match e {
            GuardError::RateLimited(_) => FaucetError::RateLimited,
            GuardError::Store(err) => FaucetError::StoreUnavailable(err.to_string()),
        })?;
        *stage = DispenseStage::GuardChecked;

        let destination = parse_destination(address, &self.context)?;

        let spendable = fetch_spendable_utxos(
            self.rpc.as_ref(),
            self.context.address(),
            self.context.network.coinbase_maturity,
        )
        .await
        .map_err(|e| FaucetError::NodeUnavailable(e.to_string()))?;
        let selection = select_utxos(spendable, self.context.target_amount())?;
        debug!(
            inputs = selection.inputs.len(),
            total = selection.total_selected,
            change = selection.change,
            "Selected UTXOs"
        );
        *stage = DispenseStage::FundsSelected;

        let draft = build_transaction(
            &selection,
            &destination,
            self.context.send_amount,
            self.context.script_public_key(),
        );
        *stage = DispenseStage::TxBuilt;

        let signed = sign_transaction(draft, self.context.key()).map_err(|e| FaucetError::SigningFailure(e.to_string()))?;
        *stage = DispenseStage::TxSigned;

        let transaction_id = self.rpc.submit_transaction(signed).await.map_err(|e| match e {
            RpcError::Rejected(reason) => FaucetError::NodeRejected(reason),
            RpcError::Unavailable(detail) => FaucetError::NodeUnavailable(detail),
        })?;
        *stage = DispenseStage::Submitted;

        // Funds are already on their way; a failed commit leaves the allowance
        // unconsumed but must not turn the payout into an error.
        match self.guard.commit(ticket).await {
            Ok(()) => *stage = DispenseStage::GuardCommitted,
            Err(err) => error!(ip, %transaction_id, "Failed to record IP usage after broadcast: {}", err),
        }

        Ok(transaction_id)
    }
}

fn parse_destination(address: Option<&str>, context: &FaucetContext) -> FaucetResult<Address> {
    let address = address.map(str::trim).filter(|a| !a.is_empty()).ok_or(FaucetError::MissingAddress)?;
    Ok(decode_address(address, context.prefix)?)
}
