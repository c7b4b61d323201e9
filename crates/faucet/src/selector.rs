//! Spendable-output discovery and first-fit selection.

use crate::rpc::{NodeRpc, RpcError, UnspentOutput};
use faucet_common::types::sompi_to_kaspa;
use faucet_crypto::Address;
use kaspa_consensus_core::tx::UtxoEntry;
use std::fmt;
use tracing::debug;

/// Blue-score depth a regular output needs before the faucet spends it.
pub const REQUIRED_CONFIRMATIONS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendSelection {
    pub inputs: Vec<UnspentOutput>,
    pub total_selected: u64,
    pub change: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsufficientFunds {
    pub required: u64,
    pub available: u64,
}

impl fmt::Display for InsufficientFunds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Insufficient funds for send: {:.8} KAS required, while only {:.8} KAS available (short by {} sompi)",
            sompi_to_kaspa(self.required),
            sompi_to_kaspa(self.available),
            self.shortfall()
        )
    }
}

impl std::error::Error for InsufficientFunds {}

impl InsufficientFunds {
    pub fn shortfall(&self) -> u64 {
        self.required.saturating_sub(self.available)
    }

    pub fn shortfall_kaspa(&self) -> f64 {
        sompi_to_kaspa(self.shortfall())
    }
}

pub fn is_spendable(entry: &UtxoEntry, virtual_blue_score: u64, coinbase_maturity: u64) -> bool {
    let depth = if entry.is_coinbase { coinbase_maturity } else { REQUIRED_CONFIRMATIONS };
    entry.block_daa_score.saturating_add(depth) < virtual_blue_score
}

/// Fetch the faucet's outputs and the virtual blue score, keeping only the
/// mature outputs. Node order is preserved.
pub async fn fetch_spendable_utxos(
    rpc: &dyn NodeRpc,
    address: &Address,
    coinbase_maturity: u64,
) -> Result<Vec<UnspentOutput>, RpcError> {
    let utxos = rpc.get_utxos_by_addresses(std::slice::from_ref(address)).await?;
    let blue_score = rpc.get_virtual_selected_parent_blue_score().await?;

    let fetched = utxos.len();
    let spendable: Vec<UnspentOutput> = utxos
        .into_iter()
        .filter(|utxo| is_spendable(&utxo.entry, blue_score, coinbase_maturity))
        .collect();
    debug!(fetched, spendable = spendable.len(), blue_score, "Fetched faucet UTXOs");

    Ok(spendable)
}

/// Take outputs in order until they cover `target`.
pub fn select_utxos(spendable: Vec<UnspentOutput>, target: u64) -> Result<SpendSelection, InsufficientFunds> {
    let mut inputs = Vec::new();
    let mut total_selected: u64 = 0;

    for utxo in spendable {
        total_selected = total_selected.saturating_add(utxo.entry.amount);
        inputs.push(utxo);
        if total_selected >= target {
            return Ok(SpendSelection {
                inputs,
                total_selected,
                change: total_selected - target,
            });
        }
    }

    Err(InsufficientFunds { required: target, available: total_selected })
}
