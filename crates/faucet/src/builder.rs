use crate::selector::SpendSelection;
use faucet_crypto::script::pay_to_address_script;
use faucet_crypto::Address;
use kaspa_consensus_core::constants::TX_VERSION;
use kaspa_consensus_core::subnets::SUBNETWORK_ID_NATIVE;
use kaspa_consensus_core::tx::{ScriptPublicKey, Transaction, TransactionInput, TransactionOutput, UtxoEntry};

/// Every input is spent by a single Schnorr signature check.
pub const INPUT_SIG_OP_COUNT: u8 = 1;

/// Unsigned transaction together with the UTXO entries its inputs spend,
/// in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftTransaction {
    pub tx: Transaction,
    pub entries: Vec<UtxoEntry>,
}

/// Payment output first, change back to the faucet second. The change output
/// is present even when it carries zero sompi.
pub fn build_transaction(
    selection: &SpendSelection,
    destination: &Address,
    send_amount: u64,
    change_script: &ScriptPublicKey,
) -> DraftTransaction {
    let inputs = selection
        .inputs
        .iter()
        .map(|utxo| TransactionInput::new(utxo.outpoint, Vec::new(), 0, INPUT_SIG_OP_COUNT))
        .collect();
    let entries = selection.inputs.iter().map(|utxo| utxo.entry.clone()).collect();

    let outputs = vec![
        TransactionOutput::new(send_amount, pay_to_address_script(destination)),
        TransactionOutput::new(selection.change, change_script.clone()),
    ];

    let tx = Transaction::new(TX_VERSION, inputs, outputs, 0, SUBNETWORK_ID_NATIVE, 0, Vec::new());

    DraftTransaction { tx, entries }
}
