use crate::builder::DraftTransaction;
use faucet_crypto::schnorr::SchnorrError;
use faucet_crypto::script::schnorr_signature_script;
use faucet_crypto::KeyPair;
use kaspa_consensus_core::hashing::sighash::{calc_schnorr_signature_hash, SigHashReusedValues};
use kaspa_consensus_core::hashing::sighash_type::SIG_HASH_ALL;
use kaspa_consensus_core::tx::{PopulatedTransaction, Transaction};
use kaspa_txscript::script_builder::ScriptBuilderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SigningError {
    #[error("Transaction has {inputs} inputs but {entries} UTXO entries")]
    MissingEntries { inputs: usize, entries: usize },

    #[error("Signature of input {index}: {source}")]
    Schnorr { index: usize, source: SchnorrError },

    #[error("Signature script of input {index}: {source}")]
    Script { index: usize, source: ScriptBuilderError },
}

/// A transaction whose every input carries a signature script.
///
/// Only `sign_transaction` creates one; submitting moves it, so it is
/// handed to the node at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction(Transaction);

impl SignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.0
    }

    pub fn into_inner(self) -> Transaction {
        self.0
    }
}

/// Sign every input with SIGHASH_ALL. Either all inputs are signed or none.
pub fn sign_transaction(draft: DraftTransaction, key: &KeyPair) -> Result<SignedTransaction, SigningError> {
    let DraftTransaction { mut tx, entries } = draft;
    if entries.len() != tx.inputs.len() {
        return Err(SigningError::MissingEntries { inputs: tx.inputs.len(), entries: entries.len() });
    }

    let scripts = {
        let populated = PopulatedTransaction::new(&tx, entries);
        let mut reused = SigHashReusedValues::new();
        let mut scripts = Vec::with_capacity(tx.inputs.len());
        for index in 0..tx.inputs.len() {
            let digest = calc_schnorr_signature_hash(&populated, index, SIG_HASH_ALL, &mut reused);
            let signature = key
                .sign_prehash(&digest.as_bytes())
                .map_err(|source| SigningError::Schnorr { index, source })?;
            let script = schnorr_signature_script(&signature, SIG_HASH_ALL)
                .map_err(|source| SigningError::Script { index, source })?;
            scripts.push(script);
        }
        scripts
    };

    for (input, script) in tx.inputs.iter_mut().zip(scripts) {
        input.signature_script = script;
    }
    // Inputs changed, recompute the cached id.
    tx.finalize();
    Ok(SignedTransaction(tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_transaction;
    use crate::rpc::UnspentOutput;
    use crate::selector::SpendSelection;
    use faucet_crypto::schnorr::verify_prehash;
    use faucet_crypto::script::pay_to_address_script;
    use faucet_crypto::{address_from_x_only_public_key, Prefix};
    use kaspa_consensus_core::tx::{TransactionId, TransactionOutpoint, UtxoEntry};

    fn draft_for(key: &KeyPair, amounts: &[u64]) -> DraftTransaction {
        let faucet = address_from_x_only_public_key(Prefix::Testnet, &key.x_only_public_key());
        let script = pay_to_address_script(&faucet);
        let inputs = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| UnspentOutput {
                outpoint: TransactionOutpoint::new(TransactionId::from_bytes([i as u8; 32]), 0),
                entry: UtxoEntry::new(*amount, script.clone(), 1, false),
            })
            .collect();
        let total: u64 = amounts.iter().sum();
        let selection = SpendSelection { inputs, total_selected: total, change: total - 1_000 };
        build_transaction(&selection, &faucet, 1_000, &script)
    }

    #[test]
    fn test_every_input_gets_a_valid_signature() {
        let key = KeyPair::random();
        let draft = draft_for(&key, &[5_000, 6_000, 7_000]);
        let unsigned = draft.tx.clone();
        let entries = draft.entries.clone();

        let signed = sign_transaction(draft, &key).unwrap();
        let tx = signed.transaction();
        assert_eq!(tx.inputs.len(), 3);

        let populated = PopulatedTransaction::new(&unsigned, entries);
        let mut reused = SigHashReusedValues::new();
        for (index, input) in tx.inputs.iter().enumerate() {
            let script = &input.signature_script;
            assert_eq!(script.len(), 66);
            assert_eq!(script[65], SIG_HASH_ALL.to_u8());

            let digest = calc_schnorr_signature_hash(&populated, index, SIG_HASH_ALL, &mut reused);
            assert!(verify_prehash(&key.x_only_public_key(), &digest.as_bytes(), &script[1..65]).unwrap());
        }
        // Signing touches nothing but the signature scripts.
        assert_eq!(tx.outputs, unsigned.outputs);
        assert_eq!(tx.id(), unsigned.id());
    }

    #[test]
    fn test_missing_entry_aborts_signing() {
        let key = KeyPair::random();
        let mut draft = draft_for(&key, &[5_000, 6_000]);
        draft.entries.pop();

        let err = sign_transaction(draft, &key).unwrap_err();
        assert!(matches!(err, SigningError::MissingEntries { inputs: 2, entries: 1 }));
    }

    #[test]
    fn test_into_inner() {
        let key = KeyPair::random();
        let signed = sign_transaction(draft_for(&key, &[2_000]), &key).unwrap();
        let tx = signed.clone().into_inner();
        assert_eq!(&tx, signed.transaction());
    }
}
