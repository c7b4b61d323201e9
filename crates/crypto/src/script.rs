//! Locking scripts come from `kaspa_txscript`; the Schnorr unlocking script
//! is assembled with its script builder.

use kaspa_consensus_core::hashing::sighash_type::SigHashType;
pub use kaspa_txscript::pay_to_address_script;
use kaspa_txscript::script_builder::{ScriptBuilder, ScriptBuilderError};

/// Unlocking script for a P2PK input: a single push of the signature with the
/// hash type appended.
pub fn schnorr_signature_script(signature: &[u8; 64], hash_type: SigHashType) -> Result<Vec<u8>, ScriptBuilderError> {
    let mut data = [0u8; 65];
    data[..64].copy_from_slice(signature);
    data[64] = hash_type.to_u8();
    Ok(ScriptBuilder::new().add_data(&data)?.drain())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{address_from_x_only_public_key, Address, Prefix, Version};
    use kaspa_consensus_core::hashing::sighash_type::SIG_HASH_ALL;
    use kaspa_txscript::opcodes::codes::{OpCheckSig, OpData32, OpData65};

    #[test]
    fn test_pay_to_pub_key() {
        let key = [7u8; 32];
        let spk = pay_to_address_script(&address_from_x_only_public_key(Prefix::Mainnet, &key));

        let script = spk.script();
        assert_eq!(spk.version(), 0);
        assert_eq!(script.len(), 34);
        assert_eq!(script[0], OpData32);
        assert_eq!(&script[1..33], &key);
        assert_eq!(script[33], OpCheckSig);
    }

    #[test]
    fn test_pay_to_ecdsa_and_script_hash() {
        let ecdsa = Address::new(Prefix::Testnet, Version::PubKeyECDSA, &[2u8; 33]);
        assert_eq!(pay_to_address_script(&ecdsa).script().len(), 35);

        let p2sh = Address::new(Prefix::Testnet, Version::ScriptHash, &[3u8; 32]);
        assert_eq!(pay_to_address_script(&p2sh).script().len(), 35);
    }

    #[test]
    fn test_signature_script_layout() {
        let signature = [9u8; 64];
        let script = schnorr_signature_script(&signature, SIG_HASH_ALL).unwrap();

        assert_eq!(script.len(), 66);
        assert_eq!(script[0], OpData65);
        assert_eq!(&script[1..65], &signature);
        assert_eq!(script[65], 0x01);
    }
}
