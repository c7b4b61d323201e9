use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::schnorr::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchnorrError {
    #[error("Invalid Hex String")]
    HexError(#[from] hex::FromHexError),
    #[error("Invalid Key")]
    KeyError,
    #[error("Signing Failed: {0}")]
    SigningFailed(String),
}

/// secp256k1 key signing BIP340 Schnorr signatures.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    pub fn random() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self { signing_key }
    }

    pub fn from_private_key_hex(hex_str: &str) -> Result<Self, SchnorrError> {
        let bytes = hex::decode(hex_str.trim())?;
        let signing_key = SigningKey::from_bytes(&bytes).map_err(|_| SchnorrError::KeyError)?;
        Ok(Self { signing_key })
    }

    pub fn x_only_public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes().into()
    }

    /// Signs a 32-byte digest as-is, without hashing it again.
    pub fn sign_prehash(&self, digest: &[u8; 32]) -> Result<[u8; 64], SchnorrError> {
        let mut aux_rand = [0u8; 32];
        OsRng.fill_bytes(&mut aux_rand);
        let signature = self
            .signing_key
            .sign_raw(digest, &aux_rand)
            .map_err(|e| SchnorrError::SigningFailed(e.to_string()))?;
        Ok(signature.to_bytes())
    }
}

pub fn verify_prehash(x_only_public_key: &[u8], digest: &[u8; 32], signature_bytes: &[u8]) -> Result<bool, SchnorrError> {
    let public_key = VerifyingKey::from_bytes(x_only_public_key).map_err(|_| SchnorrError::KeyError)?;
    let signature = Signature::try_from(signature_bytes).map_err(|_| SchnorrError::KeyError)?;

    Ok(public_key.verify_prehash(digest, &signature).is_ok())
}
