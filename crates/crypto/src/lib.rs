//! Kaspa key handling for a single-key faucet wallet: address parsing,
//! BIP340 signing and the scripts that carry the signatures.

pub mod address;
pub mod schnorr;
pub mod script;

pub use address::{address_from_x_only_public_key, decode_address, Address, AddressDecodeError, Prefix, Version};
pub use schnorr::{KeyPair, SchnorrError};
