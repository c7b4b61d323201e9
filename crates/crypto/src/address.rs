//! Parsing of untrusted address strings.
//!
//! `kaspa_addresses` expects well-formed input and panics on a payload that
//! is too short or does not fit its version, so the shape of the string is
//! checked here before it is handed over.

pub use kaspa_addresses::{Address, AddressError, Prefix, Version};
use thiserror::Error;

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const CHECKSUM_LENGTH: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressDecodeError {
    #[error("Address mixes upper and lower case characters")]
    MixedCase,

    #[error("Wrong address prefix: expected {expected}, got {actual}")]
    WrongPrefix { expected: Prefix, actual: Prefix },

    #[error("Invalid length for a {version} address: expected {expected} characters, got {actual}")]
    InvalidLength { version: Version, expected: usize, actual: usize },

    #[error(transparent)]
    Malformed(#[from] AddressError),
}

pub fn address_from_x_only_public_key(prefix: Prefix, public_key: &[u8; 32]) -> Address {
    Address::new(prefix, Version::PubKey, public_key)
}

/// Decodes `s` and requires it to belong to the `expected` network.
/// All-uppercase input is accepted.
pub fn decode_address(s: &str, expected: Prefix) -> Result<Address, AddressDecodeError> {
    let has_lower = s.bytes().any(|c| c.is_ascii_lowercase());
    let has_upper = s.bytes().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(AddressDecodeError::MixedCase);
    }
    let s = s.to_ascii_lowercase();

    let (prefix, body) = s.split_once(':').ok_or(AddressError::MissingPrefix)?;
    let actual = Prefix::try_from(prefix)?;
    if actual != expected {
        return Err(AddressDecodeError::WrongPrefix { expected, actual });
    }

    let version = leading_version(body)?;
    let expected_length = encoded_length(version.public_key_len());
    if body.len() != expected_length {
        return Err(AddressDecodeError::InvalidLength { version, expected: expected_length, actual: body.len() });
    }

    Ok(Address::try_from(s.as_str())?)
}

fn char_value(c: u8) -> Result<u8, AddressError> {
    CHARSET
        .iter()
        .position(|&b| b == c)
        .map(|p| p as u8)
        .ok_or(AddressError::DecodingError(c as char))
}

/// The version byte spans the first two 5-bit groups.
fn leading_version(body: &str) -> Result<Version, AddressError> {
    match body.as_bytes() {
        [first, second, ..] => Version::try_from((char_value(*first)? << 3) | (char_value(*second)? >> 2)),
        _ => Err(AddressError::InvalidAddress),
    }
}

/// Characters after the separator for a payload of `payload_len` bytes.
fn encoded_length(payload_len: usize) -> usize {
    ((payload_len + 1) * 8 + 4) / 5 + CHECKSUM_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_MAINNET: &str = "kaspa:qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqkx9awp4e";
    const ZERO_TESTNET: &str = "kaspatest:qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqhqrxplya";
    const ZERO_SCRIPT_HASH: &str = "kaspa:pqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqlmtfk4dg";
    const ZERO_ECDSA: &str = "kaspa:qyqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqudzvdn9c";

    #[test]
    fn test_known_encodings() {
        assert_eq!(address_from_x_only_public_key(Prefix::Mainnet, &[0u8; 32]).to_string(), ZERO_MAINNET);
        assert_eq!(address_from_x_only_public_key(Prefix::Testnet, &[0u8; 32]).to_string(), ZERO_TESTNET);
        assert_eq!(Address::new(Prefix::Mainnet, Version::ScriptHash, &[0u8; 32]).to_string(), ZERO_SCRIPT_HASH);
        assert_eq!(Address::new(Prefix::Mainnet, Version::PubKeyECDSA, &[0u8; 33]).to_string(), ZERO_ECDSA);
    }

    #[test]
    fn test_decode_known_addresses() {
        let address = decode_address(ZERO_MAINNET, Prefix::Mainnet).unwrap();
        assert_eq!(address.version, Version::PubKey);
        assert_eq!(address.payload.as_slice(), &[0u8; 32]);

        let ecdsa = decode_address(ZERO_ECDSA, Prefix::Mainnet).unwrap();
        assert_eq!(ecdsa.version, Version::PubKeyECDSA);
        assert_eq!(ecdsa.payload.len(), 33);

        let script_hash = decode_address(ZERO_SCRIPT_HASH, Prefix::Mainnet).unwrap();
        assert_eq!(script_hash.version, Version::ScriptHash);
    }

    #[test]
    fn test_roundtrip_nonzero_payload() {
        let payload: [u8; 32] = std::array::from_fn(|i| i as u8);
        let address = address_from_x_only_public_key(Prefix::Devnet, &payload);
        assert_eq!(decode_address(&address.to_string(), Prefix::Devnet).unwrap(), address);
    }

    #[test]
    fn test_uppercase_address_is_accepted() {
        let upper = ZERO_MAINNET.to_ascii_uppercase();
        assert_eq!(decode_address(&upper, Prefix::Mainnet).unwrap().prefix, Prefix::Mainnet);
        assert_eq!(decode_address("Kaspa:qqqqqqqqqqqq", Prefix::Mainnet), Err(AddressDecodeError::MixedCase));
    }

    #[test]
    fn test_wrong_network_is_rejected() {
        assert_eq!(
            decode_address(ZERO_TESTNET, Prefix::Mainnet),
            Err(AddressDecodeError::WrongPrefix { expected: Prefix::Mainnet, actual: Prefix::Testnet })
        );
    }

    #[test]
    fn test_malformed_input_is_an_error_not_a_panic() {
        let decode = |s: &str| decode_address(s, Prefix::Mainnet);

        assert_eq!(decode("qqqqqqqq"), Err(AddressError::MissingPrefix.into()));
        assert_eq!(decode("bitcoin:qqqqqqqqqqqq"), Err(AddressError::InvalidPrefix("bitcoin".to_string()).into()));
        assert_eq!(decode("kaspa:"), Err(AddressError::InvalidAddress.into()));
        assert_eq!(decode("kaspa:q"), Err(AddressError::InvalidAddress.into()));
        assert_eq!(
            decode("kaspa:qqqq"),
            Err(AddressDecodeError::InvalidLength { version: Version::PubKey, expected: 61, actual: 4 })
        );
        assert_eq!(decode("kaspa:bqqqqqqqqqqq"), Err(AddressError::DecodingError('b').into()));
        // 'z' carries version 16
        assert_eq!(decode("kaspa:zqqqqqqqqqqq"), Err(AddressError::InvalidVersion(16).into()));

        // An ECDSA version with a Schnorr-sized payload.
        let short_ecdsa = &ZERO_ECDSA[..ZERO_ECDSA.len() - 2];
        assert_eq!(
            decode(short_ecdsa),
            Err(AddressDecodeError::InvalidLength { version: Version::PubKeyECDSA, expected: 63, actual: 61 })
        );

        // A bad character past the version groups is left to the codec.
        let mut bad_char = ZERO_MAINNET.to_string();
        bad_char.replace_range(20..21, "b");
        assert_eq!(decode(&bad_char), Err(AddressError::DecodingError('b').into()));

        let mut corrupted = ZERO_MAINNET.to_string();
        corrupted.pop();
        corrupted.push('q');
        assert_eq!(decode(&corrupted), Err(AddressError::BadChecksum.into()));
    }
}
