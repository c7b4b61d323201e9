//! Network selection and the consensus parameters the faucet depends on.

use kaspa_addresses::Prefix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coinbase maturity shared by all networks, in DAA score units.
pub const DEFAULT_COINBASE_MATURITY: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    #[default]
    Mainnet,
    Testnet,
    Simnet,
    Devnet,
}

impl NetworkType {
    pub fn params(self) -> NetworkParams {
        NetworkParams { network: self, coinbase_maturity: DEFAULT_COINBASE_MATURITY }
    }
}

impl From<NetworkType> for Prefix {
    fn from(network: NetworkType) -> Self {
        match network {
            NetworkType::Mainnet => Prefix::Mainnet,
            NetworkType::Testnet => Prefix::Testnet,
            NetworkType::Simnet => Prefix::Simnet,
            NetworkType::Devnet => Prefix::Devnet,
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkType::Mainnet => "mainnet",
            NetworkType::Testnet => "testnet",
            NetworkType::Simnet => "simnet",
            NetworkType::Devnet => "devnet",
        };
        f.write_str(name)
    }
}

impl FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(NetworkType::Mainnet),
            "testnet" => Ok(NetworkType::Testnet),
            "simnet" => Ok(NetworkType::Simnet),
            "devnet" => Ok(NetworkType::Devnet),
            _ => Err(format!("Unknown network: {}", s)),
        }
    }
}

/// Parameters of the active network, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    pub network: NetworkType,
    pub coinbase_maturity: u64,
}

impl NetworkParams {
    pub fn with_coinbase_maturity(mut self, coinbase_maturity: u64) -> Self {
        self.coinbase_maturity = coinbase_maturity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_prefixes() {
        assert_eq!(Prefix::from(NetworkType::Mainnet).to_string(), "kaspa");
        assert_eq!(Prefix::from(NetworkType::Testnet).to_string(), "kaspatest");
        assert_eq!(Prefix::from(NetworkType::Simnet).to_string(), "kaspasim");
        assert_eq!(Prefix::from(NetworkType::Devnet).to_string(), "kaspadev");
    }

    #[test]
    fn test_network_parsing() {
        assert_eq!(NetworkType::from_str("TestNet").unwrap(), NetworkType::Testnet);
        assert!(NetworkType::from_str("regtest").is_err());
    }

    #[test]
    fn test_coinbase_maturity_override() {
        let params = NetworkType::Devnet.params().with_coinbase_maturity(5);
        assert_eq!(params.coinbase_maturity, 5);
        assert_eq!(params.network, NetworkType::Devnet);
    }
}
