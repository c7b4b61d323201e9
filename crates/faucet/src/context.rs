//! Process-wide faucet state, built once before serving and never mutated.

use crate::config::FaucetConfig;
use crate::error::StartupError;
use chrono::Duration;
use faucet_common::traits::UsageStore;
use faucet_common::NetworkParams;
use faucet_crypto::script::pay_to_address_script;
use faucet_crypto::{address_from_x_only_public_key, Address, KeyPair, Prefix};
use faucet_storage::{PostgresUsageStore, SledUsageStore};
use kaspa_consensus_core::tx::ScriptPublicKey;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::info;

const DATABASE_CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

pub struct FaucetContext {
    pub network: NetworkParams,
    pub prefix: Prefix,
    key: KeyPair,
    address: Address,
    script_public_key: ScriptPublicKey,
    pub send_amount: u64,
    pub fee: u64,
    pub request_interval: Duration,
}

impl FaucetContext {
    pub fn new(
        key: KeyPair,
        network: NetworkParams,
        send_amount: u64,
        fee: u64,
        request_interval: Duration,
    ) -> Self {
        let prefix = Prefix::from(network.network);
        let address = address_from_x_only_public_key(prefix, &key.x_only_public_key());
        let script_public_key = pay_to_address_script(&address);

        Self {
            network,
            prefix,
            key,
            address,
            script_public_key,
            send_amount,
            fee,
            request_interval,
        }
    }

    /// Decode the key and derive the faucet address and locking script.
    pub fn from_config(config: &FaucetConfig) -> Result<Self, StartupError> {
        config.validate()?;

        let key_hex = config.private_key.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let key = KeyPair::from_private_key_hex(key_hex).map_err(|e| StartupError::InvalidPrivateKey(e.to_string()))?;

        let mut network = config.network().params();
        if let Some(maturity) = config.coinbase_maturity {
            network = network.with_coinbase_maturity(maturity);
        }
        let request_interval = i64::try_from(config.request_interval_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| StartupError::InvalidConfig("request_interval_secs is too large".to_string()))?;

        let context = Self::new(key, network, config.send_amount_sompi, config.fee_sompi, request_interval);
        info!(network = %network.network, address = %context.address, "Faucet context ready");
        Ok(context)
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn script_public_key(&self) -> &ScriptPublicKey {
        &self.script_public_key
    }

    /// Amount the selected inputs must cover.
    pub fn target_amount(&self) -> u64 {
        self.send_amount.saturating_add(self.fee)
    }
}

/// The shared Postgres ledger when `database_url` is set, else the local sled one.
pub fn open_usage_store(config: &FaucetConfig) -> Result<Arc<dyn UsageStore>, StartupError> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresUsageStore::connect(url, DATABASE_CONNECT_TIMEOUT)
                .map_err(|e| StartupError::Store(format!("{:#}", e)))?;
            info!("Usage store: Postgres");
            Ok(Arc::new(store))
        }
        None => {
            let store = SledUsageStore::new(&config.db_path).map_err(|e| StartupError::Store(format!("{:#}", e)))?;
            info!("Usage store opened at: {}", config.db_path.display());
            Ok(Arc::new(store))
        }
    }
}
