//! Faucet configuration
//!
//! Sources, later ones winning: an optional TOML file, `FAUCET_*`
//! environment variables, command-line flags.

use crate::error::StartupError;
use clap::Parser;
use faucet_common::types::SOMPI_PER_KASPA;
use faucet_common::utils::config::load_config;
use faucet_common::utils::logging::LoggingConfig;
use faucet_common::NetworkType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_PREFIX: &str = "FAUCET";

/// Faucet service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaucetConfig {
    /// HTTP listen address
    pub listen: String,

    /// Node gRPC endpoint, `host:port` or a `grpc://` URL
    pub rpc_server: String,

    /// Timeout for a single node RPC call (seconds)
    pub rpc_timeout_secs: u64,

    /// Faucet private key, hex encoded
    pub private_key: String,

    /// Usage ledger directory, used when `database_url` is unset
    pub db_path: PathBuf,

    /// Postgres URL of a usage ledger shared between faucet instances
    pub database_url: Option<String>,

    /// Directory for faucet.log and faucet_err.log; console only when unset
    pub log_dir: Option<PathBuf>,

    pub log_level: String,

    pub log_format: String,

    pub testnet: bool,
    pub simnet: bool,
    pub devnet: bool,

    /// Amount sent per request (sompi)
    pub send_amount_sompi: u64,

    /// Fixed transaction fee (sompi)
    pub fee_sompi: u64,

    /// Overrides the network's coinbase maturity
    pub coinbase_maturity: Option<u64>,

    /// Minimum time between two payouts to the same IP (seconds)
    pub request_interval_secs: u64,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8081".to_string(),
            rpc_server: String::new(),
            rpc_timeout_secs: 30,
            private_key: String::new(),
            db_path: PathBuf::from("./faucet_data"),
            database_url: None,
            log_dir: None,
            log_level: "info".to_string(),
            log_format: "compact".to_string(),
            testnet: false,
            simnet: false,
            devnet: false,
            send_amount_sompi: SOMPI_PER_KASPA, // 1 KAS
            fee_sompi: 3000,
            coinbase_maturity: None,
            request_interval_secs: 24 * 60 * 60,
        }
    }
}

impl FaucetConfig {
    /// Load the file (if any) and the environment, then apply CLI overrides.
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let mut config: FaucetConfig = load_config(args.config.as_deref(), ENV_PREFIX)?;
        args.apply(&mut config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StartupError> {
        if self.rpc_server.trim().is_empty() {
            return Err(StartupError::InvalidConfig("rpc_server is required".to_string()));
        }
        if self.private_key.trim().is_empty() {
            return Err(StartupError::InvalidConfig("private_key is required".to_string()));
        }
        let selected = [self.testnet, self.simnet, self.devnet].iter().filter(|flag| **flag).count();
        if selected > 1 {
            return Err(StartupError::InvalidConfig(
                "Multiple networks selected; use at most one of testnet, simnet and devnet".to_string(),
            ));
        }
        if self.send_amount_sompi == 0 {
            return Err(StartupError::InvalidConfig("send_amount_sompi must be positive".to_string()));
        }
        if self.send_amount_sompi.checked_add(self.fee_sompi).is_none() {
            return Err(StartupError::InvalidConfig("send amount plus fee overflows".to_string()));
        }
        if self.request_interval_secs == 0 {
            return Err(StartupError::InvalidConfig("request_interval_secs must be positive".to_string()));
        }
        if let Some(url) = &self.database_url {
            if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                return Err(StartupError::InvalidConfig(
                    "database_url must be a postgres:// or postgresql:// URL".to_string(),
                ));
            }
        }
        self.listen
            .parse::<std::net::SocketAddr>()
            .map_err(|e| StartupError::InvalidConfig(format!("listen address {}: {}", self.listen, e)))?;
        Ok(())
    }

    pub fn network(&self) -> NetworkType {
        if self.testnet {
            NetworkType::Testnet
        } else if self.simnet {
            NetworkType::Simnet
        } else if self.devnet {
            NetworkType::Devnet
        } else {
            NetworkType::Mainnet
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
            format: self.log_format.clone(),
        }
    }
}

/// Faucet service CLI
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config file path (TOML)
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// HTTP listen address
    #[arg(long)]
    pub listen: Option<String>,

    /// Node RPC server
    #[arg(short = 's', long = "rpcserver")]
    pub rpc_server: Option<String>,

    /// Faucet private key (hex)
    #[arg(long = "private-key")]
    pub private_key: Option<String>,

    /// Usage ledger directory
    #[arg(long = "dbpath")]
    pub db_path: Option<PathBuf>,

    /// Postgres URL of a shared usage ledger
    #[arg(long = "dburl")]
    pub database_url: Option<String>,

    /// Directory to log output
    #[arg(long = "logdir")]
    pub log_dir: Option<PathBuf>,

    /// Logging level
    #[arg(short = 'd', long = "loglevel")]
    pub log_level: Option<String>,

    /// Use the test network
    #[arg(long, conflicts_with_all = ["simnet", "devnet"])]
    pub testnet: bool,

    /// Use the simulation test network
    #[arg(long, conflicts_with = "devnet")]
    pub simnet: bool,

    /// Use the development test network
    #[arg(long)]
    pub devnet: bool,
}

impl Args {
    pub fn apply(&self, config: &mut FaucetConfig) {
        if let Some(listen) = &self.listen {
            config.listen = listen.clone();
        }
        if let Some(rpc_server) = &self.rpc_server {
            config.rpc_server = rpc_server.clone();
        }
        if let Some(key) = &self.private_key {
            config.private_key = key.clone();
        }
        if let Some(db_path) = &self.db_path {
            config.db_path = db_path.clone();
        }
        if let Some(url) = &self.database_url {
            config.database_url = Some(url.clone());
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = Some(log_dir.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        // A network flag on the command line replaces whatever the file chose.
        if self.testnet || self.simnet || self.devnet {
            config.testnet = self.testnet;
            config.simnet = self.simnet;
            config.devnet = self.devnet;
        }
    }
}
