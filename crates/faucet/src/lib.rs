//! Kaspa faucet service
//!
//! Dispenses a fixed amount of KAS to a requested address, at most once per
//! source IP per rolling 24 hours:
//! - Usage guard over a persistent per-IP ledger
//! - First-fit UTXO selection against live node state
//! - Transaction assembly and Schnorr signing
//! - Submission through the node's gRPC endpoint
//! - HTTP API and Prometheus metrics

pub mod api;
pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod metrics;
pub mod rpc;
pub mod selector;
pub mod service;
pub mod signer;

pub use config::FaucetConfig;
pub use context::FaucetContext;
pub use error::{FaucetError, FaucetResult, StartupError};
pub use guard::{GuardError, UsageGuard, UsageTicket};
pub use rpc::{GrpcNodeRpc, NodeRpc, RpcError, UnspentOutput};
pub use service::{DispenseStage, FaucetService};
