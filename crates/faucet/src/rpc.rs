//! Node RPC access: the `NodeRpc` seam and its gRPC client.

use crate::signer::SignedTransaction;
use async_trait::async_trait;
use faucet_crypto::Address;
use kaspa_consensus_core::tx::{Transaction, TransactionId, TransactionOutpoint, UtxoEntry};
use kaspa_grpc_client::GrpcClient;
use kaspa_rpc_core::api::rpc::RpcApi;
use kaspa_rpc_core::notify::mode::NotificationMode;
use kaspa_rpc_core::RpcTransaction;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The node could not be reached or answered with something unusable.
    #[error("Node unavailable: {0}")]
    Unavailable(String),

    /// The node answered with an error; the message is the node's own.
    #[error("{0}")]
    Rejected(String),
}

/// One spendable candidate as reported by the node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnspentOutput {
    pub outpoint: TransactionOutpoint,
    pub entry: UtxoEntry,
}

#[async_trait]
pub trait NodeRpc: Send + Sync {
    async fn get_utxos_by_addresses(&self, addresses: &[Address]) -> Result<Vec<UnspentOutput>, RpcError>;
    async fn get_virtual_selected_parent_blue_score(&self) -> Result<u64, RpcError>;
    /// Broadcast once. Implementations must not retry.
    async fn submit_transaction(&self, tx: SignedTransaction) -> Result<TransactionId, RpcError>;
}

/// Display prefixes of the gRPC client's own failures. Anything else that
/// comes back from a call was produced by the node.
const TRANSPORT_FAILURES: &[&str] = &[
    "RPC request timeout",
    "Not connected to server",
    "GRPC client error",
    "GRPC invalid address schema",
    "Endpoint connection error",
    "RPC: channel",
    "Missing request payload",
    "Missing response payload",
    "Notify error",
];

/// Split a call failure into "the node said no" and "we never got an answer".
pub fn classify_error(err: kaspa_rpc_core::RpcError, connected: bool) -> RpcError {
    use kaspa_rpc_core::RpcError as NodeError;

    if !connected {
        return RpcError::Unavailable(err.to_string());
    }
    match err {
        NodeError::RejectedTransaction(_, reason) => RpcError::Rejected(reason),
        NodeError::RpcSubsystem(message) => RpcError::Rejected(message),
        NodeError::General(message) if TRANSPORT_FAILURES.iter().any(|p| message.starts_with(p)) => {
            RpcError::Unavailable(message)
        }
        NodeError::General(message) => RpcError::Rejected(message),
        other => RpcError::Unavailable(other.to_string()),
    }
}

/// `host:port` becomes `grpc://host:port`; explicit schemes are kept.
pub fn grpc_url(rpc_server: &str) -> String {
    let rpc_server = rpc_server.trim();
    if rpc_server.contains("://") {
        rpc_server.to_string()
    } else {
        format!("grpc://{}", rpc_server)
    }
}

fn to_rpc_transaction(tx: &Transaction) -> RpcTransaction {
    RpcTransaction::from(tx)
}

/// gRPC client for a Kaspa node.
pub struct GrpcNodeRpc {
    client: GrpcClient,
}

impl GrpcNodeRpc {
    pub async fn connect(rpc_server: &str, timeout: Duration) -> Result<Self, RpcError> {
        let url = grpc_url(rpc_server);
        info!(%url, "Connecting to node");
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);

        let client = GrpcClient::connect(
            NotificationMode::Direct,
            url,
            true,
            None,
            false,
            Some(timeout_ms),
            Default::default(),
        )
        .await
        .map_err(|e| {
            error!("Node connection failed: {}", e);
            RpcError::Unavailable(e.to_string())
        })?;
        info!("Connected to node");

        Ok(Self { client })
    }

    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            warn!("Error disconnecting from node: {}", e);
        }
    }

    fn classify(&self, err: kaspa_rpc_core::RpcError) -> RpcError {
        classify_error(err, self.client.is_connected())
    }
}

#[async_trait]
impl NodeRpc for GrpcNodeRpc {
    async fn get_utxos_by_addresses(&self, addresses: &[Address]) -> Result<Vec<UnspentOutput>, RpcError> {
        let started = Instant::now();
        trace!(?addresses, "get_utxos_by_addresses");
        let entries = self.client.get_utxos_by_addresses(addresses.to_vec()).await.map_err(|e| self.classify(e))?;
        debug!(
            utxo_count = entries.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "get_utxos_by_addresses"
        );

        Ok(entries
            .into_iter()
            .map(|entry| UnspentOutput { outpoint: entry.outpoint, entry: entry.utxo_entry })
            .collect())
    }

    async fn get_virtual_selected_parent_blue_score(&self) -> Result<u64, RpcError> {
        // The sink is the virtual's selected parent.
        let blue_score = self.client.get_sink_blue_score().await.map_err(|e| self.classify(e))?;
        trace!(blue_score, "get_sink_blue_score");
        Ok(blue_score)
    }

    async fn submit_transaction(&self, tx: SignedTransaction) -> Result<TransactionId, RpcError> {
        let started = Instant::now();
        let rpc_tx = to_rpc_transaction(tx.transaction());
        let id = self.client.submit_transaction(rpc_tx, false).await.map_err(|e| {
            let err = self.classify(e);
            debug!("submit_transaction failed: {}", err);
            err
        })?;
        debug!(%id, elapsed_ms = started.elapsed().as_millis() as u64, "submit_transaction");
        Ok(id)
    }
}
