//! HTTP API for faucet service

use super::error::FaucetResult;
use super::service::FaucetService;
use axum::{
    extract::{ConnectInfo, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct RequestMoneyQuery {
    pub address: Option<String>,
}

/// `GET /request_money?address=...`, answers with the transaction id.
pub async fn request_money_handler(
    State(service): State<Arc<FaucetService>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Query(query): Query<RequestMoneyQuery>,
) -> FaucetResult<Json<String>> {
    let ip = remote.ip().to_string();
    info!("Money request from {}: address={:?}", ip, query.address);

    let transaction_id = service.dispense(&ip, query.address.as_deref()).await?;
    Ok(Json(transaction_id.to_string()))
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Prometheus text exposition
pub async fn metrics_handler(State(service): State<Arc<FaucetService>>) -> Result<String, StatusCode> {
    service.metrics().gather().map_err(|err| {
        error!("Failed to gather metrics: {}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

pub fn router(service: Arc<FaucetService>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/request_money", get(request_money_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service)
}
