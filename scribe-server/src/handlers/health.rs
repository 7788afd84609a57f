use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::server::ScribeServer;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
    pub version: String,
    pub uptime: u64,
    pub backends: BTreeMap<String, String>,
}

/// Health check handler
pub async fn health_check(State(server): State<ScribeServer>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: server.config.name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: server.uptime_secs(),
        backends: server.config.backends.clone(),
    })
}
