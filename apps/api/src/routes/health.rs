use chrono::Utc;
use serde_json::{json, Value};

use crate::models::envelope::ApiResponse;

/// GET /api/v1/ and GET /health
/// Liveness probe with service version.
pub async fn health_handler() -> ApiResponse<Value> {
    ApiResponse::ok(
        json!({
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
        }),
        "OK",
    )
}
