use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::extract::JsonBody;
use crate::langflow::service::{run_chat, FlowReply};
use crate::models::envelope::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LangflowRequest {
    pub message: Option<String>,
}

/// POST /api/v1/langflow/
pub async fn handle_langflow(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LangflowRequest>,
) -> Result<ApiResponse<Value>, AppError> {
    let message = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::validation("message", "A message or prompt is required"))?;

    info!("Fetching flow response...");
    let reply = run_chat(state.flow.as_ref(), &state.flow_settings, message)
        .await
        .map_err(|e| AppError::Upstream(format!("Langflow response error {e}")))?;

    let data = match reply {
        FlowReply {
            text: Some(text), ..
        } => Value::String(text),
        FlowReply {
            text: None,
            streaming: true,
        } => Value::Null,
        FlowReply {
            text: None,
            streaming: false,
        } => {
            return Err(AppError::Upstream(
                "Langflow response error: the flow returned no message output".to_string(),
            ))
        }
    };

    Ok(ApiResponse::ok(data, "Response fetch successful"))
}
