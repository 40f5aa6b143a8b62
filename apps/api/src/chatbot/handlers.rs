//! Axum route handlers for the Chatbot API.

use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::chatbot::builder::{build_chat_request, build_education_request, ChatKind, ResumeInput};
use crate::chatbot::prompts::DEFAULT_EDUCATION_QUERY;
use crate::errors::AppError;
use crate::extract::{JsonBody, MultipartBody};
use crate::models::envelope::ApiResponse;
use crate::normalize::parse_json_or_fallback;
use crate::state::AppState;
use crate::uploads::{read_form, StoredUpload};

const RESUME_FIELDS: &[&str] = &["resumeFile", "resume"];
const QUERY_FIELDS: &[&str] = &["userQuery", "query"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationQueryRequest {
    pub user_query: Option<String>,
}

/// POST /api/v1/chatbot/ and /api/v1/chatbot/analyze-resume
///
/// Multipart. With a resume file the reply is a JSON evaluation (or the
/// fallback object); with only a query it is the education assistant's text.
pub async fn handle_chatbot(
    State(state): State<AppState>,
    MultipartBody(multipart): MultipartBody,
) -> Result<ApiResponse<Value>, AppError> {
    let form = read_form(multipart, RESUME_FIELDS).await?;
    let query = form.text_field(QUERY_FIELDS);

    // Keep the stored copy alive until the provider call has finished.
    let (stored, resume_bytes) = match &form.file {
        Some(file) => {
            let stored = StoredUpload::persist(&state.upload_dir, file).await?;
            let bytes = stored.read().await?;
            (Some(stored), Some(bytes))
        }
        None => (None, None),
    };

    let resume = match (&form.file, &resume_bytes) {
        (Some(file), Some(bytes)) => Some(ResumeInput {
            bytes,
            mime_type: &file.mime_type,
        }),
        _ => None,
    };

    let request = build_chat_request(query, resume).ok_or_else(|| {
        AppError::validation("userQuery", "A resume file or a userQuery is required")
    })?;

    info!(kind = ?request.kind, "Handling chatbot request");
    let raw = state.llm.generate(request.contents).await?;
    drop(stored);

    Ok(match request.kind {
        ChatKind::ResumeEvaluation => {
            ApiResponse::ok(parse_json_or_fallback(&raw), "Resume analysis successful")
        }
        ChatKind::EducationReply => ApiResponse::ok(
            Value::String(raw.trim().to_string()),
            "Chatbot response fetch successful",
        ),
    })
}

/// POST /api/v1/chatbot/education-query
pub async fn handle_education_query(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<EducationQueryRequest>,
) -> Result<ApiResponse<String>, AppError> {
    let query = request
        .user_query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or(DEFAULT_EDUCATION_QUERY);

    info!("Handling education query");
    let raw = state.llm.generate(build_education_request(query)).await?;

    Ok(ApiResponse::ok(
        raw.trim().to_string(),
        "Chatbot response fetch successful",
    ))
}
