//! Axum route handlers for the Video Summary API.

use axum::{
    async_trait,
    extract::{FromRequest, Request, State},
    http::header::CONTENT_TYPE,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::extract::{JsonBody, MultipartBody};
use crate::models::envelope::ApiResponse;
use crate::state::AppState;
use crate::summary::prompts::DEFAULT_SUMMARY_QUERY;
use crate::summary::service::{save_summary, summarize_video, validate_video_url, VideoSource, VideoSummary};
use crate::uploads::{read_form, Attachment, StoredUpload, DEFAULT_MIME_TYPE};

const VIDEO_FIELDS: &[&str] = &["video", "videoFile"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummaryRequest {
    pub video_url: Option<String>,
    pub user_query: Option<String>,
}

/// Either a JSON body with a URL or a multipart body with a video file.
#[derive(Debug)]
pub enum VideoInput {
    Url {
        video_url: Option<String>,
        user_query: Option<String>,
    },
    Upload {
        file: Option<Attachment>,
        user_query: Option<String>,
    },
}

#[async_trait]
impl<S> FromRequest<S> for VideoInput
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let MultipartBody(multipart) = MultipartBody::from_request(req, state).await?;
            let form = read_form(multipart, VIDEO_FIELDS).await?;
            let user_query = form.text_field(&["userQuery", "query"]).map(str::to_string);
            Ok(VideoInput::Upload {
                file: form.file,
                user_query,
            })
        } else {
            let JsonBody(body) = JsonBody::<VideoSummaryRequest>::from_request(req, state).await?;
            Ok(VideoInput::Url {
                video_url: body.video_url,
                user_query: body.user_query,
            })
        }
    }
}

fn user_query_or_default(query: Option<&str>) -> &str {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or(DEFAULT_SUMMARY_QUERY)
}

/// POST /api/v1/fetch-details/ and /api/v1/video-summary/
///
/// Stage 1 summarizes the video, stage 2 turns that summary into questions.
pub async fn handle_video_summary(
    State(state): State<AppState>,
    input: VideoInput,
) -> Result<ApiResponse<VideoSummary>, AppError> {
    let result = match input {
        VideoInput::Url {
            video_url,
            user_query,
        } => {
            let video_url = validate_video_url(video_url.as_deref())?;
            info!(video_url = %video_url, "Processing video");
            summarize_video(
                state.llm.as_ref(),
                state.flow.as_ref(),
                &state.flow_settings,
                state.question_source,
                VideoSource::Url(&video_url),
                user_query_or_default(user_query.as_deref()),
            )
            .await?
        }
        VideoInput::Upload { file, user_query } => {
            let file = file
                .ok_or_else(|| AppError::validation("video", "A video file is required."))?;
            if !(file.mime_type.starts_with("video/") || file.mime_type == DEFAULT_MIME_TYPE) {
                return Err(AppError::validation(
                    "video",
                    format!("Unsupported video type '{}'", file.mime_type),
                ));
            }

            info!(file_name = %file.file_name, "Processing uploaded video");
            let stored = StoredUpload::persist(&state.upload_dir, &file).await?;
            debug!(path = %stored.path().display(), "Stored uploaded video");
            let bytes = stored.read().await?;
            let result = summarize_video(
                state.llm.as_ref(),
                state.flow.as_ref(),
                &state.flow_settings,
                state.question_source,
                VideoSource::Upload {
                    bytes: &bytes,
                    mime_type: &file.mime_type,
                },
                user_query_or_default(user_query.as_deref()),
            )
            .await?;
            save_summary(&state.summary_dir, stored.stem(), &result.summary).await;
            result
        }
    };

    Ok(ApiResponse::ok(result, "Video processed successfully."))
}
