//! Two-stage video pipeline: study summary, then questions built from it.
//!
//! Stage 2 only ever sees the sanitized stage-1 summary, and is skipped
//! entirely when stage 1 produced nothing usable.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::QuestionSource;
use crate::errors::AppError;
use crate::flow_client::FlowRunner;
use crate::langflow::service::{run_chat, FlowSettings};
use crate::llm_client::{prompts::SINGLE_PARAGRAPH_INSTRUCTION, Content, LlmError, Part, TextGenerator};
use crate::normalize::{fallback, parse_json_array, sanitize_text};
use crate::summary::prompts::{
    QUESTIONS_PROMPT_TEMPLATE, SUMMARY_STRUCTURE, UPLOAD_SUMMARY_PROMPT, URL_SUMMARY_PROMPT,
};

pub const EXPECTED_QUESTION_COUNT: usize = 10;
pub const SUMMARY_FAILED_MESSAGE: &str = "Failed to generate summary.";
pub const INVALID_URL_MESSAGE: &str = "A valid YouTube video URL is required.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: [String; 4],
    pub answer: String,
}

/// Stage-2 output. Serialized without a tag so clients see the bare value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Questions {
    Generated(Vec<Question>),
    /// Text returned by the orchestration flow.
    Proxied(String),
    /// The model's answer was not a valid question array; carries the fallback object.
    Unparsed(Value),
}

#[derive(Debug, Clone, Copy)]
pub enum VideoSource<'a> {
    Url(&'a str),
    Upload { bytes: &'a [u8], mime_type: &'a str },
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoSummary {
    pub summary: String,
    pub questions: Questions,
}

/// Accepts http(s) URLs on youtube.com (any subdomain) or youtu.be.
pub fn validate_video_url(raw: Option<&str>) -> Result<String, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("videoUrl", INVALID_URL_MESSAGE))?;

    let url = Url::parse(raw).map_err(|_| AppError::validation("videoUrl", INVALID_URL_MESSAGE))?;
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let is_youtube = host == "youtube.com" || host.ends_with(".youtube.com") || host == "youtu.be";

    if !matches!(url.scheme(), "http" | "https") || !is_youtube {
        return Err(AppError::validation("videoUrl", INVALID_URL_MESSAGE));
    }
    Ok(raw.to_string())
}

pub fn build_summary_request(source: VideoSource<'_>, user_query: &str) -> Vec<Content> {
    let intro = match source {
        VideoSource::Url(url) => URL_SUMMARY_PROMPT.replace("{video_url}", url),
        VideoSource::Upload { .. } => UPLOAD_SUMMARY_PROMPT.to_string(),
    };
    let prompt = format!(
        "{intro}\n\n{}\n\n{SINGLE_PARAGRAPH_INSTRUCTION}",
        SUMMARY_STRUCTURE.replace("{user_query}", user_query)
    );

    let mut contents = vec![Content::user_text(prompt)];
    if let VideoSource::Upload { bytes, mime_type } = source {
        contents.push(Content::user(vec![Part::inline_data(
            mime_type,
            STANDARD.encode(bytes),
        )]));
    }
    contents
}

/// Stage 1. An empty result is a processing failure, not an empty summary.
pub async fn summarize(
    llm: &dyn TextGenerator,
    source: VideoSource<'_>,
    user_query: &str,
) -> Result<String, AppError> {
    let raw = match llm.generate(build_summary_request(source, user_query)).await {
        Ok(raw) => raw,
        Err(LlmError::EmptyContent) => String::new(),
        Err(e) => return Err(e.into()),
    };

    let summary = sanitize_text(&raw);
    if summary.is_empty() {
        return Err(AppError::Failed(SUMMARY_FAILED_MESSAGE.to_string()));
    }
    Ok(summary)
}

/// Stage 2.
pub async fn generate_questions(
    source: QuestionSource,
    llm: &dyn TextGenerator,
    flow: &dyn FlowRunner,
    flow_settings: &FlowSettings,
    summary: &str,
) -> Result<Questions, AppError> {
    match source {
        QuestionSource::Llm => {
            let prompt = QUESTIONS_PROMPT_TEMPLATE.replace("{summary}", summary);
            let raw = llm.generate_text(&prompt).await?;
            Ok(parse_questions(&raw))
        }
        QuestionSource::Flow => {
            let reply = run_chat(flow, flow_settings, summary).await?;
            reply.text.map(Questions::Proxied).ok_or_else(|| {
                AppError::Upstream("Flow provider returned no message output".to_string())
            })
        }
    }
}

fn parse_questions(raw: &str) -> Questions {
    match parse_json_array::<Question>(raw) {
        Ok(questions) => {
            if questions.len() != EXPECTED_QUESTION_COUNT {
                warn!(
                    "Expected {EXPECTED_QUESTION_COUNT} questions, model returned {}",
                    questions.len()
                );
            }
            for q in questions.iter().filter(|q| !q.options.contains(&q.answer)) {
                warn!("Answer is not one of the options for question: {}", q.question);
            }
            Questions::Generated(questions)
        }
        Err(e) => {
            warn!("Failed to parse generated questions: {e}");
            Questions::Unparsed(fallback(raw))
        }
    }
}

/// Runs both stages in order.
pub async fn summarize_video(
    llm: &dyn TextGenerator,
    flow: &dyn FlowRunner,
    flow_settings: &FlowSettings,
    question_source: QuestionSource,
    source: VideoSource<'_>,
    user_query: &str,
) -> Result<VideoSummary, AppError> {
    let summary = summarize(llm, source, user_query).await?;
    info!(chars = summary.len(), "Summary generated, building questions");
    let questions = generate_questions(question_source, llm, flow, flow_settings, &summary).await?;
    Ok(VideoSummary { summary, questions })
}

/// Writes `{dir}/{stem}.txt`. Failures are logged and otherwise ignored.
pub async fn save_summary(dir: &Path, stem: &str, summary: &str) {
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        warn!("Failed to create summary directory {}: {e}", dir.display());
        return;
    }
    let path = dir.join(format!("{stem}.txt"));
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        info!("Overwriting existing summary {}", path.display());
    }
    match tokio::fs::write(&path, summary).await {
        Ok(()) => info!("Summary saved to {}", path.display()),
        Err(e) => warn!("Failed to save summary to {}: {e}", path.display()),
    }
}
