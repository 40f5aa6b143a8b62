use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

use crate::llm_client::DEFAULT_MODEL;

/// Where the follow-up questions of a video summary come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuestionSource {
    /// A second LLM prompt returning ten multiple-choice questions as JSON.
    #[default]
    Llm,
    /// The summary is forwarded to the orchestration flow; its text is returned.
    Flow,
}

impl FromStr for QuestionSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "llm" | "gemini" => Ok(Self::Llm),
            "flow" | "langflow" => Ok(Self::Flow),
            other => bail!("unknown question source '{other}' (expected 'llm' or 'flow')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: Option<String>,
    pub langflow_token: String,
    pub langflow_base_url: Option<String>,
    pub flow_id: String,
    pub langflow_id: String,
    pub langflow_tweaks: Option<Map<String, Value>>,
    pub langflow_stream: bool,
    pub question_source: QuestionSource,
    pub cors_origin: String,
    pub upload_dir: PathBuf,
    pub summary_dir: PathBuf,
    pub body_limit_bytes: usize,
    pub llm_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let langflow_tweaks = match optional_env("LANGFLOW_TWEAKS") {
            Some(raw) => Some(
                serde_json::from_str::<Map<String, Value>>(&raw)
                    .context("LANGFLOW_TWEAKS must be a JSON object")?,
            ),
            None => None,
        };

        Ok(Config {
            google_api_key: require_env("GOOGLE_API_KEY")?,
            gemini_model: optional_env("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: optional_env("GEMINI_BASE_URL"),
            langflow_token: require_env("LANGFLOW_TOKEN")?,
            langflow_base_url: optional_env("LANGFLOW_BASE_URL"),
            flow_id: require_env("FLOW_ID")?,
            langflow_id: require_env("LANGFLOW_ID")?,
            langflow_tweaks,
            langflow_stream: parse_env("LANGFLOW_STREAM", false)?,
            question_source: parse_env("QUESTION_SOURCE", QuestionSource::Llm)?,
            cors_origin: require_env("CORS_ORIGIN")?,
            upload_dir: optional_env("UPLOAD_DIR")
                .unwrap_or_else(|| "uploads".to_string())
                .into(),
            summary_dir: optional_env("SUMMARY_DIR")
                .unwrap_or_else(|| "video_summaries".to_string())
                .into(),
            body_limit_bytes: parse_env("BODY_LIMIT_BYTES", 25 * 1024 * 1024)?,
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}
