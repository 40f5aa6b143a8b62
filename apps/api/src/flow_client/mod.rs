//! Client for the Langflow run API.
//!
//! A run is a single authenticated POST. When streaming is requested and the
//! provider hands back a `stream_url`, the incremental output is delivered
//! through a [`FlowEventStream`] that runs independently of the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error};

pub mod stream;

pub use stream::{FlowEvent, FlowEventStream};

pub const DEFAULT_BASE_URL: &str = "https://api.langflow.astra.datastax.com";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("LANGFLOW_TOKEN is not set")]
    MissingToken,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status. Rendered as `"{status} {reason} - {body}"`.
    #[error("{status} {reason} - {body}")]
    Api {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),
}

/// Parameters of one flow run.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub flow_id: String,
    pub langflow_id: String,
    pub input_value: String,
    pub input_type: String,
    pub output_type: String,
    pub stream: bool,
    pub tweaks: Map<String, Value>,
}

impl SessionRequest {
    /// A chat-in, chat-out run without streaming or tweaks.
    pub fn chat(
        flow_id: impl Into<String>,
        langflow_id: impl Into<String>,
        input_value: impl Into<String>,
    ) -> Self {
        Self {
            flow_id: flow_id.into(),
            langflow_id: langflow_id.into(),
            input_value: input_value.into(),
            input_type: "chat".to_string(),
            output_type: "chat".to_string(),
            stream: false,
            tweaks: Map::new(),
        }
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_tweaks(mut self, tweaks: Map<String, Value>) -> Self {
        self.tweaks = tweaks;
        self
    }
}

#[derive(Debug, Serialize)]
struct RunBody<'a> {
    input_value: &'a str,
    input_type: &'a str,
    output_type: &'a str,
    tweaks: &'a Map<String, Value>,
}

/// Result of a run: the provider's JSON body plus, when streaming, the live events.
#[derive(Debug)]
pub struct FlowRun {
    pub response: Value,
    pub events: Option<FlowEventStream>,
}

/// The "run flow" contract handlers depend on.
#[async_trait]
pub trait FlowRunner: Send + Sync {
    async fn run_flow(&self, request: SessionRequest) -> Result<FlowRun, FlowError>;
}

#[derive(Clone)]
pub struct FlowClient {
    client: Client,
    base_url: Url,
    token: String,
    run_timeout: Duration,
}

impl FlowClient {
    /// Fails fast when the bearer token is empty.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, FlowError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(FlowError::MissingToken);
        }
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| FlowError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            client: Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?,
            base_url,
            token,
            run_timeout: DEFAULT_RUN_TIMEOUT,
        })
    }

    /// Upper bound for a run call. Stream subscriptions are not bounded by it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Issues the run call and returns the raw JSON body.
    pub async fn initiate_session(&self, request: &SessionRequest) -> Result<Value, FlowError> {
        let url = self.endpoint(&format!(
            "/lf/{}/api/v1/run/{}",
            request.langflow_id, request.flow_id
        ));
        debug!(url = %url, stream = request.stream, "Initiating flow session");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .timeout(self.run_timeout)
            .query(&[("stream", request.stream)])
            .json(&RunBody {
                input_value: &request.input_value,
                input_type: &request.input_type,
                output_type: &request.output_type,
                tweaks: &request.tweaks,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Flow provider returned {status}: {body}");
            return Err(FlowError::Api {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|_| FlowError::InvalidJson(body))
    }

    /// Opens the event subscription for a `stream_url` returned by a run.
    /// Relative URLs resolve against the base URL; the token is only sent to that host.
    pub fn handle_stream(&self, stream_url: &str) -> Result<FlowEventStream, FlowError> {
        let url = self
            .base_url
            .join(stream_url)
            .map_err(|e| FlowError::InvalidUrl(format!("{stream_url}: {e}")))?;
        let token = (url.host_str() == self.base_url.host_str()).then(|| self.token.clone());
        Ok(stream::subscribe(self.client.clone(), url, token))
    }
}

#[async_trait]
impl FlowRunner for FlowClient {
    async fn run_flow(&self, request: SessionRequest) -> Result<FlowRun, FlowError> {
        let response = self.initiate_session(&request).await?;

        let events = match (request.stream, stream_url(&response)) {
            (true, Some(url)) => Some(self.handle_stream(url)?),
            _ => None,
        };

        Ok(FlowRun { response, events })
    }
}

/// `outputs[0].outputs[0].artifacts.stream_url`
pub fn stream_url(response: &Value) -> Option<&str> {
    response
        .pointer("/outputs/0/outputs/0/artifacts/stream_url")
        .and_then(Value::as_str)
}

/// `outputs[0].outputs[0].outputs.message.message.text`; `None` means no result.
pub fn extract_message_text(response: &Value) -> Option<&str> {
    response
        .pointer("/outputs/0/outputs/0/outputs/message/message/text")
        .and_then(Value::as_str)
}
