//! Runs the configured chat flow and reduces the provider reply to text.

use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::flow_client::{extract_message_text, FlowError, FlowEvent, FlowEventStream, FlowRunner, SessionRequest};

/// Components of the deployed flow that receive (empty) tweaks on every run.
const DEFAULT_TWEAK_COMPONENTS: &[&str] = &[
    "ParseData-55QZT",
    "ChatInput-v5Bdq",
    "AstraDBToolComponent-jGUkb",
    "Agent-BWNbQ",
    "ChatOutput-xCrgo",
    "Prompt-plbUp",
];

/// Which flow to run and how.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub flow_id: String,
    pub langflow_id: String,
    pub tweaks: Map<String, Value>,
    pub stream: bool,
}

impl FlowSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            flow_id: config.flow_id.clone(),
            langflow_id: config.langflow_id.clone(),
            tweaks: config
                .langflow_tweaks
                .clone()
                .unwrap_or_else(default_tweaks),
            stream: config.langflow_stream,
        }
    }

    pub fn session(&self, input: &str) -> SessionRequest {
        SessionRequest::chat(&self.flow_id, &self.langflow_id, input)
            .with_stream(self.stream)
            .with_tweaks(self.tweaks.clone())
    }
}

pub fn default_tweaks() -> Map<String, Value> {
    DEFAULT_TWEAK_COMPONENTS
        .iter()
        .map(|id| (id.to_string(), Value::Object(Map::new())))
        .collect()
}

/// Outcome of a chat run.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowReply {
    /// Final message text, when the run response carried one.
    pub text: Option<String>,
    /// A stream subscription was started and is being drained in the background.
    pub streaming: bool,
}

/// Runs the flow in chat mode. A stream, if any, is drained by a detached task.
pub async fn run_chat(
    runner: &dyn FlowRunner,
    settings: &FlowSettings,
    input: &str,
) -> Result<FlowReply, FlowError> {
    let run = runner.run_flow(settings.session(input)).await?;
    let text = extract_message_text(&run.response).map(str::to_string);

    let streaming = match run.events {
        Some(events) => {
            tokio::spawn(log_stream(events));
            true
        }
        None => false,
    };

    Ok(FlowReply { text, streaming })
}

async fn log_stream(mut events: FlowEventStream) {
    while let Some(event) = events.recv().await {
        match event {
            FlowEvent::Update(data) => {
                let chunk = data.get("chunk").unwrap_or(&data);
                debug!("Flow stream chunk: {chunk}");
            }
            FlowEvent::Closed(message) => {
                info!("Flow stream closed: {message}");
                break;
            }
            FlowEvent::Error(message) => {
                error!("Flow stream error: {message}");
                break;
            }
        }
    }
    events.close();
}
