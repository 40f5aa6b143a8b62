use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, QuestionSource};
use crate::flow_client::FlowRunner;
use crate::langflow::service::FlowSettings;
use crate::llm_client::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn TextGenerator>,
    pub flow: Arc<dyn FlowRunner>,
    pub flow_settings: FlowSettings,
    /// Which provider writes the follow-up questions of a video summary.
    pub question_source: QuestionSource,
    pub upload_dir: PathBuf,
    pub summary_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &Config, llm: Arc<dyn TextGenerator>, flow: Arc<dyn FlowRunner>) -> Self {
        Self {
            llm,
            flow,
            flow_settings: FlowSettings::from_config(config),
            question_source: config.question_source,
            upload_dir: config.upload_dir.clone(),
            summary_dir: config.summary_dir.clone(),
        }
    }
}
