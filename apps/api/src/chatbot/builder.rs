//! Builds Gemini request payloads for the chatbot endpoints.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::chatbot::prompts::{
    EDUCATION_DECLINE_MESSAGE, EDUCATION_PROMPT_TEMPLATE, RESUME_ANALYSIS_PROMPT,
    RESUME_TARGET_TEMPLATE,
};
use crate::llm_client::{prompts::JSON_ONLY_INSTRUCTION, Content, Part};
use crate::uploads::DEFAULT_MIME_TYPE;

/// What the provider is being asked for, which decides how its answer is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// JSON evaluation of an attached resume.
    ResumeEvaluation,
    /// Plain-text answer from the education-only assistant.
    EducationReply,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub kind: ChatKind,
    pub contents: Vec<Content>,
}

/// Raw resume bytes with their MIME type.
#[derive(Debug, Clone, Copy)]
pub struct ResumeInput<'a> {
    pub bytes: &'a [u8],
    pub mime_type: &'a str,
}

/// Picks the resume path when a file is present, otherwise the education path.
/// Returns `None` when there is neither a file nor a query.
pub fn build_chat_request(query: Option<&str>, resume: Option<ResumeInput<'_>>) -> Option<ChatRequest> {
    let query = query.map(str::trim).filter(|q| !q.is_empty());
    match (resume, query) {
        (Some(resume), target) => Some(ChatRequest {
            kind: ChatKind::ResumeEvaluation,
            contents: build_resume_request(resume, target),
        }),
        (None, Some(query)) => Some(ChatRequest {
            kind: ChatKind::EducationReply,
            contents: build_education_request(query),
        }),
        (None, None) => None,
    }
}

/// Instruction turn followed by the base64-encoded resume as an inline part.
pub fn build_resume_request(resume: ResumeInput<'_>, target: Option<&str>) -> Vec<Content> {
    let mut prompt = String::from(RESUME_ANALYSIS_PROMPT);
    if let Some(target) = target {
        prompt.push_str(&RESUME_TARGET_TEMPLATE.replace("{user_query}", target));
    }
    prompt.push_str("\n\n");
    prompt.push_str(JSON_ONLY_INSTRUCTION);

    let mime_type = if resume.mime_type.trim().is_empty() {
        DEFAULT_MIME_TYPE
    } else {
        resume.mime_type
    };

    vec![
        Content::user_text(prompt),
        Content::user(vec![Part::inline_data(mime_type, STANDARD.encode(resume.bytes))]),
    ]
}

pub fn build_education_request(query: &str) -> Vec<Content> {
    let prompt = EDUCATION_PROMPT_TEMPLATE
        .replace("{decline_message}", EDUCATION_DECLINE_MESSAGE)
        .replace("{user_query}", query);
    vec![Content::user_text(prompt)]
}
