// Video summary: study notes from a video, then practice questions from the notes.
// All LLM calls go through llm_client; no direct Gemini calls here.

pub mod handlers;
pub mod prompts;
pub mod service;
