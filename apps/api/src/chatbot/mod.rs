// Education chatbot and resume analysis.
// All LLM calls go through llm_client; no direct Gemini calls here.

pub mod builder;
pub mod handlers;
pub mod prompts;
