// Shared prompt fragments.
// Each feature that needs LLM calls defines its own prompts.rs alongside it.

/// Appended to prompts whose answer is parsed as JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    Respond with valid JSON only. \
    Do not use markdown code fences. \
    Do not include any text outside the JSON.";

/// Appended to prompts whose answer is shown as a single block of prose.
pub const SINGLE_PARAGRAPH_INSTRUCTION: &str = "\
    Do not include \"\\n\" or any line breaks in the response; write exactly one paragraph.";
