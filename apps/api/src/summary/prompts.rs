// Video summary LLM prompt templates.

pub const DEFAULT_SUMMARY_QUERY: &str =
    "Summarize the key points of the topic explained in this video.";

pub const SUMMARY_STRUCTURE: &str = r#"Structure the summary for student notes around these key points:

1. Key Topics Covered
2. Important Definitions & Terminologies
3. Step-by-Step Explanation of Concepts
4. Real-World Applications & Examples
5. Critical Insights & Takeaways

User Query: {user_query}"#;

pub const URL_SUMMARY_PROMPT: &str = r#"Extract detailed insights from the YouTube video at the following URL: {video_url}."#;

pub const UPLOAD_SUMMARY_PROMPT: &str = r#"Extract detailed insights from the attached video."#;

pub const QUESTIONS_PROMPT_TEMPLATE: &str = r#"Based on the following study summary, write exactly 10 multiple-choice questions that test understanding of it.

SUMMARY:
{summary}

OUTPUT SCHEMA (return exactly this structure, a JSON array of 10 objects):
[
  {
    "question": "string",
    "options": ["string", "string", "string", "string"],
    "answer": "string (must be one of the options)"
  }
]

RULES:
1. Every question has exactly 4 options.
2. The answer must match one of the options word for word.
3. Only use facts stated in the summary."#;
