pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::chatbot::handlers as chatbot;
use crate::langflow::handlers as langflow;
use crate::state::AppState;
use crate::summary::handlers as summary;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1", get(health::health_handler))
        .route("/api/v1/", get(health::health_handler))
        // Chatbot API
        .route("/api/v1/chatbot", post(chatbot::handle_chatbot))
        .route("/api/v1/chatbot/", post(chatbot::handle_chatbot))
        .route(
            "/api/v1/chatbot/analyze-resume",
            post(chatbot::handle_chatbot),
        )
        .route(
            "/api/v1/chatbot/education-query",
            post(chatbot::handle_education_query),
        )
        // Video summary API
        .route("/api/v1/fetch-details", post(summary::handle_video_summary))
        .route("/api/v1/fetch-details/", post(summary::handle_video_summary))
        .route("/api/v1/video-summary", post(summary::handle_video_summary))
        .route("/api/v1/video-summary/", post(summary::handle_video_summary))
        // Flow proxy
        .route("/api/v1/langflow", post(langflow::handle_langflow))
        .route("/api/v1/langflow/", post(langflow::handle_langflow))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::QuestionSource;
    use crate::flow_client::{FlowError, FlowRun, FlowRunner, SessionRequest};
    use crate::langflow::service::{default_tweaks, FlowSettings};
    use crate::llm_client::{Content, LlmError, TextGenerator};
    use crate::normalize::INVALID_FORMAT_ERROR;

    // ── stubs ────────────────────────────────────────────────────────────

    struct StubLlm {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: Mutex<Vec<Vec<Content>>>,
    }

    impl StubLlm {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn replying(texts: &[&str]) -> Arc<Self> {
            Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn prompt(&self, call: usize) -> String {
            self.calls.lock().unwrap()[call][0].parts[0]
                .text
                .clone()
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl TextGenerator for StubLlm {
        async fn generate(&self, contents: Vec<Content>) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(contents);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }

    enum FlowBehavior {
        Reply(&'static str),
        Fail(u16, &'static str),
    }

    struct StubFlow {
        behavior: FlowBehavior,
        calls: AtomicUsize,
        inputs: Mutex<Vec<String>>,
    }

    impl StubFlow {
        fn new(behavior: FlowBehavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
                inputs: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl FlowRunner for StubFlow {
        async fn run_flow(&self, request: SessionRequest) -> Result<FlowRun, FlowError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inputs.lock().unwrap().push(request.input_value);
            match self.behavior {
                FlowBehavior::Reply(text) => Ok(FlowRun {
                    response: json!({"outputs": [{"outputs": [{"outputs": {"message": {"message": {"text": text}}}}]}]}),
                    events: None,
                }),
                FlowBehavior::Fail(status, reason) => Err(FlowError::Api {
                    status,
                    reason: reason.to_string(),
                    body: "{\"detail\":\"flow unavailable\"}".to_string(),
                }),
            }
        }
    }

    struct Harness {
        app: Router,
        llm: Arc<StubLlm>,
        flow: Arc<StubFlow>,
        dir: tempfile::TempDir,
    }

    fn harness_with(llm: Arc<StubLlm>, flow: Arc<StubFlow>, question_source: QuestionSource) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState {
            llm: llm.clone(),
            flow: flow.clone(),
            flow_settings: FlowSettings {
                flow_id: "flow-1".into(),
                langflow_id: "lf-1".into(),
                tweaks: default_tweaks(),
                stream: false,
            },
            question_source,
            upload_dir: dir.path().join("uploads"),
            summary_dir: dir.path().join("video_summaries"),
        };
        Harness {
            app: build_router(state),
            llm,
            flow,
            dir,
        }
    }

    fn harness(llm: Arc<StubLlm>) -> Harness {
        harness_with(llm, StubFlow::new(FlowBehavior::Reply("unused")), QuestionSource::Llm)
    }

    // ── request helpers ──────────────────────────────────────────────────

    const BOUNDARY: &str = "eduassist-test-boundary";

    enum FormPart<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a str, &'a [u8]),
    }

    fn multipart_request(uri: &str, parts: &[FormPart<'_>]) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                FormPart::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                            .as_bytes(),
                    );
                }
                FormPart::File(name, file_name, mime, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::post(uri)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn raw_request(uri: &str, body: &'static str) -> Request<Body> {
        Request::post(uri).body(Body::from(body)).unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn dir_entries(path: &Path) -> usize {
        std::fs::read_dir(path).map(|d| d.count()).unwrap_or(0)
    }

    fn ten_questions() -> String {
        let questions: Vec<Value> = (1..=10)
            .map(|i| {
                json!({
                    "question": format!("Question {i}?"),
                    "options": ["A", "B", "C", "D"],
                    "answer": "A"
                })
            })
            .collect();
        format!("```json\n{}\n```", Value::Array(questions))
    }

    // ── health ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_liveness_probe_returns_envelope() {
        let h = harness(StubLlm::replying(&[]));
        let request = Request::get("/api/v1/").body(Body::empty()).unwrap();
        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], 200);
        assert_eq!(body["success"], true);
        assert_eq!(h.llm.call_count(), 0);
    }

    // ── chatbot ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_chatbot_query_without_file_returns_text() {
        let h = harness(StubLlm::replying(&["  A prime has exactly two divisors.  "]));
        let request = multipart_request(
            "/api/v1/chatbot/",
            &[FormPart::Text("userQuery", "What is a prime number?")],
        );

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "A prime has exactly two divisors.");
        assert_eq!(body["message"], "Chatbot response fetch successful");

        let calls = h.llm.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 1);
        assert!(calls[0][0].parts.iter().all(|p| p.inline_data.is_none()));
        assert!(!h.dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_analyze_resume_parses_fenced_json_and_cleans_up() {
        let reply = "```json\n{\"skills\": \"80%\", \"experience\": \"70%\", \"formatting\": \"90%\", \"ats\": \"65%\", \"improvements\": [\"Quantify impact\"]}\n```";
        let h = harness(StubLlm::replying(&[reply]));
        let request = multipart_request(
            "/api/v1/chatbot/analyze-resume",
            &[
                FormPart::File("resume", "cv.pdf", "application/pdf", b"%PDF-1.4 resume"),
                FormPart::Text("query", "Rust backend engineer"),
            ],
        );

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Resume analysis successful");
        assert_eq!(body["data"]["ats"], "65%");
        assert_eq!(body["data"]["improvements"][0], "Quantify impact");

        {
            let calls = h.llm.calls.lock().unwrap();
            let inline = calls[0][1].parts[0].inline_data.as_ref().unwrap();
            assert_eq!(inline.mime_type, "application/pdf");
        }
        assert!(h.llm.prompt(0).contains("Rust backend engineer"));
        assert_eq!(dir_entries(&h.dir.path().join("uploads")), 0);
    }

    #[tokio::test]
    async fn test_analyze_resume_invalid_json_degrades_to_fallback() {
        let h = harness(StubLlm::replying(&["Sorry, I cannot evaluate this."]));
        let request = multipart_request(
            "/api/v1/chatbot/",
            &[FormPart::File("resumeFile", "cv.pdf", "application/pdf", b"%PDF")],
        );

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["error"], INVALID_FORMAT_ERROR);
        assert_eq!(body["data"]["raw"], "Sorry, I cannot evaluate this.");
    }

    #[tokio::test]
    async fn test_chatbot_without_file_or_query_is_rejected() {
        let h = harness(StubLlm::replying(&["unused"]));
        let request = multipart_request("/api/v1/chatbot/", &[FormPart::Text("userQuery", "  ")]);

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "userQuery");
        assert_eq!(h.llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_education_query_uses_default_prompt() {
        let h = harness(StubLlm::replying(&["I can explain any topic.\n"]));
        let request = json_request("/api/v1/chatbot/education-query", json!({}));

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "I can explain any topic.");
        assert!(h.llm.prompt(0).contains("How can you help me?"));
    }

    #[tokio::test]
    async fn test_education_query_without_body_uses_default_prompt() {
        let h = harness(StubLlm::replying(&["Ask me about any subject."]));

        let (status, body) = send(&h.app, raw_request("/api/v1/chatbot/education-query", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "Ask me about any subject.");
        assert!(h.llm.prompt(0).contains("How can you help me?"));
    }

    #[tokio::test]
    async fn test_chatbot_without_multipart_body_is_enveloped_400() {
        let h = harness(StubLlm::replying(&["unused"]));

        let (status, body) = send(&h.app, raw_request("/api/v1/chatbot/", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(h.llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_chatbot_provider_error_is_500() {
        let h = harness(StubLlm::new(vec![Err(LlmError::Api {
            status: 503,
            message: "model overloaded".into(),
        })]));
        let request = json_request(
            "/api/v1/chatbot/education-query",
            json!({"userQuery": "Explain recursion"}),
        );

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["message"].as_str().unwrap().contains("model overloaded"));
    }

    // ── video summary ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_video_summary_requires_video_url() {
        let h = harness(StubLlm::replying(&["unused"]));
        for body in [json!({}), json!({"videoUrl": ""})] {
            let (status, response) = send(&h.app, json_request("/api/v1/fetch-details/", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(response["error"]["field"], "videoUrl");
        }
        assert_eq!(h.llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_video_summary_rejects_non_youtube_url_without_calling_providers() {
        let h = harness(StubLlm::replying(&["unused"]));
        let request = json_request(
            "/api/v1/video-summary/",
            json!({"videoUrl": "https://example.com/video"}),
        );

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "videoUrl");
        assert_eq!(h.llm.call_count(), 0);
        assert_eq!(h.flow.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_video_summary_two_stage_end_to_end() {
        let paragraph = "## Overview\n**Part 2** covers *integration by parts*.\nIt ends with examples.";
        let questions = ten_questions();
        let h = harness(StubLlm::replying(&[paragraph, &questions]));
        let request = json_request(
            "/api/v1/fetch-details/",
            json!({"videoUrl": "https://youtube.com/watch?v=abc", "userQuery": "explain part 2"}),
        );

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Video processed successfully.");

        let expected = "Overview Part 2 covers integration by parts. It ends with examples.";
        assert_eq!(body["data"]["summary"], expected);
        assert_eq!(body["data"]["questions"].as_array().unwrap().len(), 10);
        assert_eq!(body["data"]["questions"][0]["options"].as_array().unwrap().len(), 4);

        assert_eq!(h.llm.call_count(), 2);
        assert!(h.llm.prompt(0).contains("https://youtube.com/watch?v=abc"));
        assert!(h.llm.prompt(0).contains("explain part 2"));
        assert!(h.llm.prompt(1).contains(expected));
    }

    #[tokio::test]
    async fn test_video_summary_empty_stage_one_skips_questions() {
        let h = harness(StubLlm::replying(&["  \n** **\n"]));
        let request = json_request(
            "/api/v1/fetch-details/",
            json!({"videoUrl": "https://www.youtube.com/watch?v=abc"}),
        );

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to generate summary.");
        assert_eq!(h.llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_video_summary_flow_questions_variant() {
        let flow = StubFlow::new(FlowBehavior::Reply("1. What is a limit? ..."));
        let h = harness_with(
            StubLlm::replying(&["Limits describe behaviour near a point."]),
            flow,
            QuestionSource::Flow,
        );
        let request = json_request(
            "/api/v1/video-summary",
            json!({"videoUrl": "https://youtu.be/xyz"}),
        );

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["questions"], "1. What is a limit? ...");
        assert_eq!(
            *h.flow.inputs.lock().unwrap(),
            vec!["Limits describe behaviour near a point.".to_string()]
        );
        assert!(h.llm.prompt(0).contains(
            "Summarize the key points of the topic explained in this video."
        ));
    }

    #[tokio::test]
    async fn test_video_upload_saves_summary_and_removes_upload() {
        let h = harness(StubLlm::replying(&["Cells divide by mitosis.", &ten_questions()]));
        let request = multipart_request(
            "/api/v1/video-summary/",
            &[
                FormPart::File("video", "Lecture 3.mp4", "video/mp4", b"\x00\x00\x00\x18ftypmp42"),
                FormPart::Text("userQuery", "focus on mitosis"),
            ],
        );

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["summary"], "Cells divide by mitosis.");

        {
            let calls = h.llm.calls.lock().unwrap();
            let inline = calls[0][1].parts[0].inline_data.as_ref().unwrap();
            assert_eq!(inline.mime_type, "video/mp4");
        }
        let saved = std::fs::read_to_string(
            h.dir.path().join("video_summaries").join("Lecture_3.txt"),
        )
        .unwrap();
        assert_eq!(saved, "Cells divide by mitosis.");
        assert_eq!(dir_entries(&h.dir.path().join("uploads")), 0);
    }

    #[tokio::test]
    async fn test_video_upload_rejects_non_video_file() {
        let h = harness(StubLlm::replying(&["unused"]));
        let request = multipart_request(
            "/api/v1/video-summary/",
            &[FormPart::File("video", "notes.txt", "text/plain", b"hello")],
        );

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "video");
        assert_eq!(h.llm.call_count(), 0);
    }

    // ── flow proxy ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_langflow_requires_message() {
        let h = harness(StubLlm::replying(&[]));
        let (status, body) = send(&h.app, json_request("/api/v1/langflow/", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "message");
        assert_eq!(body["message"], "A message or prompt is required");
        assert_eq!(h.flow.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_langflow_empty_body_is_missing_message() {
        let h = harness(StubLlm::replying(&[]));
        let (status, body) = send(&h.app, raw_request("/api/v1/langflow/", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "message");
        assert_eq!(body["message"], "A message or prompt is required");
        assert_eq!(h.flow.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_langflow_malformed_body_is_enveloped_400() {
        let h = harness(StubLlm::replying(&[]));
        let request = Request::post("/api/v1/langflow/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{"))
            .unwrap();

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["field"], "body");
        assert_eq!(h.flow.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_langflow_returns_flow_text() {
        let flow = StubFlow::new(FlowBehavior::Reply("Hello from the flow"));
        let h = harness_with(StubLlm::replying(&[]), flow, QuestionSource::Llm);

        let (status, body) =
            send(&h.app, json_request("/api/v1/langflow/", json!({"message": "hello"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "Hello from the flow");
        assert_eq!(body["message"], "Response fetch successful");
    }

    #[tokio::test]
    async fn test_langflow_upstream_failure_is_500_with_status_text() {
        let flow = StubFlow::new(FlowBehavior::Fail(502, "Bad Gateway"));
        let h = harness_with(StubLlm::replying(&[]), flow, QuestionSource::Llm);

        let (status, body) =
            send(&h.app, json_request("/api/v1/langflow/", json!({"message": "hello"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Langflow response error"));
        assert!(message.contains("502 Bad Gateway"));
    }
}
