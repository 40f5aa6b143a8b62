mod chatbot;
mod config;
mod errors;
mod extract;
mod flow_client;
mod langflow;
mod llm_client;
mod models;
mod normalize;
mod routes;
mod state;
mod summary;
mod uploads;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::flow_client::FlowClient;
use crate::llm_client::GeminiClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting EduAssist API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let mut gemini = GeminiClient::new(
        config.google_api_key.clone(),
        config.gemini_model.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )
    .context("Failed to initialize Gemini client")?;
    if let Some(base_url) = &config.gemini_base_url {
        gemini = gemini.with_base_url(base_url.clone());
    }
    info!("LLM client initialized (model: {})", gemini.model());

    // Initialize flow client
    let flow = FlowClient::new(
        config
            .langflow_base_url
            .as_deref()
            .unwrap_or(flow_client::DEFAULT_BASE_URL),
        config.langflow_token.clone(),
    )
    .context("Failed to initialize Langflow client")?
    .with_timeout(Duration::from_secs(config.llm_timeout_secs));
    info!(
        "Flow client initialized (flow: {}, stream: {})",
        config.flow_id, config.langflow_stream
    );
    info!("Video questions source: {:?}", config.question_source);

    let state = AppState::new(&config, Arc::new(gemini), Arc::new(flow));

    let app = build_router(state)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&config.cors_origin)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Single allowed origin with credentials, or `*` without them.
fn build_cors(origin: &str) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    if origin.trim() == "*" {
        return Ok(cors.allow_origin(Any));
    }

    let origin: HeaderValue = origin
        .trim()
        .parse()
        .with_context(|| format!("CORS_ORIGIN '{origin}' is not a valid header value"))?;
    Ok(cors.allow_origin(origin).allow_credentials(true))
}
