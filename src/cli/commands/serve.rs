//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for summarization and transcript retrieval so a
//! web front end can drive the pipeline.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::OppsumError;
use crate::pipeline::{Pipeline, TranscriptSource};
use crate::summarize::SummaryOptions;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    pipeline: Pipeline,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(settings)?;

    let state = Arc::new(AppState { pipeline });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/summarize", post(summarize))
        .route("/transcript", post(transcript))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Oppsum API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Summarize", "POST /summarize");
    Output::kv("Transcript", "POST /transcript");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct SummarizeRequest {
    /// YouTube URL or video ID
    input: String,
    /// Maximum summary length in tokens
    max_length: Option<u32>,
    /// Sampling temperature
    creativity: Option<f32>,
}

#[derive(Serialize)]
struct SummarizeResponse {
    video_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    source: TranscriptSource,
    summary: String,
    generated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Deserialize)]
struct TranscriptRequest {
    /// YouTube URL or video ID
    input: String,
}

#[derive(Serialize)]
struct TranscriptResponse {
    video_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    source: TranscriptSource,
    transcript: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attempts: Vec<String>,
}

fn error_response(e: OppsumError) -> axum::response::Response {
    match e {
        OppsumError::InvalidInput(msg) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: msg,
                hint: None,
                attempts: Vec::new(),
            }),
        )
            .into_response(),
        OppsumError::Acquisition(failure) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: failure.reason.to_string(),
                hint: Some(failure.reason.hint().to_string()),
                attempts: failure.attempts.iter().map(|a| a.to_string()).collect(),
            }),
        )
            .into_response(),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: other.to_string(),
                hint: None,
                attempts: Vec::new(),
            }),
        )
            .into_response(),
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn summarize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SummarizeRequest>,
) -> impl IntoResponse {
    let settings = state.pipeline.settings();
    let options = SummaryOptions {
        max_length: req.max_length.unwrap_or(settings.summary.max_length),
        creativity: req.creativity.unwrap_or(settings.summary.creativity),
    };

    match state.pipeline.summarize(&req.input, Some(options)).await {
        Ok(report) => Json(SummarizeResponse {
            video_id: report.video_id,
            title: report.title,
            source: report.source,
            summary: report.summary,
            generated_at: report.generated_at,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn transcript(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TranscriptRequest>,
) -> impl IntoResponse {
    match state.pipeline.fetch_transcript(&req.input).await {
        Ok(outcome) => Json(TranscriptResponse {
            video_id: outcome.video_id,
            title: outcome.title,
            source: outcome.source,
            transcript: outcome.text,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}
