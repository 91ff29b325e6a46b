//! Placeholder mock backend endpoint.
//!
//! Stands in for the real recommendation engine: validates the query, waits
//! a fixed delay, and returns one of three canned messages. No streaming,
//! no design weight.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use log::{error, info};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::cli::Args;

#[derive(Clone)]
struct MockState {
    delay: Duration,
}

#[derive(Serialize)]
struct QueryResponse {
    message: String,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn router(delay: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/query", post(query_handler))
        .layer(cors)
        .with_state(MockState { delay })
}

pub async fn run(args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = args.server_addr.parse::<SocketAddr>()?;
    info!("Starting mock advisor endpoint on: http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = router(Duration::from_millis(args.mock_delay_ms));
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

async fn query_handler(State(state): State<MockState>, body: String) -> Response {
    let value: serde_json::Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(err) => {
            error!("mock endpoint could not read request body: {}", err);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                "Failed to process query",
            );
        }
    };

    let query = value
        .get("query")
        .and_then(|q| q.as_str())
        .map(str::trim)
        .filter(|q| !q.is_empty());
    let Some(query) = query else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid query",
            "Query must be a non-empty string",
        );
    };

    // Simulated processing time.
    tokio::time::sleep(state.delay).await;

    (
        StatusCode::OK,
        Json(QueryResponse {
            message: mock_response(query),
            timestamp: Utc::now().to_rfc3339(),
            error: None,
        }),
    )
        .into_response()
}

fn error_response(status: StatusCode, message: &str, error: &str) -> Response {
    (
        status,
        Json(QueryResponse {
            message: message.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            error: Some(error.to_string()),
        }),
    )
        .into_response()
}

fn mock_response(query: &str) -> String {
    let responses = [
        format!(
            "I received your query: \"{}\". This is a mock response. Once you integrate \
             OpenAI or Gemini, this will be replaced with actual AI responses.",
            query
        ),
        format!(
            "Thanks for asking about \"{}\". Currently showing a placeholder response. \
             Your AI integration will provide real answers here.",
            query
        ),
        format!(
            "Query processed: \"{}\". This mock response will be replaced when you add \
             your AI service integration.",
            query
        ),
    ];

    responses
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_default()
}
