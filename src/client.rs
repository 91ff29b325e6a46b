//! HTTP client for the external recommendation backend.

use log::debug;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("request to advisor backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("advisor backend returned HTTP {0}")]
    Status(StatusCode),
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

/// Thin wrapper over `POST <base-url>/api/query`.
///
/// The backend itself is a black box; all this client guarantees is a
/// successfully opened response whose body is the record stream.
#[derive(Clone)]
pub struct AdvisorClient {
    http: HttpClient,
    base_url: String,
}

impl AdvisorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Open the streamed response for one query. Non-success statuses are
    /// reported as [`AdvisorError::Status`]; the caller reads the body via
    /// `bytes_stream()`. Dropping the response aborts the request, which is
    /// how cancellation propagates into the transport.
    pub async fn send_query(&self, query: &str) -> Result<reqwest::Response, AdvisorError> {
        let url = format!("{}/api/query", self.base_url);
        debug!("submitting query to {}", url);

        let resp = self
            .http
            .post(&url)
            .json(&QueryRequest { query })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AdvisorError::Status(status));
        }
        Ok(resp)
    }
}
