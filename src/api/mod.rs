use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::url::construct_api_url;

#[derive(Serialize, Clone)]
pub struct PromptRequest {
    pub prompt: String,
    pub streaming: bool,
}

/// Successful acknowledgement of a submitted prompt.
///
/// Only `session_id` drives the client; the rest is informational and
/// surfaced to the user as-is.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct PromptAck {
    #[serde(default)]
    pub streaming: bool,
    pub session_id: String,
    pub stream_url: Option<String>,
    pub mode: Option<String>,
    pub assistant_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PromptResponse {
    // The backend reports failures as an `error` field, sometimes with a
    // non-success status; try that shape first so a body carrying both an
    // error and leftover session fields is still treated as a failure.
    Failure { error: String },
    Ack(PromptAck),
}

#[derive(Deserialize, Debug)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub assistant_ready: bool,
    pub files_uploaded: Option<u64>,
    pub mode: Option<String>,
    pub assistant_type: Option<String>,
    #[serde(default)]
    pub streaming_available: bool,
}

/// Why a prompt submission failed before any session existed.
#[derive(Debug)]
pub enum SubmitError {
    /// The backend processed the request and explicitly refused it.
    Backend(String),
    /// The request never completed at the transport level.
    Transport(reqwest::Error),
    /// The response matched neither the acknowledgement nor the error
    /// shape.
    Decode {
        status: reqwest::StatusCode,
        detail: String,
    },
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Backend(message) => write!(f, "{message}"),
            SubmitError::Transport(e) => write!(f, "request failed: {e}"),
            SubmitError::Decode { status, detail } => {
                write!(f, "unexpected response ({status}): {detail}")
            }
        }
    }
}

impl std::error::Error for SubmitError {}

/// Submit a prompt and obtain a streaming session identity.
///
/// Returns [`SubmitError::Backend`] when the server answers with an
/// `error` field regardless of HTTP status, matching how the backend
/// reports refusals.
pub async fn submit_prompt(
    client: &reqwest::Client,
    base_url: &str,
    prompt: &str,
) -> Result<PromptAck, SubmitError> {
    let url = construct_api_url(base_url, "process-prompt");
    let request = PromptRequest {
        prompt: prompt.to_string(),
        streaming: true,
    };

    let response = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await
        .map_err(SubmitError::Transport)?;

    let status = response.status();
    let body = response.text().await.map_err(SubmitError::Transport)?;

    match serde_json::from_str::<PromptResponse>(&body) {
        Ok(PromptResponse::Failure { error }) => Err(SubmitError::Backend(error)),
        Ok(PromptResponse::Ack(ack)) => Ok(ack),
        Err(e) => Err(SubmitError::Decode {
            status,
            detail: e.to_string(),
        }),
    }
}

/// Probe the backend's health endpoint.
pub async fn fetch_health(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<HealthReport, Box<dyn std::error::Error>> {
    let url = construct_api_url(base_url, "health");
    let response = client
        .get(url)
        .header("Content-Type", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(format!("health check failed with status {status}: {error_text}").into());
    }

    let report = response.json::<HealthReport>().await?;
    Ok(report)
}
