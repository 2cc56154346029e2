//! Client for an Ollama-compatible `/api/generate` endpoint.
//!
//! [`InferenceClient::try_generate`] reports failures as [`InferenceError`];
//! [`InferenceClient::generate`] never fails and turns every error into one of
//! two fixed apology strings.  Each call is a single attempt.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::InferenceError;

/// Timeout for the version probe used by the liveness endpoint.
const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Anything that can turn a prompt into reply text without failing.
pub trait TextGenerator: Send + Sync + 'static {
    fn generate(&self, prompt: &str) -> impl Future<Output = String> + Send;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// HTTP client bound to one generation endpoint and one model.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: reqwest::Client,
    generate_url: String,
    version_url: String,
    model: String,
}

impl InferenceClient {
    /// `generate_url` is the full generation URL, e.g.
    /// `http://localhost:11434/api/generate`.  `timeout` bounds each request.
    pub fn new(
        generate_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("parley/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(InferenceError::Transport)?;
        let generate_url = generate_url.into();
        let version_url = version_url_for(&generate_url);
        Ok(Self {
            client,
            generate_url,
            version_url,
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn generate_url(&self) -> &str {
        &self.generate_url
    }

    /// URL probed by [`InferenceClient::version`].
    pub fn version_url(&self) -> &str {
        &self.version_url
    }

    /// Send `prompt` and return the generated text.
    pub async fn try_generate(&self, prompt: &str) -> Result<String, InferenceError> {
        info!(url = %self.generate_url, model = %self.model, prompt_len = prompt.len(), "sending generation request");
        let response = self
            .client
            .post(&self.generate_url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        let parsed: GenerateResponse = serde_json::from_slice(&body)?;
        debug!(output_len = parsed.response.len(), "generation response received");
        Ok(parsed.response)
    }

    /// Like [`InferenceClient::try_generate`], but failures become an apology.
    pub async fn generate(&self, prompt: &str) -> String {
        match self.try_generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, url = %self.generate_url, "generation failed");
                e.apology().to_owned()
            }
        }
    }

    /// Fetch the endpoint's version document.
    pub async fn version(&self) -> Result<serde_json::Value, InferenceError> {
        let response = self
            .client
            .get(&self.version_url)
            .timeout(VERSION_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl TextGenerator for InferenceClient {
    async fn generate(&self, prompt: &str) -> String {
        InferenceClient::generate(self, prompt).await
    }
}

fn version_url_for(generate_url: &str) -> String {
    match generate_url.strip_suffix("/api/generate") {
        Some(base) => format!("{base}/api/version"),
        None => format!("{}/api/version", generate_url.trim_end_matches('/')),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
