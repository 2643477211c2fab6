//! Gemini `generateContent` backend for intent classification.

use super::{IntentClassifier, IntentError, IntentResult, TextGenerator};
use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Text generator calling the Gemini REST API.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> IntentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| IntentError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Overrides the API root (e.g. for a regional endpoint or a proxy).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            model
        )
    }
}

impl IntentClassifier {
    /// Builds a Gemini-backed classifier, or a disabled one when no usable
    /// API key is configured.
    pub fn from_api_key(api_key: Option<&str>, model: &str) -> Self {
        let Some(api_key) = api_key.map(str::trim).filter(|key| !key.is_empty()) else {
            info!("event=intent_init module=intent status=disabled reason=missing_api_key");
            return Self::disabled();
        };
        match GeminiGenerator::new(api_key, model) {
            Ok(generator) => {
                info!("event=intent_init module=intent status=ok model={}", model);
                Self::new(Arc::new(generator))
            }
            Err(err) => {
                warn!(
                    "event=intent_init module=intent status=disabled error={}",
                    err
                );
                Self::disabled()
            }
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> IntentResult<String> {
        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| IntentError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IntentError::Status(status.as_u16()));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|err| IntentError::Transport(err.to_string()))?;
        extract_text(body)
    }
}

/// Concatenates the parts of the first candidate; later candidates are
/// alternate answers and are ignored.
fn extract_text(body: GenerateResponse) -> IntentResult<String> {
    let text = body
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(IntentError::EmptyResponse);
    }
    Ok(text)
}
