//! Natural-language intent classification.
//!
//! # Responsibility
//! - Turn a free-form product idea into research topics via a generative
//!   language model.
//! - Extract and validate the model's JSON answer.
//!
//! # Invariants
//! - `IntentClassifier::classify` never returns an error and never panics:
//!   missing credentials, transport failures and unparseable output all
//!   yield `Intent::default()`.
//! - Returned `confidence` is always within `[0.0, 1.0]`.

pub mod gemini;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

const MAX_LOGGED_RESPONSE_CHARS: usize = 240;

const PROMPT_TEMPLATE: &str = r#"You are an intent classifier for a technology research discovery app.

Your task:
Given a user's idea, identify the TECHNICAL and RESEARCH domains involved.

These may include (but are not limited to):
- Machine Learning
- Artificial Intelligence
- Data Science
- Time Series Forecasting
- Computer Vision
- Natural Language Processing
- Systems
- Software Engineering
- Domain-specific sciences (e.g. meteorology, healthcare, finance)

Rules:
- If the idea involves building an app, system, or model, ALWAYS return at least 1-3 relevant topics.
- Be generous, not conservative.
- Do NOT return an empty list unless the message is clearly non-technical.

Respond ONLY in valid JSON in this format:
{
  "topics": ["Machine Learning", "Data Science"],
  "confidence": 0.8,
  "explanation": "Short explanation of why these topics apply."
}

User idea:
"#;

/// Classification result returned to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub topics: Vec<String>,
    pub confidence: f64,
    pub explanation: String,
}

impl Intent {
    /// Whether this is the degrade-to-empty value.
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty() && self.confidence == 0.0 && self.explanation.is_empty()
    }
}

pub type IntentResult<T> = Result<T, IntentError>;

/// Internal classifier failures; never escapes `classify`.
#[derive(Debug)]
pub enum IntentError {
    /// Request could not be sent or the response body could not be read.
    Transport(String),
    /// Model API answered with a non-success status.
    Status(u16),
    /// Model API envelope had no text candidate.
    EmptyResponse,
    /// Model text did not contain a JSON object.
    MissingJson,
    /// JSON object had the wrong shape.
    Malformed(String),
}

impl Display for IntentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "model request failed: {message}"),
            Self::Status(status) => write!(f, "model API returned status {status}"),
            Self::EmptyResponse => write!(f, "model response contained no text"),
            Self::MissingJson => write!(f, "no JSON object found in model response"),
            Self::Malformed(message) => write!(f, "malformed intent JSON: {message}"),
        }
    }
}

impl Error for IntentError {}

/// Backend that turns a prompt into raw model text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> IntentResult<String>;
}

/// Degrade-to-empty intent classifier.
#[derive(Clone, Default)]
pub struct IntentClassifier {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl IntentClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    /// Classifier without a backend; always returns the empty intent.
    pub fn disabled() -> Self {
        Self { generator: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    /// Classifies `message` into research topics.
    pub async fn classify(&self, message: &str) -> Intent {
        let Some(generator) = &self.generator else {
            debug!("event=intent_classify module=intent status=skipped reason=disabled");
            return Intent::default();
        };

        let raw = match generator.generate(&build_prompt(message)).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    "event=intent_classify module=intent status=error stage=generate error={}",
                    err
                );
                return Intent::default();
            }
        };
        debug!(
            "event=intent_classify module=intent status=raw response={}",
            truncate_for_log(&raw)
        );

        match parse_intent_response(&raw) {
            Ok(intent) => intent,
            Err(err) => {
                warn!(
                    "event=intent_classify module=intent status=error stage=parse error={}",
                    err
                );
                Intent::default()
            }
        }
    }
}

/// Builds the classifier prompt for one user message.
pub fn build_prompt(message: &str) -> String {
    format!("{PROMPT_TEMPLATE}{message}\n")
}

#[derive(Debug, Deserialize)]
struct RawIntent {
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    confidence: Option<serde_json::Value>,
    #[serde(default)]
    explanation: String,
}

/// Extracts the outermost `{...}` span from model text and validates it.
pub fn parse_intent_response(raw: &str) -> IntentResult<Intent> {
    let text = raw.trim();
    let start = text.find('{').ok_or(IntentError::MissingJson)?;
    let end = text.rfind('}').ok_or(IntentError::MissingJson)?;
    if end < start {
        return Err(IntentError::MissingJson);
    }

    let parsed: RawIntent = serde_json::from_str(&text[start..=end])
        .map_err(|err| IntentError::Malformed(err.to_string()))?;
    let confidence = match parsed.confidence {
        None | Some(serde_json::Value::Null) => 0.0,
        Some(serde_json::Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| IntentError::Malformed(format!("confidence `{number}`")))?,
        Some(serde_json::Value::String(value)) => value
            .trim()
            .parse::<f64>()
            .map_err(|_| IntentError::Malformed(format!("confidence `{value}`")))?,
        Some(other) => return Err(IntentError::Malformed(format!("confidence `{other}`"))),
    };
    if !confidence.is_finite() {
        return Err(IntentError::Malformed(format!("confidence `{confidence}`")));
    }

    Ok(Intent {
        topics: parsed.topics,
        confidence: confidence.clamp(0.0, 1.0),
        explanation: parsed.explanation,
    })
}

fn truncate_for_log(value: &str) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized
        .chars()
        .take(MAX_LOGGED_RESPONSE_CHARS)
        .collect::<String>();
    if normalized.chars().count() > MAX_LOGGED_RESPONSE_CHARS {
        truncated.push_str("...");
    }
    truncated
}
