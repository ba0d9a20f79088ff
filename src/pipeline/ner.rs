use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::EntityBundle;

#[derive(Error, Debug)]
pub enum NerError {
    #[error("NER service is not reachable at {0}")]
    Connection(String),

    #[error("NER request timed out after {0}s")]
    Timeout(u64),

    #[error("NER service returned error (status {status}): {body}")]
    Backend { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("NER response parsing error: {0}")]
    ResponseParsing(String),
}

/// A single entity span as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedEntity {
    pub text: String,
    pub label: String,
}

/// Pluggable NER capability: any backend returning (text, label) entity
/// spans for a piece of text.
pub trait NerBackend {
    fn recognize(&self, text: &str) -> Result<Vec<NamedEntity>, NerError>;
}

/// Categorize backend entities into the bundle. Label equality for
/// conditions and medications, case-insensitive substring heuristics
/// for allergies and vitals. Spans matching no rule go to `other`
/// rather than being dropped.
pub fn categorize_entities(entities: Vec<NamedEntity>) -> EntityBundle {
    const VITAL_HINTS: [&str; 3] = ["blood pressure", "heart rate", "temperature"];

    let mut bundle = EntityBundle::default();
    for entity in entities {
        let lower = entity.text.to_lowercase();
        if entity.label == "DISEASE" {
            bundle.conditions.push(entity.text);
        } else if entity.label == "CHEMICAL" {
            bundle.medications.push(entity.text);
        } else if lower.contains("allerg") {
            bundle.allergies.push(entity.text);
        } else if VITAL_HINTS.iter().any(|hint| lower.contains(hint)) {
            bundle.vitals.push(entity.text);
        } else {
            bundle.other.push(entity.text);
        }
    }
    bundle
}

/// HTTP client for a remote NER service exposing
/// `POST /recognize {"text": ...}` returning `{"entities": [{"text", "label"}]}`.
pub struct RemoteNerClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl RemoteNerClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    entities: Vec<NamedEntity>,
}

impl NerBackend for RemoteNerClient {
    fn recognize(&self, text: &str) -> Result<Vec<NamedEntity>, NerError> {
        let url = format!("{}/recognize", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&RecognizeRequest { text })
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    NerError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    NerError::Timeout(self.timeout_secs)
                } else {
                    NerError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NerError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RecognizeResponse = response
            .json()
            .map_err(|e| NerError::ResponseParsing(e.to_string()))?;

        Ok(parsed.entities)
    }
}

/// Mock NER backend for tests — returns a configurable entity list.
pub struct MockNerBackend {
    entities: Vec<NamedEntity>,
}

impl MockNerBackend {
    pub fn new(entities: Vec<NamedEntity>) -> Self {
        Self { entities }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl NerBackend for MockNerBackend {
    fn recognize(&self, _text: &str) -> Result<Vec<NamedEntity>, NerError> {
        Ok(self.entities.clone())
    }
}
