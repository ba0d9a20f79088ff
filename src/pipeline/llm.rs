use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;
use std::sync::Mutex;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ValidationError;

/// Together chat-completions endpoint.
const TOGETHER_API_URL: &str = "https://api.together.xyz/v1/chat/completions";

const SYSTEM_PROMPT: &str =
    "You are a medical AI assistant that provides treatment recommendations based on patient data.";

/// Together API keys start with `tgp_v1_` followed by a long opaque tail.
static API_KEY_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^tgp_v1_[A-Za-z0-9_-]{40,}$").unwrap());

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("text-generation service is not reachable at {0}")]
    Connection(String),

    #[error("text-generation request timed out after {0}s")]
    Timeout(u64),

    #[error("text-generation service returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("response parsing error: {0}")]
    ResponseParsing(String),

    #[error("response contained no choices")]
    EmptyResponse,
}

/// Remote text-generation capability. Synchronous and blocking: calls
/// return the full generated text or fail; no streaming, no retries.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Blocking client for the Together chat-completions API. Model,
/// temperature and max-token limit are fixed per client so the same
/// document always produces the same request.
pub struct TogetherClient {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl TogetherClient {
    /// Key format is checked here; a malformed key fails construction,
    /// never a call mid-pipeline.
    pub fn new(
        api_key: &str,
        model: &str,
        temperature: f32,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, ValidationError> {
        validate_api_key(api_key)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: TOGETHER_API_URL.to_string(),
            model: model.to_string(),
            temperature,
            max_tokens,
            client,
            timeout_secs,
        })
    }

    /// Point the client at a different endpoint (local stub in tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Swap the API key, re-validating the format first.
    pub fn update_api_key(&mut self, new_api_key: &str) -> Result<(), ValidationError> {
        validate_api_key(new_api_key)?;
        self.api_key = new_api_key.to_string();
        Ok(())
    }
}

fn validate_api_key(api_key: &str) -> Result<(), ValidationError> {
    if api_key.is_empty() {
        return Err(ValidationError::MissingApiKey);
    }
    if !API_KEY_FORMAT.is_match(api_key) {
        return Err(ValidationError::ApiKeyFormat);
    }
    Ok(())
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl TextGenerator for TogetherClient {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    GenerationError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    GenerationError::Timeout(self.timeout_secs)
                } else {
                    GenerationError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| GenerationError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)
    }
}

/// Mock generator for tests — returns a canned response and records
/// every prompt it receives.
pub struct MockGenerator {
    response: String,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl TextGenerator for MockGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.response.clone())
    }
}

/// Mock generator that always fails, counting attempted calls.
pub struct FailingGenerator {
    calls: AtomicUsize,
}

impl FailingGenerator {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FailingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TextGenerator for FailingGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GenerationError::Connection("mock endpoint".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_key() -> String {
        format!("tgp_v1_{}", "a".repeat(48))
    }

    #[test]
    fn accepts_well_formed_api_key() {
        let client = TogetherClient::new(&valid_key(), "test-model", 0.7, 1000, 60);
        assert!(client.is_ok());
    }

    #[test]
    fn rejects_empty_api_key() {
        let result = TogetherClient::new("", "test-model", 0.7, 1000, 60);
        assert!(matches!(result, Err(ValidationError::MissingApiKey)));
    }

    #[test]
    fn rejects_malformed_api_key() {
        for key in ["tgp_v1_short", "sk-abcdef", "tgp_v2_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"] {
            let result = TogetherClient::new(key, "test-model", 0.7, 1000, 60);
            assert!(matches!(result, Err(ValidationError::ApiKeyFormat)), "key: {key}");
        }
    }

    #[test]
    fn update_api_key_revalidates() {
        let mut client = TogetherClient::new(&valid_key(), "test-model", 0.7, 1000, 60).unwrap();
        assert!(client.update_api_key("bogus").is_err());
        let replacement = format!("tgp_v1_{}", "b".repeat(40));
        assert!(client.update_api_key(&replacement).is_ok());
        assert_eq!(client.api_key, replacement);
    }

    #[test]
    fn mock_generator_records_prompts_in_order() {
        let generator = MockGenerator::new("summary");
        generator.generate("first").unwrap();
        generator.generate("second").unwrap();
        assert_eq!(generator.call_count(), 2);
        assert_eq!(generator.prompts(), vec!["first", "second"]);
    }

    #[test]
    fn failing_generator_counts_calls() {
        let generator = FailingGenerator::new();
        assert!(generator.generate("x").is_err());
        assert_eq!(generator.call_count(), 1);
    }
}
