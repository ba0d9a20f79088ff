//! Process configuration: an explicit `Settings` struct built once at
//! startup from environment variables and passed by reference into
//! every component. No ambient global lookup.

use std::path::PathBuf;

use thiserror::Error;

pub const APP_NAME: &str = "MediPlan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOGETHER_API_KEY is not set")]
    MissingApiKey,

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Runtime settings. Defaults mirror the deployed service; every value
/// can be overridden through its `MEDIPLAN_*` environment variable.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    pub history_dir: PathBuf,
    pub prompts_dir: PathBuf,
    /// Uploads above this many bytes are rejected before the pipeline runs.
    pub max_upload_size: usize,
    pub allowed_origin: String,
    pub together_api_key: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub ner_url: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub request_timeout_secs: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Lets tests supply a map
    /// instead of mutating process-wide environment state.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let together_api_key = var("TOGETHER_API_KEY").ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            bind_addr: var("MEDIPLAN_BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8000".into()),
            upload_dir: var("MEDIPLAN_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| "data/uploads".into()),
            history_dir: var("MEDIPLAN_HISTORY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| "data/analysis_history".into()),
            prompts_dir: var("MEDIPLAN_PROMPTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| "prompts".into()),
            max_upload_size: parse_or(&var, "MEDIPLAN_MAX_UPLOAD_SIZE", 10 * 1024 * 1024)?,
            allowed_origin: var("MEDIPLAN_ALLOWED_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".into()),
            together_api_key,
            model_name: var("MEDIPLAN_MODEL")
                .unwrap_or_else(|| "deepseek-ai/DeepSeek-R1-Distill-Llama-70B-free".into()),
            temperature: parse_or(&var, "MEDIPLAN_TEMPERATURE", 0.7)?,
            max_tokens: parse_or(&var, "MEDIPLAN_MAX_TOKENS", 1000)?,
            ner_url: var("MEDIPLAN_NER_URL").unwrap_or_else(|| "http://localhost:8100".into()),
            chunk_size: parse_or(&var, "MEDIPLAN_CHUNK_SIZE", 1000)?,
            chunk_overlap: parse_or(&var, "MEDIPLAN_CHUNK_OVERLAP", 200)?,
            request_timeout_secs: parse_or(&var, "MEDIPLAN_TIMEOUT_SECS", 120)?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    var: impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn api_key_is_required() {
        let map = vars(&[]);
        let result = Settings::from_vars(|name| map.get(name).cloned());
        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn defaults_match_deployed_service() {
        let map = vars(&[("TOGETHER_API_KEY", "tgp_v1_x")]);
        let settings = Settings::from_vars(|name| map.get(name).cloned()).unwrap();
        assert_eq!(settings.max_upload_size, 10 * 1024 * 1024);
        assert_eq!(settings.chunk_size, 1000);
        assert_eq!(settings.chunk_overlap, 200);
        assert_eq!(settings.max_tokens, 1000);
        assert!((settings.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(settings.upload_dir, PathBuf::from("data/uploads"));
        assert_eq!(settings.history_dir, PathBuf::from("data/analysis_history"));
        assert_eq!(settings.allowed_origin, "http://localhost:3000");
    }

    #[test]
    fn overrides_are_honored() {
        let map = vars(&[
            ("TOGETHER_API_KEY", "tgp_v1_x"),
            ("MEDIPLAN_CHUNK_SIZE", "500"),
            ("MEDIPLAN_MAX_UPLOAD_SIZE", "1024"),
            ("MEDIPLAN_MODEL", "mistralai/Mistral-7B-Instruct-v0.2"),
        ]);
        let settings = Settings::from_vars(|name| map.get(name).cloned()).unwrap();
        assert_eq!(settings.chunk_size, 500);
        assert_eq!(settings.max_upload_size, 1024);
        assert_eq!(settings.model_name, "mistralai/Mistral-7B-Instruct-v0.2");
    }

    #[test]
    fn malformed_numeric_value_is_rejected() {
        let map = vars(&[
            ("TOGETHER_API_KEY", "tgp_v1_x"),
            ("MEDIPLAN_CHUNK_SIZE", "lots"),
        ]);
        let result = Settings::from_vars(|name| map.get(name).cloned());
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                name: "MEDIPLAN_CHUNK_SIZE",
                ..
            })
        ));
    }
}
