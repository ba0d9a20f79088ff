pub mod chunker;
pub mod extract;
pub mod llm;
pub mod loader;
pub mod ner;
pub mod orchestrator;
pub mod prompts;
pub mod types;

pub use chunker::*;
pub use extract::*;
pub use llm::*;
pub use loader::*;
pub use ner::*;
pub use orchestrator::*;
pub use prompts::*;
pub use types::*;

use std::path::PathBuf;

use thiserror::Error;

/// Construction-time validation failures: malformed configuration is
/// rejected when a component is built, never surfaced mid-pipeline.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Together API key is required; pass it explicitly or set TOGETHER_API_KEY")]
    MissingApiKey,

    #[error("invalid Together API key format")]
    ApiKeyFormat,

    #[error("chunk overlap must be smaller than chunk size (size {chunk_size}, overlap {overlap})")]
    SplitterConfig { chunk_size: usize, overlap: usize },

    #[error("failed to read prompt template {path}: {reason}")]
    PromptFile { path: PathBuf, reason: String },

    #[error("prompt template {path} is missing the {{{placeholder}}} placeholder")]
    PromptPlaceholder { path: PathBuf, placeholder: String },
}

/// Stage-level pipeline failure. Each variant wraps the underlying
/// cause with the stage it occurred in; the orchestrator never retries
/// and never returns a partial result.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to read document: {0}")]
    DocumentRead(#[from] loader::DocumentReadError),

    #[error("extraction model call failed on chunk {chunk}: {source}")]
    ChunkExtraction {
        chunk: usize,
        source: llm::GenerationError,
    },

    #[error("treatment recommendation call failed: {0}")]
    Recommendation(llm::GenerationError),

    #[error("entity recognition failed: {0}")]
    EntityRecognition(#[from] ner::NerError),
}
