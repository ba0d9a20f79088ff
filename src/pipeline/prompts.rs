use std::path::{Path, PathBuf};

use super::ValidationError;

/// Template file names inside the prompts directory. Operators edit the
/// files to change wording without redeploying.
pub const EXTRACTION_PROMPT_FILE: &str = "extraction_prompt.txt";
pub const TREATMENT_PROMPT_FILE: &str = "treatment_prompt.txt";

/// A prompt template with a single named placeholder, e.g. `{text}`.
/// Loaded from external storage; the placeholder is verified at load
/// time so a broken template fails construction, not a pipeline run.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    placeholder: String,
}

impl PromptTemplate {
    pub fn load(path: &Path, placeholder: &str) -> Result<Self, ValidationError> {
        let template =
            std::fs::read_to_string(path).map_err(|e| ValidationError::PromptFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::from_template(&template, placeholder).map_err(|_| ValidationError::PromptPlaceholder {
            path: path.to_path_buf(),
            placeholder: placeholder.to_string(),
        })
    }

    /// Build from an in-memory template (tests, embedded defaults).
    pub fn from_template(template: &str, placeholder: &str) -> Result<Self, ValidationError> {
        let marker = format!("{{{placeholder}}}");
        if !template.contains(&marker) {
            return Err(ValidationError::PromptPlaceholder {
                path: PathBuf::new(),
                placeholder: placeholder.to_string(),
            });
        }
        Ok(Self {
            template: template.to_string(),
            placeholder: placeholder.to_string(),
        })
    }

    /// Substitute the placeholder with `value`.
    pub fn render(&self, value: &str) -> String {
        let marker = format!("{{{}}}", self.placeholder);
        self.template.replace(&marker, value)
    }
}

/// The two templates the pipeline needs: per-chunk extraction
/// (`{text}`) and treatment recommendation (`{medical_info}`).
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub extraction: PromptTemplate,
    pub treatment: PromptTemplate,
}

impl PromptSet {
    pub fn load(prompts_dir: &Path) -> Result<Self, ValidationError> {
        Ok(Self {
            extraction: PromptTemplate::load(&prompts_dir.join(EXTRACTION_PROMPT_FILE), "text")?,
            treatment: PromptTemplate::load(
                &prompts_dir.join(TREATMENT_PROMPT_FILE),
                "medical_info",
            )?,
        })
    }
}
