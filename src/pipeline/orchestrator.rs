use std::path::Path;

use uuid::Uuid;

use super::chunker::TextSplitter;
use super::extract::extract_structured_record;
use super::llm::TextGenerator;
use super::loader::DocumentLoader;
use super::ner::{categorize_entities, NerBackend};
use super::prompts::PromptSet;
use super::types::{AnalysisMetadata, AnalysisResult, TreatmentPlan};
use super::PipelineError;

/// Heuristic confidence attached to every treatment plan until a real
/// scoring model replaces it.
const TREATMENT_CONFIDENCE: f32 = 0.85;

const TREATMENT_SOURCE: &str = "Generated from patient medical records";

/// Sequences the full analysis pipeline:
/// load → chunk → per-chunk extraction → combine → rule-based record →
/// NER → treatment recommendation → assemble.
///
/// All three external capabilities are injected, so alternate PDF, LLM
/// and NER providers substitute without touching pipeline logic. Linear
/// flow with a single failure exit: the first stage error wraps its
/// cause into [`PipelineError`] and aborts the run. No stage is retried
/// and no partial result is ever produced. Cleanup of the uploaded file
/// is the caller's responsibility.
pub struct DocumentAnalyzer {
    loader: Box<dyn DocumentLoader + Send + Sync>,
    generator: Box<dyn TextGenerator + Send + Sync>,
    ner: Box<dyn NerBackend + Send + Sync>,
    prompts: PromptSet,
    splitter: TextSplitter,
}

impl DocumentAnalyzer {
    pub fn new(
        loader: Box<dyn DocumentLoader + Send + Sync>,
        generator: Box<dyn TextGenerator + Send + Sync>,
        ner: Box<dyn NerBackend + Send + Sync>,
        prompts: PromptSet,
        splitter: TextSplitter,
    ) -> Self {
        Self {
            loader,
            generator,
            ner,
            prompts,
            splitter,
        }
    }

    /// Run the pipeline over one document. Exactly one
    /// [`AnalysisResult`] on success; the result is immutable once
    /// assembled.
    pub fn analyze(
        &self,
        path: &Path,
        original_filename: &str,
    ) -> Result<AnalysisResult, PipelineError> {
        let analysis_id = Uuid::new_v4();
        let _span = tracing::info_span!(
            "analyze_document",
            analysis_id = %analysis_id,
            file = original_filename
        )
        .entered();

        // Step 1: load pages. A load failure aborts before any model
        // call is attempted.
        let pages = self.loader.load(path)?;
        let page_count = pages.len();
        let full_text = pages.join("\n");

        // Step 2: chunk. Empty documents yield zero chunks and flow
        // through with empty fields rather than erroring.
        let chunks: Vec<&str> = self.splitter.split(&full_text).collect();
        let chunk_count = chunks.len();
        tracing::info!(pages = page_count, chunks = chunk_count, "document loaded");

        // Step 3: per-chunk model extraction, sequential, results kept
        // in chunk order.
        let mut summaries = Vec::with_capacity(chunk_count);
        for (index, chunk) in chunks.iter().enumerate() {
            let prompt = self.prompts.extraction.render(chunk);
            let summary = self
                .generator
                .generate(&prompt)
                .map_err(|source| PipelineError::ChunkExtraction {
                    chunk: index,
                    source,
                })?;
            summaries.push(summary);
        }

        // Step 4: combine in original chunk order.
        let combined = summaries.join("\n");

        // Step 5: rule-based record over the full document text — an
        // independent signal from the model-based path.
        let structured_record = extract_structured_record(&full_text);

        // Step 6: NER over the combined model output.
        let entities = categorize_entities(self.ner.recognize(&combined)?);
        tracing::info!(
            conditions = entities.conditions.len(),
            medications = entities.medications.len(),
            "entities recognized"
        );

        // Step 7: treatment recommendation over the combined summary.
        let treatment_prompt = self.prompts.treatment.render(&combined);
        let recommendations = self
            .generator
            .generate(&treatment_prompt)
            .map_err(PipelineError::Recommendation)?;

        // Step 8: assemble.
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        tracing::info!("analysis complete");
        Ok(AnalysisResult {
            raw_text: combined,
            structured_record,
            entities,
            treatment_plan: TreatmentPlan {
                recommendations,
                confidence_score: TREATMENT_CONFIDENCE,
                source_data: TREATMENT_SOURCE.to_string(),
            },
            metadata: AnalysisMetadata {
                pages: page_count,
                chunks: chunk_count,
            },
            timestamp,
            original_filename: original_filename.to_string(),
        })
    }

    /// Table extraction is an intentional no-op stub: empty result,
    /// never an error.
    pub fn extract_tables(&self, _path: &Path) -> Vec<serde_json::Value> {
        Vec::new()
    }

    /// Image extraction is an intentional no-op stub: empty result,
    /// never an error.
    pub fn extract_images(&self, _path: &Path) -> Vec<serde_json::Value> {
        Vec::new()
    }
}
