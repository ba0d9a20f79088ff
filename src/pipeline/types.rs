use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Patient demographics pulled from the document by pattern matching.
/// A field that never matched stays `None` and is omitted from JSON,
/// never serialized as an empty string.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PatientInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
}

/// Canonical rule-based extraction output.
///
/// Every list field defaults to empty and is always present in the
/// serialized form; `vitals` maps vital name to the captured value string.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StructuredRecord {
    pub patient_info: PatientInfo,
    pub medical_history: Vec<String>,
    pub current_symptoms: Vec<String>,
    pub medications: Vec<String>,
    pub vitals: BTreeMap<String, String>,
    pub allergies: Vec<String>,
    pub diagnosis: Vec<String>,
    pub treatment_plan: Vec<String>,
}

/// Categorized named-entity output from the statistical NER backend.
///
/// Kept separate from [`StructuredRecord`] because its extraction method
/// differs from the regex path; the two act as complementary signals.
/// Entities matching none of the four category rules land in `other`
/// instead of being dropped.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EntityBundle {
    pub conditions: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
    pub vitals: Vec<String>,
    pub other: Vec<String>,
}

/// Result of the treatment recommendation stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentPlan {
    pub recommendations: String,
    pub confidence_score: f32,
    pub source_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisMetadata {
    pub pages: usize,
    pub chunks: usize,
}

/// Final merged artifact of one pipeline run. Built exactly once per
/// upload and never mutated afterwards; persisted as an immutable
/// snapshot keyed by `timestamp` (`YYYYMMDD_HHMMSS`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Concatenated per-chunk extraction model output.
    pub raw_text: String,
    pub structured_record: StructuredRecord,
    pub entities: EntityBundle,
    pub treatment_plan: TreatmentPlan,
    pub metadata: AnalysisMetadata,
    pub timestamp: String,
    pub original_filename: String,
}
