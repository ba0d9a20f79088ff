//! Rule-based field extraction: fixed pattern tables applied to
//! normalized document text, independent of any model call.
//!
//! Matching favors completeness over precision: all matches are kept in
//! order of appearance and nothing is deduplicated here. Callers that
//! need uniqueness dedupe downstream.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use super::types::{PatientInfo, StructuredRecord};

/// Context window radius around a section trigger match, in characters.
const SECTION_CONTEXT_CHARS: usize = 100;

fn insensitive(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("invalid built-in pattern")
}

// ═══════════════════════════════════════════════════════════
// Normalization
// ═══════════════════════════════════════════════════════════

static DISALLOWED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,;:()\-/]").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,;:])").unwrap());

/// Normalize raw extracted text before any pattern matching: strip
/// characters outside the medical allow-list (word characters,
/// whitespace and `.,;:()-/`), collapse whitespace runs to a single
/// space, and drop spacing before punctuation. Idempotent — stripping
/// happens before the whitespace collapse so removals cannot leave a
/// fresh run behind.
pub fn normalize_text(text: &str) -> String {
    let stripped = DISALLOWED_CHARS.replace_all(text, "");
    let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
    let tightened = SPACE_BEFORE_PUNCT.replace_all(&collapsed, "$1");
    tightened.trim().to_string()
}

// ═══════════════════════════════════════════════════════════
// Pattern tables
// ═══════════════════════════════════════════════════════════

/// Demographic patterns, matched independently against the full text.
/// First match wins; no match leaves the field unset.
static PATIENT_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("name", insensitive(r"patient(?:['s]|\s+name)?[:]\s*([A-Za-z\s]+)")),
        ("age", insensitive(r"age[:]\s*(\d+)")),
        ("gender", insensitive(r"(?:gender|sex)[:]\s*([A-Za-z]+)")),
        (
            "dob",
            insensitive(r"(?:date of birth|dob)[:]\s*(\d{1,2}[-/]\d{1,2}[-/]\d{2,4})"),
        ),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Vitals,
    Medications,
    Allergies,
    Symptoms,
    Diagnosis,
    Treatment,
}

/// Trigger patterns locating the anchor points around which a context
/// window is cut for section-specific parsing.
static SECTION_TRIGGERS: LazyLock<Vec<(SectionKind, Regex)>> = LazyLock::new(|| {
    vec![
        (
            SectionKind::Vitals,
            insensitive(r"vital\s+signs|vitals?|blood\s+pressure|heart\s+rate|temperature|\bBP\b|\bHR\b|\btemp\b"),
        ),
        (
            SectionKind::Medications,
            insensitive(r"medications?|prescri(?:bed|ption)s?|\bmeds\b|\btak(?:es|ing)\b|\bdrugs?\b"),
        ),
        (
            SectionKind::Allergies,
            insensitive(r"allerg(?:y|ies|ic)|adverse\s+reactions?"),
        ),
        (
            SectionKind::Symptoms,
            insensitive(r"symptoms?|complain(?:t|ts|ing)|presents?\s+with|\bpain\b|discomfort"),
        ),
        (
            SectionKind::Diagnosis,
            insensitive(r"diagnos(?:is|es|ed)|\bconditions?\b|\bdiseases?\b|assessment|impression"),
        ),
        (
            SectionKind::Treatment,
            insensitive(r"treatment|therapy|procedure|\bplan\b|follow[-\s]?up"),
        ),
    ]
});

/// Fine-grained vital patterns run within each vitals section; value
/// captured before its unit token. The degree sign never survives
/// normalization, so the unit letters also match bare.
static VITAL_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("blood_pressure", Regex::new(r"(\d{2,3}/\d{2,3})\s*(?:mmHg|BP)").unwrap()),
        ("heart_rate", Regex::new(r"(\d{2,3})\s*(?:bpm|HR)").unwrap()),
        (
            "temperature",
            Regex::new(r"(\d{2,3}\.\d{1,2})\s*(?:°?F|°?C|temp)").unwrap(),
        ),
        (
            "respiratory_rate",
            Regex::new(r"(\d{1,2})\s*(?:breaths/min|RR)").unwrap(),
        ),
        (
            "oxygen_saturation",
            Regex::new(r"(\d{2,3})\s*(?:%|SpO2)").unwrap(),
        ),
    ]
});

/// Drug-name token sequence (capitalized words) followed by a dosage
/// token. Case-sensitive: the capitalization is what separates the drug
/// name from surrounding prose.
static MEDICATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Z][A-Za-z]*(?:\s+[A-Z][A-Za-z]*)*)\s+(\d+(?:\.\d+)?\s*(?:mg|mcg|ml|g|tablets?|capsules?))")
        .unwrap()
});

static ALLERGY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    insensitive(r"(?:allergic|allergy|reaction)\s+to\s+([A-Za-z]+(?:\s+[A-Za-z]+)*)")
});

static SYMPTOM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    insensitive(r"(?:symptoms?|complaints?|pain|discomfort)[:]\s*([A-Za-z]+(?:\s+[A-Za-z]+)*)")
});

static DIAGNOSIS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    insensitive(r"(?:diagnosis|condition|disease)[:]\s*([A-Za-z]+(?:\s+[A-Za-z]+)*)")
});

static TREATMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    insensitive(r"(?:treatment|therapy|procedure)[:]\s*([A-Za-z]+(?:\s+[A-Za-z]+)*)")
});

// ═══════════════════════════════════════════════════════════
// Extraction
// ═══════════════════════════════════════════════════════════

/// Extract the full structured record from raw document text. Purely
/// deterministic: normalization followed by the fixed pattern tables.
pub fn extract_structured_record(text: &str) -> StructuredRecord {
    let text = normalize_text(text);
    let mut record = StructuredRecord {
        patient_info: extract_patient_info(&text),
        ..Default::default()
    };

    for (kind, trigger) in SECTION_TRIGGERS.iter() {
        let sections = extract_sections(&text, trigger);
        match kind {
            SectionKind::Vitals => {
                for section in &sections {
                    parse_vitals_into(section, &mut record.vitals);
                }
            }
            SectionKind::Medications => {
                record.medications.extend(parse_medications(&sections));
            }
            SectionKind::Allergies => {
                record
                    .allergies
                    .extend(parse_captures(&sections, &ALLERGY_PATTERN));
            }
            SectionKind::Symptoms => {
                record
                    .current_symptoms
                    .extend(parse_captures(&sections, &SYMPTOM_PATTERN));
            }
            SectionKind::Diagnosis => {
                record
                    .diagnosis
                    .extend(parse_captures(&sections, &DIAGNOSIS_PATTERN));
            }
            SectionKind::Treatment => {
                record
                    .treatment_plan
                    .extend(parse_captures(&sections, &TREATMENT_PATTERN));
            }
        }
    }

    record
}

fn extract_patient_info(text: &str) -> PatientInfo {
    let mut info = PatientInfo::default();
    for (field, pattern) in PATIENT_PATTERNS.iter() {
        let value = pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string());
        match *field {
            "name" => info.name = value,
            "age" => info.age = value,
            "gender" => info.gender = value,
            "dob" => info.dob = value,
            _ => unreachable!("unknown demographic field"),
        }
    }
    info
}

/// One section per trigger match: a fixed-width context window of
/// [`SECTION_CONTEXT_CHARS`] characters before and after the match,
/// clipped to the text bounds.
fn extract_sections(text: &str, trigger: &Regex) -> Vec<String> {
    trigger
        .find_iter(text)
        .map(|m| {
            let start = chars_back(text, m.start(), SECTION_CONTEXT_CHARS);
            let end = chars_forward(text, m.end(), SECTION_CONTEXT_CHARS);
            text[start..end].trim().to_string()
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Byte offset `n` characters before `from`, clipped to the start.
fn chars_back(text: &str, from: usize, n: usize) -> usize {
    text[..from]
        .char_indices()
        .rev()
        .take(n)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(from)
}

/// Byte offset `n` characters after `from`, clipped to the end.
fn chars_forward(text: &str, from: usize, n: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

/// First match per vital per section; a later section overwrites an
/// earlier value for the same vital.
fn parse_vitals_into(section: &str, vitals: &mut BTreeMap<String, String>) {
    for (name, pattern) in VITAL_PATTERNS.iter() {
        if let Some(value) = pattern.captures(section).and_then(|c| c.get(1)) {
            vitals.insert((*name).to_string(), value.as_str().to_string());
        }
    }
}

/// `"Name - dosage"` strings, all occurrences in order.
fn parse_medications(sections: &[String]) -> Vec<String> {
    sections
        .iter()
        .flat_map(|section| {
            MEDICATION_PATTERN.captures_iter(section).map(|c| {
                format!("{} - {}", c[1].trim(), c[2].trim())
            })
        })
        .collect()
}

/// All first-group captures across sections, in order of appearance.
fn parse_captures(sections: &[String], pattern: &Regex) -> Vec<String> {
    sections
        .iter()
        .flat_map(|section| {
            pattern
                .captures_iter(section)
                .map(|c| c[1].trim().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_text("a   b\t\nc"), "a b c");
    }

    #[test]
    fn normalize_strips_disallowed_characters() {
        assert_eq!(normalize_text("temp 98.6°F @home!"), "temp 98.6F home");
        // allow-list survives
        assert_eq!(normalize_text("BP: 120/80, (resting); ok."), "BP: 120/80, (resting); ok.");
    }

    #[test]
    fn normalize_tightens_space_before_punctuation() {
        assert_eq!(normalize_text("pain , worsening ; stable ."), "pain, worsening; stable.");
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in [
            "a ° b",
            "  BP :  120/80 mmHg  ",
            "Patient® takes  Metformin™ 500mg!",
            "",
            "already clean text.",
        ] {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn demographics_extracted_independently() {
        let text = "Patient: Jane Doe, Age: 34, Gender: Female, DOB: 03/12/1990";
        let record = extract_structured_record(text);
        assert_eq!(record.patient_info.name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.patient_info.age.as_deref(), Some("34"));
        assert_eq!(record.patient_info.gender.as_deref(), Some("Female"));
        assert_eq!(record.patient_info.dob.as_deref(), Some("03/12/1990"));
    }

    #[test]
    fn demographics_first_match_wins() {
        let text = "Age: 34 noted previously, Age: 35 at follow-up";
        let record = extract_structured_record(text);
        assert_eq!(record.patient_info.age.as_deref(), Some("34"));
    }

    #[test]
    fn absent_demographics_stay_unset() {
        let record = extract_structured_record("No identifying header in this note.");
        assert_eq!(record.patient_info.name, None);
        assert_eq!(record.patient_info.dob, None);
    }

    #[test]
    fn vitals_calibration_input() {
        let record = extract_structured_record("BP 120/80 mmHg, HR 72 bpm, temp 98.6°F");
        assert_eq!(record.vitals.get("blood_pressure").map(String::as_str), Some("120/80"));
        assert_eq!(record.vitals.get("heart_rate").map(String::as_str), Some("72"));
        assert_eq!(record.vitals.get("temperature").map(String::as_str), Some("98.6"));
    }

    #[test]
    fn medication_calibration_input() {
        let record = extract_structured_record("Patient takes Metformin 500mg daily");
        assert!(
            record.medications.contains(&"Metformin - 500mg".to_string()),
            "got {:?}",
            record.medications
        );
    }

    #[test]
    fn allergy_calibration_input() {
        let record = extract_structured_record("allergic to Penicillin");
        assert!(
            record.allergies.contains(&"Penicillin".to_string()),
            "got {:?}",
            record.allergies
        );
    }

    #[test]
    fn diagnosis_and_treatment_sections() {
        let text = "Diagnosis: Hypertension. Treatment: Lifestyle modification";
        let record = extract_structured_record(text);
        assert!(record.diagnosis.iter().any(|d| d.contains("Hypertension")), "got {:?}", record.diagnosis);
        assert!(
            record.treatment_plan.iter().any(|t| t.contains("Lifestyle modification")),
            "got {:?}",
            record.treatment_plan
        );
    }

    #[test]
    fn repeated_matches_are_not_deduplicated() {
        let text = "Medications: Aspirin 81mg at breakfast. Patient takes Aspirin 81mg daily.";
        let record = extract_structured_record(text);
        let count = record
            .medications
            .iter()
            .filter(|m| m.as_str() == "Aspirin - 81mg")
            .count();
        assert!(count >= 2, "expected duplicates preserved, got {:?}", record.medications);
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "Patient: John Roe, Age: 61. Diagnosis: COPD. Takes Salbutamol 100mcg. \
                    Vitals: BP 150/95 mmHg, HR 88 bpm. allergic to Latex.";
        let first = extract_structured_record(text);
        let second = extract_structured_record(text);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_text_yields_default_record() {
        let record = extract_structured_record("");
        assert_eq!(record, StructuredRecord::default());
    }

    #[test]
    fn text_without_sections_yields_empty_collections() {
        let record = extract_structured_record("An entirely unrelated paragraph about scheduling.");
        assert!(record.medications.is_empty());
        assert!(record.vitals.is_empty());
        assert!(record.allergies.is_empty());
    }
}
