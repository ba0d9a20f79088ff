//! MediPlan: healthcare document analysis. Ingests a clinical PDF and
//! produces a structured medical record plus a narrative treatment
//! plan, combining rule-based extraction, named-entity recognition and
//! remote LLM calls.

pub mod api;
pub mod config;
pub mod history;
pub mod pipeline;
