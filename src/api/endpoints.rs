use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use super::error::ApiError;
use crate::history::AnalysisHistory;
use crate::pipeline::{AnalysisResult, DocumentAnalyzer};

/// Shared state handed to every handler. The analyzer is the one
/// long-lived pipeline object; each upload runs it on its own document.
#[derive(Clone)]
pub struct ApiContext {
    pub analyzer: Arc<DocumentAnalyzer>,
    pub history: AnalysisHistory,
    pub upload_dir: PathBuf,
    pub max_upload_size: usize,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub analysis: AnalysisResult,
}

/// `GET /api` — welcome banner.
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the MediPlan API" }))
}

/// `GET /api/health`
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// `POST /api/v1/upload` — receive one PDF, run the analysis pipeline,
/// persist the result to history.
///
/// Validation (extension, size) happens before the pipeline is
/// invoked; a pipeline failure deletes the saved upload file.
pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<(String, axum::body::Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let original = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| ApiError::BadRequest("File field has no filename".into()))?;
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            upload = Some((original, data));
            break;
        }
    }

    let (original_filename, data) =
        upload.ok_or_else(|| ApiError::BadRequest("Missing multipart field 'file'".into()))?;

    if !original_filename.to_lowercase().ends_with(".pdf") {
        return Err(ApiError::BadRequest("Only PDF files are allowed".into()));
    }
    if data.len() > ctx.max_upload_size {
        return Err(ApiError::PayloadTooLarge(ctx.max_upload_size));
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let saved_name = format!("{timestamp}_{original_filename}");
    let saved_path = ctx.upload_dir.join(&saved_name);

    tokio::fs::create_dir_all(&ctx.upload_dir)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    tokio::fs::write(&saved_path, &data)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(file = %original_filename, bytes = data.len(), "upload accepted");

    // The core pipeline is synchronous and blocking by design; run it
    // off the async worker threads.
    let analyzer = ctx.analyzer.clone();
    let history = ctx.history.clone();
    let pipeline_path = saved_path.clone();
    let pipeline_name = original_filename.clone();
    let outcome = tokio::task::spawn_blocking(move || -> Result<AnalysisResult, ApiError> {
        let analysis = analyzer
            .analyze(&pipeline_path, &pipeline_name)
            .map_err(|e| ApiError::Pipeline(e.to_string()))?;
        history
            .save(&analysis)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(analysis)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    match outcome {
        Ok(analysis) => Ok(Json(UploadResponse {
            message: "File uploaded and processed successfully".into(),
            filename: saved_name,
            analysis,
        })),
        Err(e) => {
            // Boundary owns cleanup of the saved upload on failure.
            if let Err(cleanup) = tokio::fs::remove_file(&saved_path).await {
                tracing::warn!(path = %saved_path.display(), error = %cleanup, "failed to remove upload after pipeline failure");
            }
            Err(e)
        }
    }
}

/// `GET /api/v1/analysis` — most recent persisted analysis.
pub async fn latest_analysis(
    State(ctx): State<ApiContext>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let history = ctx.history.clone();
    let latest = tokio::task::spawn_blocking(move || history.latest())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(match latest {
        None => json!({
            "message": "No analysis available",
            "analysis": { "status": "No recent analysis available" }
        }),
        Some(analysis) => json!({
            "message": "Analysis retrieved successfully",
            "analysis": analysis
        }),
    }))
}
