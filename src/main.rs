use std::process::ExitCode;
use std::sync::Arc;

use axum::http::HeaderValue;
use tracing_subscriber::EnvFilter;

use mediplan::api::{build_router, ApiContext};
use mediplan::config::{Settings, APP_NAME, APP_VERSION};
use mediplan::history::AnalysisHistory;
use mediplan::pipeline::{
    DocumentAnalyzer, PdfTextLoader, PromptSet, RemoteNerClient, TextSplitter, TogetherClient,
};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("{APP_NAME} starting v{APP_VERSION}");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    std::fs::create_dir_all(&settings.upload_dir)?;
    std::fs::create_dir_all(&settings.history_dir)?;

    // All construction-time validation (API key format, splitter
    // bounds, prompt placeholders) happens here, before serving.
    let generator = TogetherClient::new(
        &settings.together_api_key,
        &settings.model_name,
        settings.temperature,
        settings.max_tokens,
        settings.request_timeout_secs,
    )?;
    let ner = RemoteNerClient::new(&settings.ner_url, settings.request_timeout_secs);
    let prompts = PromptSet::load(&settings.prompts_dir)?;
    let splitter = TextSplitter::new(settings.chunk_size, settings.chunk_overlap)?;

    let analyzer = DocumentAnalyzer::new(
        Box::new(PdfTextLoader),
        Box::new(generator),
        Box::new(ner),
        prompts,
        splitter,
    );

    let ctx = ApiContext {
        analyzer: Arc::new(analyzer),
        history: AnalysisHistory::new(settings.history_dir.clone()),
        upload_dir: settings.upload_dir.clone(),
        max_upload_size: settings.max_upload_size,
    };

    let allowed_origin = HeaderValue::from_str(&settings.allowed_origin)
        .map_err(|_| format!("invalid MEDIPLAN_ALLOWED_ORIGIN: {}", settings.allowed_origin))?;
    let router = build_router(ctx, allowed_origin);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
        tracing::info!(addr = %settings.bind_addr, "listening");
        axum::serve(listener, router).await?;
        Ok(())
    })
}
