use axum::extract::DefaultBodyLimit;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use super::endpoints::{self, ApiContext};

/// Multipart framing overhead allowed on top of the raw file limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the service router. CORS is restricted to the single
/// configured frontend origin.
pub fn build_router(ctx: ApiContext, allowed_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, ACCEPT])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(600));

    let body_limit = ctx.max_upload_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/api", get(endpoints::root))
        .route("/api/health", get(endpoints::health))
        .route("/api/v1/upload", post(endpoints::upload))
        .route("/api/v1/analysis", get(endpoints::latest_analysis))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(ctx)
        .layer(cors)
}
