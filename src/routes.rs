use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::handlers::{self, AppState};

/// Multipart submissions carry a bill of up to 10 MiB plus form overhead.
pub const SUBMIT_BODY_LIMIT: usize = 12 * 1024 * 1024;

pub const DEFAULT_BODY_LIMIT: usize = 5 * 1024 * 1024;

/// Serves the OpenAPI YAML document.
async fn serve_openapi_document() -> impl IntoResponse {
    match tokio::fs::read_to_string("openapi.yml").await {
        Ok(content) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/yaml")],
            content,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "OpenAPI document not found").into_response(),
    }
}

/// Serves the Swagger UI page pointed at `/api-docs/openapi.yml`.
async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Bill Intake API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.yml",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

/// Builds the full application router.
///
/// `rate_limit` enables the per-IP governor on everything except `/health`.
/// The governor keys on the client IP, so it is left off for in-process
/// requests that carry no peer address.
pub fn build_router(state: Arc<AppState>, rate_limit: bool) -> anyhow::Result<Router> {
    // Submissions get a larger body allowance than the rest of the API
    let submit_routes = Router::new()
        .route("/api/submit-bill", post(handlers::submit_bill))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(SUBMIT_BODY_LIMIT))
                .layer(RequestBodyLimitLayer::new(SUBMIT_BODY_LIMIT)),
        );

    // Extraction is callable cross-origin
    let parse_pdf_routes = Router::new()
        .route(
            "/api/parse-pdf",
            post(handlers::parse_pdf).options(handlers::parse_pdf_preflight),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        );

    let api_routes = Router::new()
        // API Documentation
        .route("/docs", get(serve_swagger_ui))
        .route("/api-docs/openapi.yml", get(serve_openapi_document))
        // Analysis progress
        .route("/api/analysis", post(handlers::start_analysis))
        .route("/api/analysis/:id", axum::routing::delete(handlers::end_analysis))
        .route("/api/analysis/:id/tick", post(handlers::tick_analysis))
        .route("/api/analysis/:id/unlock", post(handlers::unlock_analysis))
        .route("/api/analysis/:id/results", get(handlers::analysis_results))
        // Admin review
        .route("/admin", get(admin::dashboard))
        .route("/admin/login", get(admin::login_page).post(admin::login))
        .route("/admin/logout", post(admin::logout))
        .route("/admin/download", get(admin::download))
        .route("/api/admin/submissions", get(admin::list_submissions))
        .route("/api/admin/extract", post(admin::extract))
        .merge(parse_pdf_routes)
        .layer(RequestBodyLimitLayer::new(DEFAULT_BODY_LIMIT));

    let mut protected_routes = submit_routes.merge(api_routes);

    if rate_limit {
        // 10 requests/second per IP, burst of 20
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(10)
                .burst_size(20)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
        );
        protected_routes = protected_routes.layer(GovernorLayer {
            config: governor_conf,
        });
    }

    // Health check bypasses rate limiting
    Ok(Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http()))
}
