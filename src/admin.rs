//! Admin review area: server-rendered dashboard, sign-in and bill access.
//!
//! Rendering is plain string building over escaped values. Nothing here
//! mutates a submission.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use url::form_urlencoded;

use crate::auth::{self, AdminSession, AdminUser};
use crate::errors::AppError;
use crate::extraction::{
    ExtractionError, ExtractionFailure, ExtractionOutcome, ExtractionResult, ParsePdfRequest,
};
use crate::handlers::AppState;
use crate::models::SubmissionView;
use crate::validation::PDF_MEDIA_TYPE;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub extract: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn encode_query_value(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

/// Attachment name for a blob key: its last path segment, else a timestamped fallback.
pub fn download_file_name(key: &str, now_millis: i64) -> String {
    key.rsplit('/')
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("bill-{}.pdf", now_millis))
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{ font-family: system-ui, sans-serif; background: #f3f4f6; margin: 0; padding: 24px; color: #111827; }}
        .card {{ background: #fff; border-radius: 8px; box-shadow: 0 1px 3px rgba(0,0,0,.1); padding: 24px; max-width: 1200px; margin: 0 auto 24px; }}
        table {{ width: 100%; border-collapse: collapse; font-size: 14px; }}
        th, td {{ text-align: left; padding: 8px 12px; border-bottom: 1px solid #e5e7eb; }}
        .error {{ background: #fef2f2; border: 1px solid #fecaca; color: #b91c1c; padding: 12px; border-radius: 6px; }}
        .page {{ background: #f9fafb; padding: 12px; border-radius: 6px; white-space: pre-wrap; }}
        button[disabled] {{ opacity: .5; cursor: not-allowed; }}
    </style>
</head>
<body>
{body}
</body>
</html>"#,
        title = escape_html(title),
        body = body
    )
}

fn render_extraction_result(out: &mut String, result: &ExtractionResult) {
    let _ = writeln!(out, r#"<div class="card"><h2>Parsed PDF Results</h2>"#);
    let _ = writeln!(out, "<p>Total Pages: {}</p>", result.num_pages);
    let _ = writeln!(out, "<h3>PDF Information</h3><ul>");
    if let Some(ref title) = result.metadata.title {
        let _ = writeln!(out, "<li>Title: {}</li>", escape_html(title));
    }
    if let Some(ref author) = result.metadata.author {
        let _ = writeln!(out, "<li>Author: {}</li>", escape_html(author));
    }
    let _ = writeln!(out, "<li>Pages: {}</li>", result.metadata.page_count);
    let _ = writeln!(out, "<li>PDF Version: {}</li></ul>", escape_html(&result.version));
    for page in &result.pages {
        let _ = writeln!(
            out,
            r#"<h4>Page {}</h4><div class="page">{}</div>"#,
            page.page_number,
            escape_html(&page.content)
        );
    }
    let _ = writeln!(out, "</div>");
}

fn render_extraction_failure(out: &mut String, failure: &ExtractionFailure) {
    let _ = writeln!(
        out,
        r#"<div class="card"><h2>PDF Parsing Error</h2><div class="error"><p>Error: {}</p><p>Time: {}</p></div></div>"#,
        escape_html(&failure.message),
        failure.timestamp.to_rfc3339()
    );
}

pub fn render_dashboard(
    user: &AdminUser,
    submissions: &[SubmissionView],
    extraction: Option<&ExtractionOutcome>,
) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        r#"<div class="card"><h1>Admin Dashboard</h1><p>Logged in as: {}</p>
<form method="post" action="/admin/logout"><button type="submit">Sign Out</button></form></div>"#,
        escape_html(user.email.as_deref().unwrap_or(&user.id))
    );

    match extraction {
        Some(ExtractionOutcome::Parsed(result)) => render_extraction_result(&mut body, result),
        Some(ExtractionOutcome::Failed(failure)) => render_extraction_failure(&mut body, failure),
        None => {}
    }

    let _ = writeln!(
        body,
        r#"<div class="card"><h2>Submissions</h2><table>
<thead><tr><th>Date</th><th>Name</th><th>Email</th><th>Rate Schedule</th><th>Peak kWh</th><th>Off-Peak kWh</th><th>Actions</th></tr></thead>
<tbody>"#
    );

    if submissions.is_empty() {
        let _ = writeln!(body, r#"<tr><td colspan="7">No submissions yet</td></tr>"#);
    }

    for view in submissions {
        let mut actions = String::new();
        if let Some(ref key) = view.pdf_path {
            let encoded = encode_query_value(key);
            let _ = write!(
                actions,
                r#"<a href="/admin?extract={encoded}">Extract text</a> <a href="/admin/download?key={encoded}">Download</a> "#
            );
        }
        actions.push_str(r#"<button type="button" disabled>Edit Details</button>"#);

        let _ = writeln!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            view.created_at.format("%Y-%m-%d %H:%M"),
            escape_html(&view.name),
            escape_html(&view.email),
            escape_html(&view.rate_schedule_display),
            view.peak_kwh,
            view.offpeak_kwh,
            actions
        );
    }
    let _ = writeln!(body, "</tbody></table></div>");

    layout("Admin Dashboard", &body)
}

pub fn render_login(error: Option<&str>) -> String {
    let error = error
        .map(|msg| format!(r#"<div class="error">{}</div>"#, escape_html(msg)))
        .unwrap_or_default();
    let body = format!(
        r#"<div class="card" style="max-width:400px">
<h1>Admin Login</h1>
{error}
<form method="post" action="/admin/login">
    <p><label>Email<br><input type="email" name="email" required></label></p>
    <p><label>Password<br><input type="password" name="password" required></label></p>
    <button type="submit">Sign In</button>
</form>
</div>"#
    );
    layout("Admin Login", &body)
}

async fn run_extraction(state: &AppState, pdf_path: &str) -> ExtractionOutcome {
    match state.pdf_extractor() {
        Ok(extractor) => extractor.extract(pdf_path).await.into(),
        Err(e) => ExtractionOutcome::Failed(ExtractionError::configuration(e.to_string()).into_failure()),
    }
}

/// GET /admin
pub async fn dashboard(
    session: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, AppError> {
    let records = state.record_store()?.list_recent().await?;
    let views: Vec<SubmissionView> = records.iter().map(SubmissionView::from).collect();

    let extraction = match query.extract {
        Some(ref key) => Some(run_extraction(&state, key).await),
        None => None,
    };

    tracing::info!(
        "Admin dashboard rendered for {} ({} submissions)",
        session.user.id,
        views.len()
    );
    Ok(Html(render_dashboard(
        &session.user,
        &views,
        extraction.as_ref(),
    )))
}

/// GET /admin/login
pub async fn login_page() -> Html<String> {
    Html(render_login(None))
}

/// POST /admin/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let provider = state.admin_auth()?;

    match provider.sign_in(form.email.trim(), &form.password).await {
        Ok(signed_in) => Ok((
            [(
                header::SET_COOKIE,
                auth::session_cookie(&signed_in.access_token, signed_in.expires_in),
            )],
            Redirect::to("/admin"),
        )
            .into_response()),
        Err(AppError::Unauthorized(msg)) => Ok((
            StatusCode::UNAUTHORIZED,
            Html(render_login(Some(&msg))),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

/// POST /admin/logout
pub async fn logout() -> Response {
    (
        [(header::SET_COOKIE, auth::clear_session_cookie())],
        Redirect::to(auth::LOGIN_PATH),
    )
        .into_response()
}

/// GET /admin/download
pub async fn download(
    session: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let blobs = state.blob_store()?;
    if query.key.trim().is_empty() {
        return Err(AppError::BadRequest("key is required".to_string()));
    }

    let bytes = blobs.download(&query.key).await?;
    let file_name = download_file_name(&query.key, Utc::now().timestamp_millis()).replace('"', "_");
    tracing::info!("Admin {} downloaded {}", session.user.id, query.key);

    Ok((
        [
            (header::CONTENT_TYPE, PDF_MEDIA_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// GET /api/admin/submissions
pub async fn list_submissions(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SubmissionView>>, AppError> {
    let records = state.record_store()?.list_recent().await?;
    Ok(Json(records.iter().map(SubmissionView::from).collect()))
}

/// POST /api/admin/extract
///
/// Always answers with the outcome the dashboard would render: parsed pages or
/// the failure envelope.
pub async fn extract(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ParsePdfRequest>, JsonRejection>,
) -> Json<ExtractionOutcome> {
    let outcome = match payload {
        Ok(Json(request)) => run_extraction(&state, request.pdf_path.as_deref().unwrap_or("")).await,
        Err(_) => ExtractionOutcome::Failed(ExtractionError::invalid_body().into_failure()),
    };
    Json(outcome)
}
