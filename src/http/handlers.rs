//! Request handlers.
//!
//! Handlers only translate between JSON and the moderation service; every
//! decision lives in `core::moderation`.

use super::api_error::{ApiError, ApiResult};
use super::router::AppState;
use crate::core::moderation::{
    evaluate, BannedTerm, BannedWord, ContentFlag, ContentKind, ContentRef, ModerationReport,
    ModerationResult, ReportStatus, Severity,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

/// Body of `POST /moderate-content`.
///
/// Either identifies stored content (banned words come from the tenant's
/// list and flagged content is restricted) or carries its own term list, in
/// which case the content is only scored.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ModerateContentRequest {
    #[serde(rename_all = "camelCase")]
    Stored {
        tenant_id: String,
        content_type: ContentKind,
        content_id: String,
        content: String,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        content: String,
        banned_terms: Vec<BannedTerm>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerateContentResponse {
    #[serde(flatten)]
    pub result: ModerationResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AddBannedWordRequest {
    pub word: String,
    #[serde(default)]
    pub severity: Option<Severity>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBannedWordRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewReportRequest {
    pub decision: String,
}

// ============================================================================
// HELPERS
// ============================================================================

/// Unwrap a JSON body, turning malformed input into our own error shape.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

/// Rate limit key for the caller: first forwarded address, then real IP.
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .unwrap_or("anonymous")
        .to_string()
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// POST /moderate-content
pub async fn moderate_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ModerateContentRequest>, JsonRejection>,
) -> ApiResult<Json<ModerateContentResponse>> {
    let client = client_key(&headers);
    if !state.rate_limiter.allow(&client) {
        tracing::warn!(client = %client, "Moderation request rate limited");
        return Err(ApiError::RateLimited(client));
    }

    match body(payload)? {
        ModerateContentRequest::Stored {
            tenant_id,
            content_type,
            content_id,
            content,
        } => {
            let target = ContentRef::new(tenant_id, content_type, content_id);
            let outcome = state.moderation.moderate_content(target, &content).await?;
            Ok(Json(ModerateContentResponse {
                result: outcome.result,
                report_id: outcome.report_id,
            }))
        }
        ModerateContentRequest::Inline {
            content,
            banned_terms,
        } => Ok(Json(ModerateContentResponse {
            result: evaluate(&content, &banned_terms),
            report_id: None,
        })),
    }
}

/// GET /tenants/{tenant_id}/banned-words
pub async fn list_banned_words(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> ApiResult<Json<Vec<BannedWord>>> {
    Ok(Json(state.moderation.list_banned_words(&tenant_id).await?))
}

/// POST /tenants/{tenant_id}/banned-words
pub async fn add_banned_word(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    payload: Result<Json<AddBannedWordRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BannedWord>)> {
    let request = body(payload)?;
    let stored = state
        .moderation
        .add_banned_word(
            &tenant_id,
            &request.word,
            request.severity.unwrap_or(Severity::Medium),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// PATCH /tenants/{tenant_id}/banned-words/{id}
pub async fn update_banned_word(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(String, i64)>,
    payload: Result<Json<UpdateBannedWordRequest>, JsonRejection>,
) -> ApiResult<Json<BannedWord>> {
    let request = body(payload)?;
    let updated = state
        .moderation
        .set_banned_word_active(&tenant_id, id, request.active)
        .await?;
    Ok(Json(updated))
}

/// GET /tenants/{tenant_id}/reports?status=pending
pub async fn list_reports(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(query): Query<ReportsQuery>,
) -> ApiResult<Json<Vec<ModerationReport>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ReportStatus>)
        .transpose()
        .map_err(ApiError::InvalidRequest)?;
    Ok(Json(state.moderation.list_reports(&tenant_id, status).await?))
}

/// POST /reports/{id}/review
pub async fn review_report(
    State(state): State<AppState>,
    Path(report_id): Path<i64>,
    payload: Result<Json<ReviewReportRequest>, JsonRejection>,
) -> ApiResult<Json<ModerationReport>> {
    let request = body(payload)?;
    let decision = request
        .decision
        .parse::<ReportStatus>()
        .map_err(ApiError::InvalidRequest)?;
    Ok(Json(state.moderation.review_report(report_id, decision).await?))
}

/// GET /tenants/{tenant_id}/content/{kind}/{content_id}/flag
pub async fn content_flag(
    State(state): State<AppState>,
    Path((tenant_id, kind, content_id)): Path<(String, String, String)>,
) -> ApiResult<Json<ContentFlag>> {
    let kind = kind.parse::<ContentKind>().map_err(ApiError::InvalidRequest)?;
    let target = ContentRef::new(tenant_id, kind, content_id);
    state
        .moderation
        .content_flag(&target)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no flag for {} {}", kind, target.content_id)))
}
