use crate::api::errors::ApiError;
use crate::api::AppState;
use crate::ingest::url::normalize_domain;
use crate::store::domains;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct DomainPayload {
    pub domain: Option<String>,
}

/// GET /api/domains — List all tracked domains.
pub async fn list_domains(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state2 = Arc::clone(&state);
    let domains = tokio::task::spawn_blocking(move || {
        let conn = state2.store.lock();
        domains::list(&conn)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Query task panicked: {e}")))??;

    Ok(Json(serde_json::json!({ "domains": domains })))
}

/// POST /api/domains — Register a domain for tracking. Idempotent.
pub async fn register_domain(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DomainPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let domain = validate_domain(payload.domain.as_deref())?;

    let state2 = Arc::clone(&state);
    tokio::task::spawn_blocking(move || {
        let conn = state2.store.lock();
        domains::register(&conn, &domain)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Query task panicked: {e}")))??;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "Domain added successfully." })),
    ))
}

/// DELETE /api/domains — Remove a domain. Idempotent; historical events for
/// the domain are kept.
pub async fn remove_domain(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DomainPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let domain = validate_domain(payload.domain.as_deref())?;

    let state2 = Arc::clone(&state);
    tokio::task::spawn_blocking(move || {
        let conn = state2.store.lock();
        domains::remove(&conn, &domain)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Query task panicked: {e}")))??;

    Ok(Json(
        serde_json::json!({ "message": "Domain deleted successfully." }),
    ))
}

/// Normalize and validate a submitted hostname.
fn validate_domain(domain: Option<&str>) -> Result<String, ApiError> {
    let domain = domain
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Domain is required.".to_string()))?;
    let domain = normalize_domain(&domain.to_ascii_lowercase()).to_string();

    if domain.is_empty() || domain.len() > 256 {
        return Err(ApiError::BadRequest("Invalid domain.".to_string()));
    }
    let valid = domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));
    if !valid {
        return Err(ApiError::BadRequest(
            "Domain may only contain alphanumeric characters, '.' and '-'.".to_string(),
        ));
    }
    Ok(domain)
}
