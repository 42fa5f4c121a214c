use crate::api::errors::ApiError;
use crate::api::AppState;
use crate::ingest::{fingerprint, url, useragent};
use crate::store::{domains, ledger, recorder};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Inbound beacon from the tracking script.
#[derive(Debug, Deserialize)]
pub struct BeaconPayload {
    #[serde(rename = "type")]
    pub kind: BeaconKind,
    pub data: BeaconData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeaconKind {
    Pageview,
    Duration,
}

#[derive(Debug, Deserialize)]
pub struct BeaconData {
    /// Page URL
    #[serde(rename = "u")]
    pub url: Option<String>,
    /// Referrer URL
    #[serde(rename = "r")]
    pub referrer: Option<String>,
    /// Active seconds reported by a duration beacon
    #[serde(rename = "d")]
    pub seconds: Option<f64>,
}

/// POST /api/beacon — Tracking ingestion endpoint.
///
/// Pipeline per beacon: validate → allowlist check → fingerprint → ledger
/// insert → event append + rollup upsert. Validation and the allowlist
/// rejection happen before any write. The ledger's constraint check decides
/// uniqueness; its result flows into both the event row and the rollup for
/// this one beacon.
pub async fn track_beacon(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<BeaconPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let result = handle_beacon(&state, &headers, payload).await;
    let counter = if result.is_ok() {
        &state.beacons_accepted
    } else {
        &state.beacons_rejected
    };
    counter.fetch_add(1, Ordering::Relaxed);
    result
}

async fn handle_beacon(
    state: &Arc<AppState>,
    headers: &HeaderMap,
    payload: BeaconPayload,
) -> Result<Json<serde_json::Value>, ApiError> {
    let page_url = payload
        .data
        .url
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("URL is required.".to_string()))?;
    if page_url.len() > 2048 {
        return Err(ApiError::BadRequest("URL is too long.".to_string()));
    }
    let page_url = url::sanitize(page_url, 2048);

    let domain = url::hostname(&page_url)
        .ok_or_else(|| ApiError::BadRequest("Invalid URL format.".to_string()))?;

    match payload.kind {
        BeaconKind::Pageview => {
            let client_ip = extract_ip(headers);
            let user_agent = headers
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            let country = extract_country(headers);
            let referrer = payload
                .data
                .referrer
                .as_deref()
                .filter(|r| !r.is_empty())
                .map(|r| url::sanitize(r, 2048));

            let state = Arc::clone(state);
            let unique = tokio::task::spawn_blocking(move || {
                record_pageview(&state, &page_url, &domain, referrer, &client_ip, &user_agent, &country)
            })
            .await
            .map_err(|e| ApiError::Internal(format!("Ingest task panicked: {e}")))??;

            Ok(Json(
                serde_json::json!({ "message": "View tracked.", "unique": unique }),
            ))
        }
        BeaconKind::Duration => {
            let seconds = payload
                .data
                .seconds
                .ok_or_else(|| ApiError::BadRequest("Duration is required.".to_string()))?;
            let seconds = recorder::round_duration(seconds).ok_or_else(|| {
                ApiError::BadRequest("Duration must be a positive number of seconds.".to_string())
            })?;

            let state = Arc::clone(state);
            tokio::task::spawn_blocking(move || -> Result<(), ApiError> {
                let conn = state.store.lock();
                if !domains::is_allowed(&conn, &domain)? {
                    return Err(not_tracked(&domain));
                }
                recorder::add_active_seconds(&conn, &page_url, &domain, seconds)?;
                Ok(())
            })
            .await
            .map_err(|e| ApiError::Internal(format!("Ingest task panicked: {e}")))??;

            Ok(Json(serde_json::json!({ "message": "Duration tracked." })))
        }
    }
}

fn record_pageview(
    state: &AppState,
    page_url: &str,
    domain: &str,
    referrer: Option<String>,
    client_ip: &str,
    user_agent: &str,
    country: &str,
) -> Result<bool, ApiError> {
    let mut conn = state.store.lock();
    if !domains::is_allowed(&conn, domain)? {
        return Err(not_tracked(domain));
    }

    let now = Utc::now().naive_utc();
    let day = now.date();
    let salt = fingerprint::daily_salt(&state.secret, day);
    let fp = fingerprint::fingerprint(client_ip, user_agent, &salt);

    // The constrained insert is the uniqueness decision; under concurrent
    // beacons for the same visitor exactly one of them sees `true`.
    let is_unique = ledger::try_mark_seen(&conn, &fp, day)?;

    let classified = useragent::classify(user_agent);
    let event = recorder::PageviewEvent {
        url: page_url.to_string(),
        domain: domain.to_string(),
        timestamp: now,
        is_unique,
        referrer,
        browser: classified.browser,
        device_type: classified.device_type,
        country: country.to_string(),
        client_ip: client_ip.to_string(),
        fingerprint: fp,
    };
    recorder::record_pageview(&mut conn, &event)?;

    Ok(is_unique)
}

fn not_tracked(domain: &str) -> ApiError {
    ApiError::Forbidden(format!("Domain '{domain}' is not tracked."))
}

/// Extract the client address, checking X-Forwarded-For first.
fn extract_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .unwrap_or("unknown")
        .to_string()
}

/// Best-effort country from the CDN geo header.
fn extract_country(headers: &HeaderMap) -> String {
    headers
        .get("x-vercel-ip-country")
        .or_else(|| headers.get("cf-ipcountry"))
        .and_then(|v| v.to_str().ok())
        .filter(|c| !c.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}
