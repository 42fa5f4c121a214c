use crate::api::errors::ApiError;
use crate::api::AppState;
use crate::ingest::url::normalize_domain;
use crate::query::breakdowns::{query_breakdown, Dimension};
use crate::query::graph::{query_graph, GraphPeriod};
use crate::query::overview::query_overview;
use crate::query::pages::{query_event_log, query_page_totals, query_top_pages};
use crate::query::summary::query_domain_summary;
use crate::query::window::Window;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

const TOP_PAGES_LIMIT: usize = 10;
const EVENT_LOG_LIMIT: usize = 50;
const BREAKDOWN_LIMIT: usize = 10;

/// Query parameters for the dashboard endpoint.
#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    pub view: Option<String>,
    pub period: Option<String>,
    /// Domain filter; "all" (or absent) means unfiltered.
    pub domain: Option<String>,
    /// Target URL, required by the details view.
    pub url: Option<String>,
    pub admin_key: Option<String>,
}

/// The closed set of dashboard views. Dispatch is exhaustive — adding a view
/// means adding a variant, not another string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Summary,
    Details,
    DomainSummary,
    DomainDetails,
    Graph,
}

impl View {
    fn parse(view: Option<&str>) -> Result<Self, ApiError> {
        match view {
            None => Ok(Self::Summary),
            Some("details") => Ok(Self::Details),
            Some("domain_summary") => Ok(Self::DomainSummary),
            Some("domain_details") => Ok(Self::DomainDetails),
            Some("graph") => Ok(Self::Graph),
            Some(other) => Err(ApiError::BadRequest(format!(
                "Unknown view '{other}'. Use 'details', 'domain_summary', 'domain_details' or 'graph'."
            ))),
        }
    }
}

/// GET /api/analytics — Dashboard query endpoint.
///
/// A stateless read layer over the event log and the per-URL rollup,
/// parameterized by view, window and domain filter.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let view = View::parse(params.view.as_deref())?;
    let is_admin = admin_key_matches(state.admin_key.as_deref(), params.admin_key.as_deref());
    let domain_filter = params
        .domain
        .as_deref()
        .filter(|d| !d.is_empty() && *d != "all")
        .map(|d| normalize_domain(d).to_string());
    let now = Utc::now().naive_utc();

    let body = match view {
        View::Summary => {
            let window = parse_window(params.period.as_deref())?;
            run_query(&state, move |conn| {
                let overview = query_overview(conn, window, now, domain_filter.as_deref())?;
                let top_pages =
                    query_top_pages(conn, window, now, domain_filter.as_deref(), TOP_PAGES_LIMIT)?;
                Ok(serde_json::json!({
                    "overview": overview,
                    "top_pages": top_pages,
                }))
            })
            .await?
        }
        View::Details => {
            let url = params.url.clone().filter(|u| !u.is_empty()).ok_or_else(|| {
                ApiError::BadRequest("The 'url' parameter is required for details.".to_string())
            })?;
            run_query(&state, move |conn| {
                let totals = query_page_totals(conn, &url)?;
                let recent = query_event_log(conn, &url, EVENT_LOG_LIMIT, is_admin)?;
                Ok(serde_json::json!({
                    "url": url,
                    "totals": totals,
                    "recent_events": recent,
                }))
            })
            .await?
        }
        View::DomainSummary => {
            run_query(&state, move |conn| {
                let summary = query_domain_summary(conn, now)?;
                Ok(serde_json::json!({ "domains": summary }))
            })
            .await?
        }
        View::DomainDetails => {
            let window = parse_window(params.period.as_deref())?;
            let domain = domain_filter.ok_or_else(|| {
                ApiError::BadRequest(
                    "The 'domain' parameter is required for domain_details.".to_string(),
                )
            })?;
            run_query(&state, move |conn| {
                let mut body = serde_json::json!({
                    "domain": domain,
                    "referrers": query_breakdown(conn, &domain, window, now, Dimension::Referrer, BREAKDOWN_LIMIT)?,
                    "browsers": query_breakdown(conn, &domain, window, now, Dimension::Browser, BREAKDOWN_LIMIT)?,
                    "devices": query_breakdown(conn, &domain, window, now, Dimension::DeviceType, BREAKDOWN_LIMIT)?,
                    "countries": query_breakdown(conn, &domain, window, now, Dimension::Country, BREAKDOWN_LIMIT)?,
                });
                if is_admin {
                    let ips = query_breakdown(
                        conn,
                        &domain,
                        window,
                        now,
                        Dimension::ClientIp,
                        BREAKDOWN_LIMIT,
                    )?;
                    body["client_ips"] =
                        serde_json::to_value(ips).map_err(|e| ApiError::Internal(e.to_string()))?;
                }
                Ok(body)
            })
            .await?
        }
        View::Graph => {
            let period = params.period.clone().unwrap_or_else(|| "weekly".to_string());
            let period = GraphPeriod::parse(&period).ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Invalid graph period: {period}. Use 'daily', 'weekly', 'monthly' or 'yearly'."
                ))
            })?;
            run_query(&state, move |conn| {
                let points = query_graph(conn, period, now, domain_filter.as_deref())?;
                Ok(serde_json::json!({ "points": points }))
            })
            .await?
        }
    };

    Ok(Json(body))
}

fn parse_window(period: Option<&str>) -> Result<Window, ApiError> {
    let period = period.unwrap_or("7d");
    Window::parse(period).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid period: {period}. Use '1d', '7d', '30d', '90d' or 'all_time'."
        ))
    })
}

/// Run a read-only query closure on the blocking pool with the store locked.
async fn run_query<F>(state: &Arc<AppState>, f: F) -> Result<serde_json::Value, ApiError>
where
    F: FnOnce(&duckdb::Connection) -> Result<serde_json::Value, ApiError> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || {
        let conn = state.store.lock();
        f(&conn)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Query task panicked: {e}")))?
}

/// Compare keys by digest so neither length nor prefix short-circuits.
fn admin_key_matches(expected: Option<&str>, provided: Option<&str>) -> bool {
    match (expected, provided) {
        (Some(expected), Some(provided)) => {
            Sha256::digest(expected.as_bytes()) == Sha256::digest(provided.as_bytes())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_parse() {
        assert_eq!(View::parse(None).unwrap(), View::Summary);
        assert_eq!(View::parse(Some("details")).unwrap(), View::Details);
        assert_eq!(
            View::parse(Some("domain_summary")).unwrap(),
            View::DomainSummary
        );
        assert_eq!(
            View::parse(Some("domain_details")).unwrap(),
            View::DomainDetails
        );
        assert_eq!(View::parse(Some("graph")).unwrap(), View::Graph);
        assert!(View::parse(Some("everything")).is_err());
    }

    #[test]
    fn test_admin_key_matches() {
        assert!(admin_key_matches(Some("hunter2"), Some("hunter2")));
        assert!(!admin_key_matches(Some("hunter2"), Some("hunter3")));
        assert!(!admin_key_matches(Some("hunter2"), None));
        assert!(!admin_key_matches(None, Some("hunter2")));
        assert!(!admin_key_matches(None, None));
    }

    #[test]
    fn test_parse_window_default() {
        assert_eq!(parse_window(None).unwrap(), Window::Week);
        assert_eq!(parse_window(Some("all_time")).unwrap(), Window::AllTime);
        assert!(parse_window(Some("forever")).is_err());
    }
}
