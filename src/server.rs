use crate::api::{beacon, dashboard, domains, script, AppState};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Permissive CORS for the beacon and the tracking script, which load on
    // arbitrary third-party origins. OPTIONS preflights are answered by the
    // layer itself.
    let tracking_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    // Beacons are tiny; cap the body well above any valid payload
    let tracking_routes = Router::new()
        .route("/api/beacon", axum::routing::post(beacon::track_beacon))
        .route("/track.js", get(script::serve_tracker))
        .layer(DefaultBodyLimit::max(16_384))
        .layer(tracking_cors);

    let dashboard_routes = Router::new()
        .route("/api/analytics", get(dashboard::dashboard))
        .route(
            "/api/domains",
            get(domains::list_domains)
                .post(domains::register_domain)
                .delete(domains::remove_domain),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
        .route("/metrics", get(prometheus_metrics))
        .merge(tracking_routes)
        .merge(dashboard_routes)
        .layer(axum::middleware::map_response(add_security_headers))
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(30),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Inject OWASP-recommended security headers on every HTTP response.
async fn add_security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response
}

/// GET /health — Simple health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}

/// GET /health/detailed — Detailed health check with system info.
async fn detailed_health_check(
    State(state): State<Arc<AppState>>,
) -> axum::Json<serde_json::Value> {
    use std::sync::atomic::Ordering;

    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "admin_key_configured": state.admin_key.is_some(),
        "beacons_accepted": state.beacons_accepted.load(Ordering::Relaxed),
        "beacons_rejected": state.beacons_rejected.load(Ordering::Relaxed),
    }))
}

/// GET /metrics — Prometheus-compatible metrics endpoint.
async fn prometheus_metrics(
    State(state): State<Arc<AppState>>,
) -> ([(header::HeaderName, &'static str); 1], String) {
    use std::fmt::Write;
    use std::sync::atomic::Ordering;

    let accepted = state.beacons_accepted.load(Ordering::Relaxed);
    let rejected = state.beacons_rejected.load(Ordering::Relaxed);
    let admin_configured = u8::from(state.admin_key.is_some());

    let mut out = String::with_capacity(512);
    let _ = writeln!(
        out,
        "# HELP petrel_beacons_accepted_total Beacons accepted since startup"
    );
    let _ = writeln!(out, "# TYPE petrel_beacons_accepted_total counter");
    let _ = writeln!(out, "petrel_beacons_accepted_total {accepted}");
    let _ = writeln!(
        out,
        "# HELP petrel_beacons_rejected_total Beacons rejected since startup"
    );
    let _ = writeln!(out, "# TYPE petrel_beacons_rejected_total counter");
    let _ = writeln!(out, "petrel_beacons_rejected_total {rejected}");
    let _ = writeln!(
        out,
        "# HELP petrel_admin_key_configured Whether the admin key is set"
    );
    let _ = writeln!(out, "# TYPE petrel_admin_key_configured gauge");
    let _ = writeln!(out, "petrel_admin_key_configured {admin_configured}");

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], out)
}
