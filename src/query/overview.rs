use crate::query::window::{format_ts, Window};
use chrono::NaiveDateTime;
use duckdb::Connection;

/// Core dashboard metrics for a window, optionally filtered by domain.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Overview {
    pub page_views: u64,
    pub unique_visitors: u64,
    /// Percentage of sessions with exactly one event, 0-100.
    pub bounce_rate: f64,
    pub avg_session_seconds: f64,
    /// Mean client-reported active seconds per view. Tracked only as an
    /// all-time rolling total, so for bounded windows this is the all-time
    /// figure; the flag below tells consumers when that fallback applied.
    pub avg_active_seconds: f64,
    pub avg_active_seconds_is_all_time: bool,
}

/// Query the overview metrics.
///
/// The all-time window is answered from `page_stats` (one row per URL, no
/// time filter needed); bounded windows scan the event log, which carries the
/// time dimension the rollup lacks.
pub fn query_overview(
    conn: &Connection,
    window: Window,
    now: NaiveDateTime,
    domain: Option<&str>,
) -> Result<Overview, duckdb::Error> {
    let domain = domain.unwrap_or("");
    let cutoff = format_ts(window.cutoff_from(now));

    let (page_views, unique_visitors) = if window.is_all_time() {
        totals_from_rollup(conn, domain)?
    } else {
        totals_from_events(conn, &cutoff, domain)?
    };

    let (sessions, bounces, total_session_secs) = session_stats(conn, &cutoff, domain)?;
    #[allow(clippy::cast_precision_loss)]
    let (bounce_rate, avg_session_seconds) = if sessions > 0 {
        (
            bounces as f64 / sessions as f64 * 100.0,
            total_session_secs / sessions as f64,
        )
    } else {
        (0.0, 0.0)
    };

    Ok(Overview {
        page_views,
        unique_visitors,
        bounce_rate,
        avg_session_seconds,
        avg_active_seconds: avg_active_seconds(conn, domain)?,
        avg_active_seconds_is_all_time: !window.is_all_time(),
    })
}

fn totals_from_rollup(conn: &Connection, domain: &str) -> Result<(u64, u64), duckdb::Error> {
    let mut stmt = conn.prepare(
        "SELECT CAST(COALESCE(SUM(views), 0) AS BIGINT),
                CAST(COALESCE(SUM(unique_views), 0) AS BIGINT)
         FROM page_stats
         WHERE (? = '' OR domain = ?)",
    )?;
    stmt.query_row(duckdb::params![domain, domain], |row| {
        Ok((row.get(0)?, row.get(1)?))
    })
}

fn totals_from_events(
    conn: &Connection,
    cutoff: &str,
    domain: &str,
) -> Result<(u64, u64), duckdb::Error> {
    let mut stmt = conn.prepare(
        "SELECT COUNT(*), COUNT(DISTINCT fingerprint)
         FROM events
         WHERE timestamp >= CAST(? AS TIMESTAMP) AND (? = '' OR domain = ?)",
    )?;
    stmt.query_row(duckdb::params![cutoff, domain, domain], |row| {
        Ok((row.get(0)?, row.get(1)?))
    })
}

/// Sessions group the window's events by fingerprint; a bounce is a session
/// with a single event. Fingerprints rotate daily, so a session never spans
/// days even in wide windows.
fn session_stats(
    conn: &Connection,
    cutoff: &str,
    domain: &str,
) -> Result<(u64, u64, f64), duckdb::Error> {
    let sql = r"
        WITH sessions AS (
            SELECT fingerprint,
                   COUNT(*) AS event_count,
                   CAST(EXTRACT(EPOCH FROM (MAX(timestamp) - MIN(timestamp))) AS DOUBLE)
                       AS duration_secs
            FROM events
            WHERE timestamp >= CAST(? AS TIMESTAMP) AND (? = '' OR domain = ?)
            GROUP BY fingerprint
        )
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE event_count = 1),
               COALESCE(SUM(duration_secs), 0.0)
        FROM sessions
    ";
    let mut stmt = conn.prepare(sql)?;
    stmt.query_row(duckdb::params![cutoff, domain, domain], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    })
}

fn avg_active_seconds(conn: &Connection, domain: &str) -> Result<f64, duckdb::Error> {
    let mut stmt = conn.prepare(
        "SELECT CAST(COALESCE(SUM(active_seconds), 0) AS DOUBLE),
                CAST(COALESCE(SUM(views), 0) AS DOUBLE)
         FROM page_stats
         WHERE (? = '' OR domain = ?)",
    )?;
    let (active, views): (f64, f64) = stmt.query_row(duckdb::params![domain, domain], |row| {
        Ok((row.get(0)?, row.get(1)?))
    })?;
    Ok(if views > 0.0 { active / views } else { 0.0 })
}
