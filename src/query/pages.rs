use crate::query::window::{format_ts, Window};
use chrono::NaiveDateTime;
use duckdb::Connection;

/// One row of the top-pages listing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TopPage {
    pub url: String,
    pub views: u64,
    pub unique_views: u64,
}

/// All-time counters for a single URL.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PageTotals {
    pub url: String,
    pub views: u64,
    pub unique_views: u64,
    pub active_seconds: u64,
}

/// One event-log row. The client address is capability-gated: it is only
/// populated when the caller presented the admin key, and serialization drops
/// it entirely otherwise. Fingerprints are never exposed.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EventRow {
    pub url: String,
    pub domain: String,
    pub timestamp: String,
    pub is_unique: bool,
    pub referrer: Option<String>,
    pub browser: String,
    pub device_type: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
}

/// Pages ordered by views, descending. All-time reads the rollup; bounded
/// windows count events.
pub fn query_top_pages(
    conn: &Connection,
    window: Window,
    now: NaiveDateTime,
    domain: Option<&str>,
    limit: usize,
) -> Result<Vec<TopPage>, duckdb::Error> {
    let domain = domain.unwrap_or("");
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let sql = if window.is_all_time() {
        "SELECT url, views, unique_views
         FROM page_stats
         WHERE (? = '' OR domain = ?)
         ORDER BY views DESC, url
         LIMIT ?"
    } else {
        "SELECT url, COUNT(*) AS views, COUNT(*) FILTER (WHERE is_unique) AS unique_views
         FROM events
         WHERE timestamp >= CAST(? AS TIMESTAMP) AND (? = '' OR domain = ?)
         GROUP BY url
         ORDER BY views DESC, url
         LIMIT ?"
    };

    let mut stmt = conn.prepare(sql)?;
    let map_row = |row: &duckdb::Row<'_>| {
        Ok(TopPage {
            url: row.get(0)?,
            views: row.get(1)?,
            unique_views: row.get(2)?,
        })
    };
    let rows = if window.is_all_time() {
        stmt.query_map(duckdb::params![domain, domain, limit], map_row)?
            .filter_map(Result::ok)
            .collect()
    } else {
        let cutoff = format_ts(window.cutoff_from(now));
        stmt.query_map(duckdb::params![cutoff, domain, domain, limit], map_row)?
            .filter_map(Result::ok)
            .collect()
    };

    Ok(rows)
}

/// Rollup counters for one URL; `None` when the URL has never been seen.
pub fn query_page_totals(
    conn: &Connection,
    url: &str,
) -> Result<Option<PageTotals>, duckdb::Error> {
    let mut stmt = conn.prepare(
        "SELECT url, views, unique_views, active_seconds FROM page_stats WHERE url = ?",
    )?;
    let mut rows = stmt.query_map([url], |row| {
        Ok(PageTotals {
            url: row.get(0)?,
            views: row.get(1)?,
            unique_views: row.get(2)?,
            active_seconds: row.get(3)?,
        })
    })?;
    rows.next().transpose()
}

/// Most recent events for one URL, newest first.
pub fn query_event_log(
    conn: &Connection,
    url: &str,
    limit: usize,
    include_client_ip: bool,
) -> Result<Vec<EventRow>, duckdb::Error> {
    let mut stmt = conn.prepare(
        "SELECT url, domain, strftime(timestamp, '%Y-%m-%d %H:%M:%S'), is_unique,
                referrer, browser, device_type, country, client_ip
         FROM events
         WHERE url = ?
         ORDER BY timestamp DESC
         LIMIT ?",
    )?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt
        .query_map(duckdb::params![url, limit], |row| {
            Ok(EventRow {
                url: row.get(0)?,
                domain: row.get(1)?,
                timestamp: row.get(2)?,
                is_unique: row.get(3)?,
                referrer: row.get(4)?,
                browser: row.get(5)?,
                device_type: row.get(6)?,
                country: row.get(7)?,
                client_ip: if include_client_ip {
                    Some(row.get(8)?)
                } else {
                    None
                },
            })
        })?
        .filter_map(Result::ok)
        .collect();
    Ok(rows)
}
