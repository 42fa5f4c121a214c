use crate::query::window::{format_ts, Window};
use chrono::NaiveDateTime;
use duckdb::Connection;

/// A breakdown row: dimension value + counts.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BreakdownRow {
    pub value: String,
    pub views: u64,
    pub visitors: u64,
}

/// Dimensions available in the per-domain detail view.
#[derive(Debug, Clone, Copy)]
pub enum Dimension {
    Referrer,
    Browser,
    DeviceType,
    Country,
    ClientIp,
}

impl Dimension {
    /// SQL expression for the dimension. Referrers bucket empty/missing
    /// values as direct traffic.
    const fn expr(self) -> &'static str {
        match self {
            Self::Referrer => "COALESCE(NULLIF(referrer, ''), 'Direct')",
            Self::Browser => "browser",
            Self::DeviceType => "device_type",
            Self::Country => "country",
            Self::ClientIp => "client_ip",
        }
    }
}

/// Query a breakdown of one domain's events by a given dimension.
pub fn query_breakdown(
    conn: &Connection,
    domain: &str,
    window: Window,
    now: NaiveDateTime,
    dimension: Dimension,
    limit: usize,
) -> Result<Vec<BreakdownRow>, duckdb::Error> {
    let expr = dimension.expr();
    let cutoff = format_ts(window.cutoff_from(now));

    // The expression comes from a fixed enum, never from request input
    let sql = format!(
        "SELECT {expr} AS dim_value,
                COUNT(*) AS views,
                COUNT(DISTINCT fingerprint) AS visitors
         FROM events
         WHERE domain = ? AND timestamp >= CAST(? AS TIMESTAMP)
         GROUP BY dim_value
         ORDER BY views DESC, dim_value
         LIMIT ?"
    );

    let mut stmt = conn.prepare(&sql)?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt
        .query_map(duckdb::params![domain, cutoff, limit], |row| {
            Ok(BreakdownRow {
                value: row.get(0)?,
                views: row.get(1)?,
                visitors: row.get(2)?,
            })
        })?
        .filter_map(Result::ok)
        .collect();

    Ok(rows)
}
