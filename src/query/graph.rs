use chrono::{Datelike, NaiveDateTime, Timelike};
use duckdb::Connection;

/// One point of the time-bucketed series.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GraphPoint {
    pub bucket: String,
    pub views: u64,
    pub visitors: u64,
}

/// Bucketing schemes for the graph view. Each yields a fixed number of
/// buckets ending at the current one; buckets with no events are included
/// with zero counts so charts always have a predictable width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphPeriod {
    /// Last 24 hours, hourly buckets.
    Daily,
    /// Last 7 days, daily buckets.
    Weekly,
    /// Last 30 days, daily buckets.
    Monthly,
    /// Last 12 months, monthly buckets.
    Yearly,
}

impl GraphPeriod {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }

    const fn trunc_unit(self) -> &'static str {
        match self {
            Self::Daily => "hour",
            Self::Weekly | Self::Monthly => "day",
            Self::Yearly => "month",
        }
    }

    const fn interval(self) -> &'static str {
        match self {
            Self::Daily => "1 hour",
            Self::Weekly | Self::Monthly => "1 day",
            Self::Yearly => "1 month",
        }
    }

    const fn format_str(self) -> &'static str {
        match self {
            Self::Daily => "%Y-%m-%d %H:00",
            Self::Weekly | Self::Monthly => "%Y-%m-%d",
            Self::Yearly => "%Y-%m",
        }
    }

    /// First and last bucket start, inclusive on both ends.
    fn range(self, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        match self {
            Self::Daily => {
                let end = now
                    .date()
                    .and_hms_opt(now.hour(), 0, 0)
                    .expect("whole hour is valid");
                (end - chrono::Duration::hours(23), end)
            }
            Self::Weekly | Self::Monthly => {
                let end = now.date().and_hms_opt(0, 0, 0).expect("midnight is valid");
                let span = if matches!(self, Self::Weekly) { 6 } else { 29 };
                (end - chrono::Duration::days(span), end)
            }
            Self::Yearly => {
                let month_start = now
                    .date()
                    .with_day(1)
                    .expect("first of month is valid")
                    .and_hms_opt(0, 0, 0)
                    .expect("midnight is valid");
                (month_start - chrono::Months::new(11), month_start)
            }
        }
    }
}

/// Query the zero-filled time-bucketed series for the graph view.
pub fn query_graph(
    conn: &Connection,
    period: GraphPeriod,
    now: NaiveDateTime,
    domain: Option<&str>,
) -> Result<Vec<GraphPoint>, duckdb::Error> {
    let domain = domain.unwrap_or("");
    let (start, end) = period.range(now);
    let start = crate::query::window::format_ts(start);
    let end = crate::query::window::format_ts(end);

    // Unit/interval/format strings come from the closed enum above
    let sql = format!(
        "WITH buckets AS (
             SELECT ts FROM generate_series(CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP),
                                            INTERVAL '{interval}') AS g(ts)
         ),
         counted AS (
             SELECT DATE_TRUNC('{unit}', timestamp) AS bucket,
                    COUNT(*) AS views,
                    COUNT(DISTINCT fingerprint) AS visitors
             FROM events
             WHERE timestamp >= CAST(? AS TIMESTAMP) AND (? = '' OR domain = ?)
             GROUP BY bucket
         )
         SELECT strftime(b.ts, '{fmt}'),
                CAST(COALESCE(c.views, 0) AS BIGINT),
                CAST(COALESCE(c.visitors, 0) AS BIGINT)
         FROM buckets b
         LEFT JOIN counted c ON c.bucket = b.ts
         ORDER BY b.ts",
        interval = period.interval(),
        unit = period.trunc_unit(),
        fmt = period.format_str(),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            duckdb::params![start, end, start, domain, domain],
            |row| {
                Ok(GraphPoint {
                    bucket: row.get(0)?,
                    views: row.get(1)?,
                    visitors: row.get(2)?,
                })
            },
        )?
        .filter_map(Result::ok)
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::store::schema::init_schema(&conn).unwrap();
        conn
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
    }

    fn insert_event(conn: &Connection, fingerprint: &str, timestamp: &str) {
        conn.execute(
            "INSERT INTO events (url, domain, timestamp, is_unique, referrer,
             browser, device_type, country, client_ip, fingerprint)
             VALUES ('https://test.com/', 'test.com', CAST(? AS TIMESTAMP), false, NULL,
             'Chrome', 'Desktop', 'US', '1.2.3.4', ?)",
            duckdb::params![timestamp, fingerprint],
        )
        .unwrap();
    }

    #[test]
    fn test_weekly_has_seven_buckets_zero_filled() {
        let conn = setup();
        insert_event(&conn, "v1", "2024-01-14 09:00:00");
        insert_event(&conn, "v2", "2024-01-14 10:00:00");
        insert_event(&conn, "v1", "2024-01-15 08:00:00");

        let points = query_graph(&conn, GraphPeriod::Weekly, now(), None).unwrap();
        assert_eq!(points.len(), 7, "one bucket per day, zero days included");
        assert_eq!(points[0].bucket, "2024-01-09");
        assert_eq!(points[0].views, 0);
        assert_eq!(points[5].bucket, "2024-01-14");
        assert_eq!(points[5].views, 2);
        assert_eq!(points[5].visitors, 2);
        assert_eq!(points[6].bucket, "2024-01-15");
        assert_eq!(points[6].views, 1);
    }

    #[test]
    fn test_daily_has_24_hourly_buckets() {
        let conn = setup();
        insert_event(&conn, "v1", "2024-01-15 12:05:00");

        let points = query_graph(&conn, GraphPeriod::Daily, now(), None).unwrap();
        assert_eq!(points.len(), 24);
        assert_eq!(points[23].bucket, "2024-01-15 12:00");
        assert_eq!(points[23].views, 1);
    }

    #[test]
    fn test_monthly_has_30_buckets() {
        let conn = setup();
        let points = query_graph(&conn, GraphPeriod::Monthly, now(), None).unwrap();
        assert_eq!(points.len(), 30);
        assert!(points.iter().all(|p| p.views == 0));
    }

    #[test]
    fn test_yearly_has_12_monthly_buckets() {
        let conn = setup();
        insert_event(&conn, "v1", "2024-01-02 00:00:00");

        let points = query_graph(&conn, GraphPeriod::Yearly, now(), None).unwrap();
        assert_eq!(points.len(), 12);
        assert_eq!(points[0].bucket, "2023-02");
        assert_eq!(points[11].bucket, "2024-01");
        assert_eq!(points[11].views, 1);
    }

    #[test]
    fn test_graph_domain_filter() {
        let conn = setup();
        insert_event(&conn, "v1", "2024-01-15 08:00:00");

        let points = query_graph(&conn, GraphPeriod::Weekly, now(), Some("other.com")).unwrap();
        assert_eq!(points.len(), 7);
        assert!(points.iter().all(|p| p.views == 0));
    }

    #[test]
    fn test_parse_periods() {
        assert_eq!(GraphPeriod::parse("daily"), Some(GraphPeriod::Daily));
        assert_eq!(GraphPeriod::parse("weekly"), Some(GraphPeriod::Weekly));
        assert_eq!(GraphPeriod::parse("monthly"), Some(GraphPeriod::Monthly));
        assert_eq!(GraphPeriod::parse("yearly"), Some(GraphPeriod::Yearly));
        assert_eq!(GraphPeriod::parse("hourly"), None);
    }
}
