use crate::query::window::format_ts;
use chrono::NaiveDateTime;
use duckdb::Connection;

/// Unique-visitor counts for one domain across the standard buckets. Each
/// figure is an independent COUNT(DISTINCT fingerprint) over its own range;
/// they are not cumulative views of each other.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DomainSummary {
    pub domain: String,
    pub daily: u64,
    pub weekly: u64,
    pub monthly: u64,
    pub yearly: u64,
}

/// Per-domain unique visitors for the last day/week/month/year.
pub fn query_domain_summary(
    conn: &Connection,
    now: NaiveDateTime,
) -> Result<Vec<DomainSummary>, duckdb::Error> {
    let day = format_ts(now - chrono::Duration::days(1));
    let week = format_ts(now - chrono::Duration::days(7));
    let month = format_ts(now - chrono::Duration::days(30));
    let year = format_ts(now - chrono::Duration::days(365));

    let sql = "
        SELECT domain,
               COUNT(DISTINCT fingerprint) FILTER (WHERE timestamp >= CAST(? AS TIMESTAMP)),
               COUNT(DISTINCT fingerprint) FILTER (WHERE timestamp >= CAST(? AS TIMESTAMP)),
               COUNT(DISTINCT fingerprint) FILTER (WHERE timestamp >= CAST(? AS TIMESTAMP)),
               COUNT(DISTINCT fingerprint) FILTER (WHERE timestamp >= CAST(? AS TIMESTAMP))
        FROM events
        GROUP BY domain
        ORDER BY domain
    ";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(duckdb::params![day, week, month, year], |row| {
            Ok(DomainSummary {
                domain: row.get(0)?,
                daily: row.get(1)?,
                weekly: row.get(2)?,
                monthly: row.get(3)?,
                yearly: row.get(4)?,
            })
        })?
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
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn insert_event(conn: &Connection, domain: &str, fingerprint: &str, timestamp: &str) {
        conn.execute(
            "INSERT INTO events (url, domain, timestamp, is_unique, referrer,
             browser, device_type, country, client_ip, fingerprint)
             VALUES ('https://x/', ?, CAST(? AS TIMESTAMP), false, NULL,
             'Chrome', 'Desktop', 'US', '1.2.3.4', ?)",
            duckdb::params![domain, timestamp, fingerprint],
        )
        .unwrap();
    }

    #[test]
    fn test_empty_summary() {
        let conn = setup();
        assert!(query_domain_summary(&conn, now()).unwrap().is_empty());
    }

    #[test]
    fn test_buckets_count_distinct_independently() {
        let conn = setup();
        // Two fingerprints today; one of them twice (dedup within bucket)
        insert_event(&conn, "a.com", "v1", "2024-06-15 08:00:00");
        insert_event(&conn, "a.com", "v1", "2024-06-15 09:00:00");
        insert_event(&conn, "a.com", "v2", "2024-06-15 10:00:00");
        // One fingerprint five days ago: weekly but not daily
        insert_event(&conn, "a.com", "v3", "2024-06-10 10:00:00");
        // One fingerprint three weeks ago: monthly but not weekly
        insert_event(&conn, "a.com", "v4", "2024-05-25 10:00:00");
        // One fingerprint eleven months ago: yearly only
        insert_event(&conn, "a.com", "v5", "2023-07-20 10:00:00");
        // Outside every bucket
        insert_event(&conn, "a.com", "v6", "2022-01-01 10:00:00");

        let rows = query_domain_summary(&conn, now()).unwrap();
        assert_eq!(rows.len(), 1);
        let s = &rows[0];
        assert_eq!(s.domain, "a.com");
        assert_eq!(s.daily, 2);
        assert_eq!(s.weekly, 3);
        assert_eq!(s.monthly, 4);
        assert_eq!(s.yearly, 5);
    }

    #[test]
    fn test_domains_reported_separately_and_sorted() {
        let conn = setup();
        insert_event(&conn, "b.com", "v1", "2024-06-15 08:00:00");
        insert_event(&conn, "a.com", "v1", "2024-06-15 08:00:00");

        let rows = query_domain_summary(&conn, now()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].domain, "a.com");
        assert_eq!(rows[1].domain, "b.com");
    }
}
