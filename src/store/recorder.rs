use chrono::NaiveDateTime;
use duckdb::Connection;

/// One tracked pageview, enriched and ready for storage.
#[derive(Debug, Clone)]
pub struct PageviewEvent {
    pub url: String,
    pub domain: String,
    pub timestamp: NaiveDateTime,
    pub is_unique: bool,
    pub referrer: Option<String>,
    pub browser: String,
    pub device_type: String,
    pub country: String,
    pub client_ip: String,
    pub fingerprint: String,
}

/// Append the event to the time-series log and bump the per-URL rollup.
///
/// Both writes run in one transaction so `page_stats.views` stays equal to
/// the event count for the URL even if the process dies mid-beacon. The
/// rollup update is a single upsert; callers never read-modify-write the
/// counters.
pub fn record_pageview(
    conn: &mut Connection,
    event: &PageviewEvent,
) -> Result<(), duckdb::Error> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO events (url, domain, timestamp, is_unique, referrer,
         browser, device_type, country, client_ip, fingerprint)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        duckdb::params![
            event.url,
            event.domain,
            event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            event.is_unique,
            event.referrer,
            event.browser,
            event.device_type,
            event.country,
            event.client_ip,
            event.fingerprint,
        ],
    )?;

    tx.execute(
        "INSERT INTO page_stats (url, domain, views, unique_views, active_seconds)
         VALUES (?, ?, 1, ?, 0)
         ON CONFLICT (url) DO UPDATE SET
             views = views + 1,
             unique_views = unique_views + excluded.unique_views",
        duckdb::params![event.url, event.domain, i64::from(event.is_unique)],
    )?;

    tx.commit()
}

/// Convert a client-reported duration to whole seconds.
///
/// Returns `None` for non-finite or non-positive values; those are rejected
/// at the API boundary before any write happens.
pub fn round_duration(seconds: f64) -> Option<u64> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(seconds.round() as u64)
}

/// Accumulate active seconds onto the per-URL rollup.
///
/// Upserts so a duration beacon that arrives before its pageview (or after a
/// crash dropped the pageview) still lands; the row is created with zero
/// views in that case.
pub fn add_active_seconds(
    conn: &Connection,
    url: &str,
    domain: &str,
    seconds: u64,
) -> Result<(), duckdb::Error> {
    conn.execute(
        "INSERT INTO page_stats (url, domain, views, unique_views, active_seconds)
         VALUES (?, ?, 0, 0, ?)
         ON CONFLICT (url) DO UPDATE SET
             active_seconds = active_seconds + excluded.active_seconds",
        duckdb::params![url, domain, i64::try_from(seconds).unwrap_or(i64::MAX)],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::store::schema::init_schema(&conn).unwrap();
        conn
    }

    fn make_event(url: &str, is_unique: bool) -> PageviewEvent {
        PageviewEvent {
            url: url.to_string(),
            domain: "example.com".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            is_unique,
            referrer: None,
            browser: "Chrome".to_string(),
            device_type: "Desktop".to_string(),
            country: "US".to_string(),
            client_ip: "1.2.3.4".to_string(),
            fingerprint: "fp".to_string(),
        }
    }

    fn page_stats(conn: &Connection, url: &str) -> (i64, i64, i64) {
        let mut stmt = conn
            .prepare("SELECT views, unique_views, active_seconds FROM page_stats WHERE url = ?")
            .unwrap();
        stmt.query_row([url], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
    }

    #[test]
    fn test_first_pageview_creates_row() {
        let mut conn = setup();
        record_pageview(&mut conn, &make_event("https://example.com/", true)).unwrap();
        assert_eq!(page_stats(&conn, "https://example.com/"), (1, 1, 0));
    }

    #[test]
    fn test_counters_track_events_exactly() {
        let mut conn = setup();
        let url = "https://example.com/post";
        // 5 views, 2 of them unique
        for is_unique in [true, false, true, false, false] {
            record_pageview(&mut conn, &make_event(url, is_unique)).unwrap();
        }

        assert_eq!(page_stats(&conn, url), (5, 2, 0));

        let mut stmt = conn
            .prepare(
                "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_unique) FROM events WHERE url = ?",
            )
            .unwrap();
        let (events, uniques): (i64, i64) = stmt
            .query_row([url], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap();
        assert_eq!(events, 5);
        assert_eq!(uniques, 2);
    }

    #[test]
    fn test_concurrent_upserts_lose_no_updates() {
        let conn = Arc::new(Mutex::new(setup()));
        let url = "https://example.com/hot";

        std::thread::scope(|s| {
            for _ in 0..8 {
                let conn = Arc::clone(&conn);
                s.spawn(move || {
                    for _ in 0..25 {
                        let mut guard = conn.lock();
                        record_pageview(&mut guard, &make_event(url, false)).unwrap();
                    }
                });
            }
        });

        let guard = conn.lock();
        assert_eq!(page_stats(&guard, url), (200, 0, 0));
    }

    #[test]
    fn test_round_duration() {
        assert_eq!(round_duration(42.4), Some(42));
        assert_eq!(round_duration(42.5), Some(43));
        assert_eq!(round_duration(0.0), None);
        assert_eq!(round_duration(-3.0), None);
        assert_eq!(round_duration(f64::NAN), None);
        assert_eq!(round_duration(f64::INFINITY), None);
    }

    #[test]
    fn test_add_active_seconds_accumulates() {
        let mut conn = setup();
        let url = "https://example.com/";
        record_pageview(&mut conn, &make_event(url, true)).unwrap();

        add_active_seconds(&conn, url, "example.com", 30).unwrap();
        add_active_seconds(&conn, url, "example.com", 12).unwrap();

        assert_eq!(page_stats(&conn, url), (1, 1, 42));
    }

    #[test]
    fn test_duration_before_pageview_creates_zero_view_row() {
        let conn = setup();
        add_active_seconds(&conn, "https://example.com/early", "example.com", 9).unwrap();
        assert_eq!(page_stats(&conn, "https://example.com/early"), (0, 0, 9));
    }
}
