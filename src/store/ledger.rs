use chrono::NaiveDate;
use duckdb::Connection;

/// Attempt to mark a fingerprint as seen for the given day.
///
/// Returns `Ok(true)` when this call inserted the ledger row (first beacon of
/// the day for this visitor) and `Ok(false)` when the primary key already
/// held the pair. The constraint check inside the store is the only
/// synchronization point: under concurrent calls with the same fingerprint,
/// exactly one caller observes `true`. Store failures propagate as `Err` and
/// must never be read as "repeat visitor".
pub fn try_mark_seen(
    conn: &Connection,
    fingerprint: &str,
    day: NaiveDate,
) -> Result<bool, duckdb::Error> {
    let inserted = conn.execute(
        "INSERT INTO visitor_days (fingerprint, day) VALUES (?, CAST(? AS DATE))
         ON CONFLICT DO NOTHING",
        duckdb::params![fingerprint, day.to_string()],
    )?;
    Ok(inserted > 0)
}

/// Delete ledger entries older than `retention_days` before `today`.
///
/// Fingerprints rotate daily, so entries stop mattering after their day ends;
/// this keeps the ledger from growing without bound. Runs from a background
/// task, never from the beacon path. Returns the number of rows removed.
pub fn prune(
    conn: &Connection,
    today: NaiveDate,
    retention_days: u32,
) -> Result<usize, duckdb::Error> {
    let cutoff = today - chrono::Days::new(u64::from(retention_days));
    conn.execute(
        "DELETE FROM visitor_days WHERE day < CAST(? AS DATE)",
        [cutoff.to_string()],
    )
}
