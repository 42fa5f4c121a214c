use duckdb::Connection;

/// Register a hostname for tracking. Idempotent: re-registering an existing
/// domain is a no-op, enforced by the primary key rather than a lookup.
///
/// Callers normalize the hostname (see `ingest::url::normalize_domain`)
/// before it reaches the store.
pub fn register(conn: &Connection, domain: &str) -> Result<(), duckdb::Error> {
    conn.execute(
        "INSERT INTO allowed_domains (domain) VALUES (?) ON CONFLICT DO NOTHING",
        [domain],
    )?;
    Ok(())
}

/// Remove a hostname from the allowlist. Idempotent. Historical events for
/// the domain are retained.
pub fn remove(conn: &Connection, domain: &str) -> Result<(), duckdb::Error> {
    conn.execute("DELETE FROM allowed_domains WHERE domain = ?", [domain])?;
    Ok(())
}

/// Whether beacons for this hostname are accepted.
pub fn is_allowed(conn: &Connection, domain: &str) -> Result<bool, duckdb::Error> {
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM allowed_domains WHERE domain = ?")?;
    let count: i64 = stmt.query_row([domain], |row| row.get(0))?;
    Ok(count > 0)
}

/// All registered hostnames, sorted.
pub fn list(conn: &Connection) -> Result<Vec<String>, duckdb::Error> {
    let mut stmt = conn.prepare("SELECT domain FROM allowed_domains ORDER BY domain ASC")?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .filter_map(Result::ok)
        .collect();
    Ok(rows)
}
