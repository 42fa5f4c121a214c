use duckdb::Connection;

/// SQL statements to create all tables.
///
/// `visitor_days` is the uniqueness ledger: the composite primary key is the
/// dedup mechanism. `page_stats` keys on url so counter updates can run as a
/// single upsert.
pub const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS allowed_domains (
    domain          VARCHAR PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS visitor_days (
    fingerprint     VARCHAR NOT NULL,
    day             DATE NOT NULL,
    PRIMARY KEY (fingerprint, day)
);

CREATE TABLE IF NOT EXISTS events (
    url             VARCHAR NOT NULL,
    domain          VARCHAR NOT NULL,
    timestamp       TIMESTAMP NOT NULL,
    is_unique       BOOLEAN NOT NULL,
    referrer        VARCHAR,
    browser         VARCHAR NOT NULL,
    device_type     VARCHAR NOT NULL,
    country         VARCHAR NOT NULL,
    client_ip       VARCHAR NOT NULL,
    fingerprint     VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS page_stats (
    url             VARCHAR PRIMARY KEY,
    domain          VARCHAR NOT NULL,
    views           BIGINT NOT NULL,
    unique_views    BIGINT NOT NULL,
    active_seconds  BIGINT NOT NULL
);
";

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), duckdb::Error> {
    conn.execute_batch(CREATE_TABLES)?;
    Ok(())
}
