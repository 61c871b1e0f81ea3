//! Schema DDL and the version-gated migrator.
//!
//! A single-row `schema_version` table gates evolution: a fresh database is
//! stamped with the compiled version, an older one is walked forward one
//! version at a time, and a newer one refuses to open. Migrations are not
//! reversible.

use rusqlite::{Connection, OptionalExtension, params};

use super::StoreError;

/// Version this binary writes and understands.
pub const SCHEMA_VERSION: i64 = 4;

/// Current DDL. Everything is `IF NOT EXISTS` so re-running on an up-to-date
/// database is a no-op.
const CREATE_CURRENT: &str = "
CREATE TABLE IF NOT EXISTS hosts (
    id              TEXT PRIMARY KEY,
    hostname        TEXT NOT NULL UNIQUE,
    version         TEXT NOT NULL DEFAULT '',
    incarnation     INTEGER NOT NULL DEFAULT 0,
    description     TEXT NOT NULL DEFAULT '',
    httpd_address   TEXT NOT NULL DEFAULT '',
    httpd_port      INTEGER NOT NULL DEFAULT 0,
    httpd_ssl       INTEGER NOT NULL DEFAULT 0,
    httpd_username  TEXT NOT NULL DEFAULT '',
    httpd_password  TEXT NOT NULL DEFAULT '',
    poll_interval   INTEGER NOT NULL DEFAULT 30,
    platform_name   TEXT NOT NULL DEFAULT '',
    platform_release TEXT NOT NULL DEFAULT '',
    platform_version TEXT NOT NULL DEFAULT '',
    platform_machine TEXT NOT NULL DEFAULT '',
    platform_cpu    INTEGER NOT NULL DEFAULT 0,
    platform_memory INTEGER NOT NULL DEFAULT 0,
    platform_swap   INTEGER NOT NULL DEFAULT 0,
    boot_time       INTEGER NOT NULL DEFAULT 0,
    uptime          INTEGER NOT NULL DEFAULT 0,
    last_seen       INTEGER NOT NULL,
    created_at      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS services (
    host_id         TEXT NOT NULL REFERENCES hosts(id) ON DELETE CASCADE,
    name            TEXT NOT NULL,
    service_type    INTEGER NOT NULL,
    status          INTEGER NOT NULL DEFAULT 0,
    monitor         INTEGER NOT NULL DEFAULT 0,
    pid             INTEGER,
    cpu_percent     REAL,
    memory_percent  REAL,
    memory_kilobyte INTEGER,
    collected_at    REAL NOT NULL,
    last_seen       INTEGER NOT NULL,
    PRIMARY KEY (host_id, name)
);

CREATE TABLE IF NOT EXISTS metrics (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    host_id       TEXT NOT NULL REFERENCES hosts(id) ON DELETE CASCADE,
    service_name  TEXT NOT NULL,
    metric_type   TEXT NOT NULL,
    metric_name   TEXT NOT NULL,
    value         REAL NOT NULL,
    collected_at  REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_metrics_series
    ON metrics(host_id, service_name, metric_type, metric_name, collected_at);
CREATE INDEX IF NOT EXISTS idx_metrics_collected_at ON metrics(collected_at);

CREATE TABLE IF NOT EXISTS filesystem_metrics (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    host_id       TEXT NOT NULL REFERENCES hosts(id) ON DELETE CASCADE,
    service_name  TEXT NOT NULL,
    mode          INTEGER,
    uid           INTEGER,
    gid           INTEGER,
    block_percent REAL,
    block_usage   REAL,
    block_total   REAL,
    inode_percent REAL,
    inode_usage   REAL,
    inode_total   REAL,
    read_bytes    INTEGER,
    read_ops      INTEGER,
    write_bytes   INTEGER,
    write_ops     INTEGER,
    collected_at  REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_filesystem_metrics_series
    ON filesystem_metrics(host_id, service_name, collected_at);

CREATE TABLE IF NOT EXISTS events (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    host_id      TEXT NOT NULL REFERENCES hosts(id) ON DELETE CASCADE,
    service_name TEXT NOT NULL,
    event_type   INTEGER NOT NULL,
    message      TEXT NOT NULL,
    created_at   INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_created_at ON events(created_at DESC);
";

/// v1 -> v2: host platform description and service process snapshot columns.
const MIGRATE_V1_V2: &[&str] = &[
    "ALTER TABLE hosts ADD COLUMN platform_name TEXT NOT NULL DEFAULT ''",
    "ALTER TABLE hosts ADD COLUMN platform_release TEXT NOT NULL DEFAULT ''",
    "ALTER TABLE hosts ADD COLUMN platform_version TEXT NOT NULL DEFAULT ''",
    "ALTER TABLE hosts ADD COLUMN platform_machine TEXT NOT NULL DEFAULT ''",
    "ALTER TABLE hosts ADD COLUMN platform_cpu INTEGER NOT NULL DEFAULT 0",
    "ALTER TABLE hosts ADD COLUMN platform_memory INTEGER NOT NULL DEFAULT 0",
    "ALTER TABLE hosts ADD COLUMN platform_swap INTEGER NOT NULL DEFAULT 0",
    "ALTER TABLE hosts ADD COLUMN boot_time INTEGER NOT NULL DEFAULT 0",
    "ALTER TABLE services ADD COLUMN pid INTEGER",
    "ALTER TABLE services ADD COLUMN cpu_percent REAL",
    "ALTER TABLE services ADD COLUMN memory_percent REAL",
    "ALTER TABLE services ADD COLUMN memory_kilobyte INTEGER",
];

/// v2 -> v3: agent uptime.
const MIGRATE_V2_V3: &[&str] = &["ALTER TABLE hosts ADD COLUMN uptime INTEGER NOT NULL DEFAULT 0"];

/// v3 -> v4: per-collection filesystem time series.
const MIGRATE_V3_V4: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS filesystem_metrics (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        host_id       TEXT NOT NULL REFERENCES hosts(id) ON DELETE CASCADE,
        service_name  TEXT NOT NULL,
        mode          INTEGER,
        uid           INTEGER,
        gid           INTEGER,
        block_percent REAL,
        block_usage   REAL,
        block_total   REAL,
        inode_percent REAL,
        inode_usage   REAL,
        inode_total   REAL,
        read_bytes    INTEGER,
        read_ops      INTEGER,
        write_bytes   INTEGER,
        write_ops     INTEGER,
        collected_at  REAL NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_filesystem_metrics_series
        ON filesystem_metrics(host_id, service_name, collected_at)",
];

pub(super) fn initialize(conn: &mut Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    match read_version(conn)? {
        None => {
            let tx = conn.transaction()?;
            tx.execute_batch(CREATE_CURRENT)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
            tx.commit()?;
        }
        Some(found) if found > SCHEMA_VERSION => {
            return Err(StoreError::VersionAhead {
                found,
                supported: SCHEMA_VERSION,
            });
        }
        Some(found) => {
            for version in found..SCHEMA_VERSION {
                apply_migration(conn, version)?;
            }
            // Indexes and tables are all IF NOT EXISTS; re-running keeps a
            // current database's DDL honest after the walk.
            conn.execute_batch(CREATE_CURRENT)?;
        }
    }
    Ok(())
}

/// Apply the single step `from -> from + 1` and bump the version row, as one
/// transaction.
fn apply_migration(conn: &mut Connection, from: i64) -> Result<(), StoreError> {
    let statements = match from {
        1 => MIGRATE_V1_V2,
        2 => MIGRATE_V2_V3,
        3 => MIGRATE_V3_V4,
        other => return Err(StoreError::MigrationGap { from: other }),
    };

    let tx = conn.transaction()?;
    for statement in statements {
        tx.execute(statement, [])?;
    }
    tx.execute(
        "UPDATE schema_version SET version = ?1",
        params![from + 1],
    )?;
    tx.commit()?;
    tracing::info!(from, to = from + 1, "applied schema migration");
    Ok(())
}

pub(super) fn read_version(conn: &Connection) -> Result<Option<i64>, rusqlite::Error> {
    conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .optional()
}
