//! SQLite schema DDL and migration framework for the suite archive.

use rusqlite::Connection;

use crate::errors::ForgeResult;

/// Current schema version. Migrations run from whatever the DB currently
/// reports up to this value.
pub const SCHEMA_VERSION: i32 = 2;

/// Core DDL statements: 5 CREATE TABLE + 3 CREATE INDEX.
///
/// Executed with `CREATE … IF NOT EXISTS` so they are safe to replay on an
/// already-initialised database.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // ── tables (5) ──────────────────────────────────────────────────────
    "CREATE TABLE IF NOT EXISTS forge_meta (
        key TEXT PRIMARY KEY,
        value TEXT
    );",
    "CREATE TABLE IF NOT EXISTS migration_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        from_version INTEGER NOT NULL,
        to_version INTEGER NOT NULL,
        status TEXT NOT NULL,
        error_message TEXT,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        language TEXT NOT NULL,
        framework TEXT NOT NULL,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS suite_revisions (
        session_id TEXT NOT NULL REFERENCES sessions(id),
        revision INTEGER NOT NULL,
        case_count INTEGER NOT NULL,
        coverage INTEGER NOT NULL,
        payload_json TEXT NOT NULL,
        checksum INTEGER NOT NULL,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY(session_id, revision)
    );",
    "CREATE TABLE IF NOT EXISTS analyses (
        content_hash TEXT PRIMARY KEY,
        language TEXT NOT NULL,
        strategy TEXT NOT NULL,
        degraded INTEGER NOT NULL DEFAULT 0,
        payload_json TEXT NOT NULL,
        checksum INTEGER NOT NULL,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    // ── indexes (3) ─────────────────────────────────────────────────────
    "CREATE INDEX IF NOT EXISTS idx_suite_revisions_created ON suite_revisions(session_id, created_at);",
    "CREATE INDEX IF NOT EXISTS idx_analyses_language ON analyses(language);",
    "CREATE INDEX IF NOT EXISTS idx_analyses_degraded ON analyses(degraded, language);",
];

// ─── Migration framework ────────────────────────────────────────────────────

/// Run all pending migrations from the current stored version up to
/// [`SCHEMA_VERSION`]. Each step is wrapped in a SAVEPOINT so a failure
/// rolls back only that single step.
pub fn migrate_schema(conn: &Connection) -> ForgeResult<()> {
    let mut current_version = get_schema_version(conn);

    while current_version < SCHEMA_VERSION {
        let next_version = current_version + 1;
        conn.execute_batch("SAVEPOINT forge_migrate_step;")?;

        let step_result = (|| -> ForgeResult<()> {
            match next_version {
                1 => migrate_to_v1(conn)?,
                2 => migrate_to_v2(conn)?,
                _ => {}
            }
            set_schema_version(conn, next_version)?;
            record_migration_step(conn, current_version, next_version, "success", None)?;
            conn.execute_batch("RELEASE SAVEPOINT forge_migrate_step;")?;
            Ok(())
        })();

        match step_result {
            Ok(()) => {
                current_version = next_version;
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK TO SAVEPOINT forge_migrate_step;");
                let _ = conn.execute_batch("RELEASE SAVEPOINT forge_migrate_step;");
                let _ = record_migration_step(
                    conn,
                    current_version,
                    next_version,
                    "failed",
                    Some(&e.to_string()),
                );
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Read the current schema version from `forge_meta`.
/// Returns 0 when the key is absent or unparseable.
pub fn get_schema_version(conn: &Connection) -> i32 {
    let result: Result<String, _> = conn.query_row(
        "SELECT value FROM forge_meta WHERE key = 'schema_version';",
        [],
        |row| row.get(0),
    );
    match result {
        Ok(v) => v.parse::<i32>().unwrap_or(0),
        Err(_) => 0,
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> ForgeResult<()> {
    conn.execute(
        "INSERT INTO forge_meta(key, value) \
         VALUES('schema_version', ?1) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        rusqlite::params![version.to_string()],
    )?;
    Ok(())
}

fn record_migration_step(
    conn: &Connection,
    from_v: i32,
    to_v: i32,
    status: &str,
    error_msg: Option<&str>,
) -> ForgeResult<()> {
    conn.execute(
        "INSERT INTO migration_history(from_version, to_version, status, error_message) \
         VALUES (?1, ?2, ?3, ?4);",
        rusqlite::params![from_v, to_v, status, error_msg],
    )?;
    Ok(())
}

// ─── Individual migration steps ─────────────────────────────────────────────

fn column_exists(conn: &Connection, table: &str, column: &str) -> ForgeResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2;",
        rusqlite::params![table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// v0 -> v1: baseline, created by [`SCHEMA_STATEMENTS`].
fn migrate_to_v1(_conn: &Connection) -> ForgeResult<()> {
    Ok(())
}

/// v1 -> v2: per-revision gap counts, backfilled from archived payloads so
/// gap history can be listed without decoding suites.
fn migrate_to_v2(conn: &Connection) -> ForgeResult<()> {
    if !column_exists(conn, "suite_revisions", "gap_count")? {
        conn.execute_batch(
            "ALTER TABLE suite_revisions ADD COLUMN gap_count INTEGER NOT NULL DEFAULT 0;",
        )?;
    }
    conn.execute_batch(
        "UPDATE suite_revisions \
         SET gap_count = COALESCE(json_array_length(payload_json, '$.gaps'), 0);",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        for stmt in SCHEMA_STATEMENTS {
            conn.execute_batch(stmt).unwrap();
        }
        conn
    }

    #[test]
    fn test_schema_statement_counts() {
        assert_eq!(SCHEMA_STATEMENTS.len(), 8);
    }

    #[test]
    fn test_migrate_fresh_database() {
        let conn = fresh();
        assert_eq!(get_schema_version(&conn), 0);
        migrate_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);

        let steps: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM migration_history WHERE status = 'success';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(steps, SCHEMA_VERSION as i64);
    }

    #[test]
    fn test_upgrade_from_v1_backfills_gap_counts() {
        let conn = fresh();
        migrate_to_v1(&conn).unwrap();
        set_schema_version(&conn, 1).unwrap();
        assert!(!column_exists(&conn, "suite_revisions", "gap_count").unwrap());

        conn.execute_batch(
            "INSERT INTO sessions(id, language, framework) VALUES('s1', 'python', 'pytest');
             INSERT INTO suite_revisions(session_id, revision, case_count, coverage, payload_json, checksum)
             VALUES('s1', 1, 3, 100, '{\"gaps\":[{\"target\":\"a\"},{\"target\":\"b\"}]}', 0),
                   ('s1', 2, 3, 100, '{\"gaps\":[]}', 0);",
        )
        .unwrap();

        migrate_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
        let counts: Vec<i64> = conn
            .prepare("SELECT gap_count FROM suite_revisions ORDER BY revision;")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(counts, vec![2, 0]);
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = fresh();
        migrate_schema(&conn).unwrap();
        migrate_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }
}
