use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Current schema version. Bump together with a new `if version < N` block.
pub const SCHEMA_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (accounts, mappers, maps, subscriptions)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE accounts (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                discord_id    TEXT UNIQUE,
                osu_username  TEXT UNIQUE COLLATE NOCASE,
                secret        TEXT NOT NULL DEFAULT '',
                created_at    TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK (discord_id IS NOT NULL OR osu_username IS NOT NULL)
            );

            -- Empty secrets are legal (legacy rows) and may repeat
            CREATE UNIQUE INDEX idx_accounts_secret
                ON accounts(secret) WHERE secret <> '';

            CREATE TABLE mappers (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE maps (
                id          INTEGER PRIMARY KEY,
                mapper_id   INTEGER NOT NULL REFERENCES mappers(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_maps_mapper ON maps(mapper_id);

            CREATE TABLE subscriptions (
                account_id  INTEGER NOT NULL REFERENCES accounts(id),
                mapper_id   INTEGER NOT NULL REFERENCES mappers(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (account_id, mapper_id)
            );

            CREATE INDEX idx_subscriptions_mapper ON subscriptions(mapper_id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete (schema v{})", SCHEMA_VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<String>, _>>()
            .unwrap()
    }

    #[test]
    fn creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();

        let tables = table_names(&conn);
        for expected in ["accounts", "mappers", "maps", "subscriptions", "schema_version"] {
            assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
        }
    }

    #[test]
    fn rerun_is_a_noop() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn account_needs_an_identity() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();

        let result = conn.execute("INSERT INTO accounts (secret) VALUES ('1')", []);
        assert!(result.is_err());
    }
}
