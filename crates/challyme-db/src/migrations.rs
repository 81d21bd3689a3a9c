use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            -- Friend edges are stored in both directions.
            CREATE TABLE friendships (
                username    TEXT NOT NULL REFERENCES users(username),
                friend      TEXT NOT NULL REFERENCES users(username),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (username, friend)
            );

            -- Friend requests (challenge_id NULL) and challenge invites.
            CREATE TABLE invites (
                id            TEXT PRIMARY KEY,
                invited_by    TEXT NOT NULL,
                invited_user  TEXT NOT NULL,
                challenge_id  TEXT,
                status        TEXT NOT NULL DEFAULT 'pending',
                token         TEXT NOT NULL UNIQUE,
                created_at    TEXT NOT NULL
            );

            CREATE INDEX idx_invites_invited_user
                ON invites(invited_user, status);

            -- Challenge aggregates, one JSON document per row.
            CREATE TABLE challenges (
                id          TEXT PRIMARY KEY,
                creator     TEXT NOT NULL,
                doc         TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
