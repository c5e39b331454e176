use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

const TIMESTAMP_DEFAULT: &str = "(strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))";

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(&initial_schema())?;
    }

    info!("Database migrations complete");
    Ok(())
}

fn initial_schema() -> String {
    format!(
        "
        CREATE TABLE posts (
            id              TEXT PRIMARY KEY,
            author          TEXT NOT NULL,
            title           TEXT NOT NULL,
            summary         TEXT NOT NULL,
            content         TEXT NOT NULL,
            media_urls      TEXT NOT NULL DEFAULT '[]',
            gender          TEXT NOT NULL DEFAULT 'unknown',
            age_group       TEXT NOT NULL DEFAULT 'adult',
            nationality     TEXT,
            is_restricted   INTEGER NOT NULL DEFAULT 0,
            tx_hash         TEXT,
            created_at      TEXT NOT NULL DEFAULT {ts}
        );

        CREATE INDEX idx_posts_author ON posts(author);
        CREATE INDEX idx_posts_created ON posts(created_at);

        CREATE TABLE comments (
            id                  TEXT PRIMARY KEY,
            post_id             TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            author              TEXT NOT NULL,
            content             TEXT NOT NULL,
            media_urls          TEXT NOT NULL DEFAULT '[]',
            parent_comment_id   TEXT REFERENCES comments(id),
            created_at          TEXT NOT NULL DEFAULT {ts}
        );

        CREATE INDEX idx_comments_post ON comments(post_id, created_at);

        CREATE TABLE likes (
            post_id         TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            user_address    TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT {ts},
            PRIMARY KEY (post_id, user_address)
        );

        CREATE INDEX idx_likes_created ON likes(created_at);

        CREATE TABLE stars (
            post_id         TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            user_address    TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT {ts},
            PRIMARY KEY (post_id, user_address)
        );

        CREATE INDEX idx_stars_created ON stars(created_at);

        CREATE TABLE comment_likes (
            comment_id      TEXT NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
            user_address    TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT {ts},
            PRIMARY KEY (comment_id, user_address)
        );

        CREATE TABLE usernames (
            wallet_address  TEXT PRIMARY KEY,
            username        TEXT NOT NULL,
            updated_at      TEXT NOT NULL DEFAULT {ts}
        );

        CREATE TABLE reward_logs (
            id          TEXT PRIMARY KEY,
            recipient   TEXT NOT NULL,
            tx_hash     TEXT,
            status      TEXT NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'success', 'failed')),
            created_at  TEXT NOT NULL DEFAULT {ts}
        );

        CREATE INDEX idx_reward_logs_recipient ON reward_logs(recipient, status);

        INSERT INTO schema_version (version) VALUES (1);
        ",
        ts = TIMESTAMP_DEFAULT
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
