use rusqlite::Connection;
use tracing::info;

use crate::Result;

/// Categories offered on the new-listing form.
const DEFAULT_CATEGORIES: &[&str] = &["Electronics", "Fashion", "Home", "Toys", "Books", "Other"];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (accounts, auctions, network)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL DEFAULT '',
                nickname    TEXT NOT NULL DEFAULT 'None',
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE categories (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                name    TEXT NOT NULL UNIQUE
            );

            CREATE TABLE listings (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id        TEXT NOT NULL REFERENCES users(id),
                title           TEXT NOT NULL,
                description     TEXT NOT NULL,
                starting_price  INTEGER NOT NULL CHECK (starting_price >= 0),
                current_price   INTEGER NOT NULL CHECK (current_price >= starting_price),
                category_id     INTEGER NOT NULL REFERENCES categories(id),
                image_url       TEXT,
                active          INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_listings_category ON listings(category_id, active);

            CREATE TABLE bids (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                listing_id  INTEGER NOT NULL REFERENCES listings(id),
                bidder_id   TEXT NOT NULL REFERENCES users(id),
                amount      INTEGER NOT NULL,
                updated_at  TEXT NOT NULL,
                UNIQUE(listing_id, bidder_id)
            );

            CREATE TABLE comments (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                listing_id  INTEGER NOT NULL REFERENCES listings(id),
                author_id   TEXT NOT NULL REFERENCES users(id),
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_comments_listing ON comments(listing_id, created_at);

            CREATE TABLE watchlist (
                user_id     TEXT NOT NULL REFERENCES users(id),
                listing_id  INTEGER NOT NULL REFERENCES listings(id),
                created_at  TEXT NOT NULL,
                PRIMARY KEY (user_id, listing_id)
            );

            CREATE TABLE posts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id    TEXT NOT NULL REFERENCES users(id),
                content     TEXT NOT NULL,
                likes       INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_posts_created ON posts(created_at);
            CREATE INDEX idx_posts_owner ON posts(owner_id, created_at);

            CREATE TABLE follows (
                follower_id TEXT NOT NULL REFERENCES users(id),
                followee_id TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                PRIMARY KEY (follower_id, followee_id),
                CHECK (follower_id <> followee_id)
            );

            CREATE INDEX idx_follows_followee ON follows(followee_id);

            CREATE TABLE likes (
                user_id     TEXT NOT NULL REFERENCES users(id),
                post_id     INTEGER NOT NULL REFERENCES posts(id),
                created_at  TEXT NOT NULL,
                PRIMARY KEY (user_id, post_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;

        for name in DEFAULT_CATEGORIES {
            conn.execute("INSERT OR IGNORE INTO categories (name) VALUES (?1)", [name])?;
        }
    }

    if version < 2 {
        info!("Running migration v2 (mail)");
        conn.execute_batch(
            "
            CREATE TABLE emails (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id    TEXT NOT NULL REFERENCES users(id),
                sender_id   TEXT NOT NULL REFERENCES users(id),
                subject     TEXT NOT NULL,
                body        TEXT NOT NULL,
                is_read     INTEGER NOT NULL DEFAULT 0,
                archived    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_emails_owner ON emails(owner_id, created_at);

            CREATE TABLE email_recipients (
                email_id    INTEGER NOT NULL REFERENCES emails(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                PRIMARY KEY (email_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
