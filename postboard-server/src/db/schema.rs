use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

/// SQL schema for the Postboard database
/// Creates all tables with proper constraints, foreign keys, and indexes
pub const SCHEMA: &str = r#"
-- Authors table (one row per distinct email)
CREATE TABLE IF NOT EXISTS authors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    company TEXT,
    job_title TEXT,
    bio TEXT,
    follower_count INTEGER DEFAULT 0,
    verified INTEGER DEFAULT 0,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_authors_email ON authors(email);

-- Posts table (ids come from the source export)
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY,
    author_id INTEGER NOT NULL,
    text TEXT,
    date TEXT,
    likes INTEGER DEFAULT 0,
    comments INTEGER DEFAULT 0,
    shares INTEGER DEFAULT 0,
    total_engagements INTEGER DEFAULT 0,
    engagement_rate REAL DEFAULT 0.0,
    image_svg TEXT,
    category TEXT,
    location TEXT,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (author_id) REFERENCES authors(id)
);

CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id);
CREATE INDEX IF NOT EXISTS idx_posts_category ON posts(category);
CREATE INDEX IF NOT EXISTS idx_posts_date ON posts(date);

-- Post tags (one row per unique tag per post)
CREATE TABLE IF NOT EXISTS post_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL,
    tag TEXT NOT NULL,
    UNIQUE (post_id, tag),
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_post_tags_post ON post_tags(post_id);
CREATE INDEX IF NOT EXISTS idx_post_tags_tag ON post_tags(tag);
"#;

/// Drops every table, children first
pub const DROP_SCHEMA: &str = r#"
DROP TABLE IF EXISTS post_tags;
DROP TABLE IF EXISTS posts;
DROP TABLE IF EXISTS authors;
"#;

/// Storage format of `posts.date`; lexical order matches chronological order
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const FALLBACK_AUTHOR_EMAIL: &str = "sys.admin@socialmediaposts.com";

/// Ensure the fallback "Sys Admin" author exists.
///
/// Clients always have at least one valid author to attach new posts to.
/// Safe to call any number of times; returns `true` when the row was inserted.
pub fn ensure_fallback_author(conn: &Connection) -> Result<bool> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM authors WHERE email = ?",
            [FALLBACK_AUTHOR_EMAIL],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to look up fallback author")?;

    if existing.is_some() {
        return Ok(false);
    }

    conn.execute(
        "INSERT INTO authors (first_name, last_name, email, company, job_title, bio, follower_count, verified)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        (
            "Sys",
            "Admin",
            FALLBACK_AUTHOR_EMAIL,
            "Social Media Posts",
            "System Administrator",
            "The default system administrator account.",
            999_999,
            1,
        ),
    )
    .context("Failed to create fallback author")?;

    Ok(true)
}

/// Drop and recreate every table. All existing rows are lost.
pub fn recreate(conn: &Connection) -> Result<()> {
    conn.execute_batch(DROP_SCHEMA)
        .context("Failed to drop existing tables")?;
    conn.execute_batch(SCHEMA)
        .context("Failed to create database schema")?;
    Ok(())
}
