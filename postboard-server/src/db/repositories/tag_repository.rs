use anyhow::{Context, Result};
use rusqlite::Connection;

pub struct TagRepository<'c> {
    conn: &'c Connection,
}

impl<'c> TagRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Attach tags to a post, skipping blanks and tags it already has.
    /// Returns the number of rows inserted.
    pub fn add(&self, post_id: i64, tags: &[String]) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT OR IGNORE INTO post_tags (post_id, tag) VALUES (?, ?)")?;

        let mut inserted = 0;
        for tag in tags {
            let tag = tag.trim();
            if tag.is_empty() {
                continue;
            }
            inserted += stmt
                .execute((post_id, tag))
                .with_context(|| format!("Failed to tag post {} with {}", post_id, tag))?;
        }

        Ok(inserted)
    }

    /// Replace the whole tag set of a post
    pub fn replace(&self, post_id: i64, tags: &[String]) -> Result<usize> {
        self.delete_for_post(post_id)?;
        self.add(post_id, tags)
    }

    /// Get tags for a post, in insertion order
    pub fn for_post(&self, post_id: i64) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT tag FROM post_tags WHERE post_id = ? ORDER BY id")?;

        let tags = stmt
            .query_map([post_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to load post tags")?;

        Ok(tags)
    }

    pub fn delete_for_post(&self, post_id: i64) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM post_tags WHERE post_id = ?", [post_id])
            .context("Failed to delete post tags")?;
        Ok(removed)
    }
}
