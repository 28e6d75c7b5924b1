use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use postboard_types::AuthorSummary;

/// Author row as written by the importer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAuthor {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub bio: Option<String>,
    pub follower_count: i64,
    pub verified: bool,
}

pub struct AuthorRepository<'c> {
    conn: &'c Connection,
}

impl<'c> AuthorRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Create an author, returning the assigned id
    pub fn create(&self, author: &NewAuthor) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO authors (first_name, last_name, email, company, job_title, bio, follower_count, verified)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                (
                    &author.first_name,
                    &author.last_name,
                    &author.email,
                    &author.company,
                    &author.job_title,
                    &author.bio,
                    author.follower_count,
                    author.verified,
                ),
            )
            .with_context(|| format!("Failed to create author {}", author.email))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Look up an author id by email. Emails are stored lowercased, so the
    /// probe is trimmed and lowercased before matching.
    pub fn find_id_by_email(&self, email: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM authors WHERE email = ?",
                [email.trim().to_lowercase()],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up author by email")?;
        Ok(id)
    }

    /// Authors ordered by name, for post creation forms
    pub fn list_summaries(&self, limit: i64) -> Result<Vec<AuthorSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, first_name, last_name, email, company, job_title
             FROM authors
             ORDER BY first_name, last_name
             LIMIT ?",
        )?;

        let authors = stmt
            .query_map([limit], |row| {
                let first_name: String = row.get(1)?;
                let last_name: String = row.get(2)?;
                Ok(AuthorSummary {
                    id: row.get(0)?,
                    name: format!("{} {}", first_name, last_name),
                    email: row.get(3)?,
                    company: row.get(4)?,
                    title: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list authors")?;

        Ok(authors)
    }
}
