use anyhow::{Context, Result};
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension, Row};

use postboard_types::{Post, PostAuthor, SortBy, Stats, UpdatePostRequest};

use crate::db::filter::{order_clause, PostFilter};

/// Post row as written by the importer and the create endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPost {
    pub id: i64,
    pub author_id: i64,
    pub text: Option<String>,
    pub date: Option<String>,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub total_engagements: i64,
    pub engagement_rate: f64,
    pub image_svg: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
}

const POST_SELECT: &str = "SELECT p.id, p.text, p.date, p.likes, p.comments, p.shares,
        p.total_engagements, p.engagement_rate, p.image_svg, p.category, p.location,
        a.id, a.first_name, a.last_name, a.email, a.company, a.job_title, a.bio,
        a.follower_count, a.verified
     FROM posts p
     JOIN authors a ON p.author_id = a.id";

const POST_FROM: &str = " FROM posts p JOIN authors a ON p.author_id = a.id";

fn map_post_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    let first_name: String = row.get(12)?;
    let last_name: String = row.get(13)?;
    Ok(Post {
        id: row.get(0)?,
        content: row.get(1)?,
        date: row.get(2)?,
        likes: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
        comments: row.get::<_, Option<i64>>(4)?.unwrap_or_default(),
        shares: row.get::<_, Option<i64>>(5)?.unwrap_or_default(),
        total_engagements: row.get::<_, Option<i64>>(6)?.unwrap_or_default(),
        engagement_rate: row.get::<_, Option<f64>>(7)?.unwrap_or_default(),
        image: row.get(8)?,
        category: row.get(9)?,
        location: row.get(10)?,
        author: PostAuthor {
            id: row.get(11)?,
            name: format!("{} {}", first_name, last_name),
            first_name,
            last_name,
            email: row.get(14)?,
            company: row.get(15)?,
            title: row.get(16)?,
            bio: row.get(17)?,
            follower_count: row.get::<_, Option<i64>>(18)?.unwrap_or_default(),
            verified: row.get::<_, Option<i64>>(19)?.unwrap_or_default() != 0,
        },
        tags: Vec::new(), // Populated by the caller
    })
}

pub struct PostRepository<'c> {
    conn: &'c Connection,
}

impl<'c> PostRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert a post, failing if the id is taken
    pub fn create(&self, post: &NewPost) -> Result<()> {
        self.write("INSERT", post)
            .with_context(|| format!("Failed to create post {}", post.id))?;
        Ok(())
    }

    /// Insert a post, replacing any existing row with the same id
    pub fn upsert(&self, post: &NewPost) -> Result<()> {
        self.write("INSERT OR REPLACE", post)
            .with_context(|| format!("Failed to upsert post {}", post.id))?;
        Ok(())
    }

    fn write(&self, verb: &str, post: &NewPost) -> rusqlite::Result<usize> {
        let sql = format!(
            "{} INTO posts (id, author_id, text, date, likes, comments, shares,
                            total_engagements, engagement_rate, image_svg, category, location)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            verb
        );
        self.conn.execute(
            &sql,
            (
                post.id,
                post.author_id,
                &post.text,
                &post.date,
                post.likes,
                post.comments,
                post.shares,
                post.total_engagements,
                post.engagement_rate,
                &post.image_svg,
                &post.category,
                &post.location,
            ),
        )
    }

    pub fn exists(&self, post_id: i64) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT id FROM posts WHERE id = ?", [post_id], |row| row.get(0))
            .optional()
            .context("Failed to check post existence")?;
        Ok(found.is_some())
    }

    /// One past the largest post id (1 for an empty table)
    pub fn next_id(&self) -> Result<i64> {
        let max_id: Option<i64> = self
            .conn
            .query_row("SELECT MAX(id) FROM posts", [], |row| row.get(0))
            .context("Failed to read max post id")?;
        Ok(max_id.unwrap_or(0) + 1)
    }

    /// Get a single post by ID (without tags)
    pub fn get_by_id(&self, post_id: i64) -> Result<Option<Post>> {
        let sql = format!("{} WHERE p.id = ?", POST_SELECT);
        let post = self
            .conn
            .query_row(&sql, [post_id], map_post_row)
            .optional()
            .context("Failed to load post")?;
        Ok(post)
    }

    /// Count posts matching a filter
    pub fn count(&self, filter: &PostFilter) -> Result<i64> {
        let clause = filter.where_clause();
        let sql = format!("SELECT COUNT(*){}{}", POST_FROM, clause.to_sql());
        let count = self
            .conn
            .query_row(&sql, params_from_iter(clause.params()), |row| row.get(0))
            .context("Failed to count posts")?;
        Ok(count)
    }

    /// Get one page of posts matching a filter (without tags)
    pub fn list(
        &self,
        filter: &PostFilter,
        sort: SortBy,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let clause = filter.where_clause();
        let sql = format!(
            "{}{}{} LIMIT ? OFFSET ?",
            POST_SELECT,
            clause.to_sql(),
            order_clause(sort)
        );

        let params = clause
            .params()
            .iter()
            .cloned()
            .chain([Value::Integer(limit), Value::Integer(offset)]);

        let mut stmt = self.conn.prepare(&sql)?;
        let posts = stmt
            .query_map(params_from_iter(params), map_post_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list posts")?;

        Ok(posts)
    }

    /// Apply the supplied fields of an update; tags are handled separately.
    /// Returns the number of rows changed (0 when nothing was supplied).
    pub fn update(&self, post_id: i64, changes: &UpdatePostRequest) -> Result<usize> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        let fields = [
            ("text = ?", &changes.content),
            ("category = ?", &changes.category),
            ("location = ?", &changes.location),
            ("image_svg = ?", &changes.image_svg),
        ];
        for (assignment, value) in fields {
            // Explicit null clears the column
            if let Some(value) = value {
                assignments.push(assignment);
                params.push(value.clone().map_or(Value::Null, Value::Text));
            }
        }

        if assignments.is_empty() {
            return Ok(0);
        }

        params.push(Value::Integer(post_id));
        let sql = format!("UPDATE posts SET {} WHERE id = ?", assignments.join(", "));
        let changed = self
            .conn
            .execute(&sql, params_from_iter(params))
            .with_context(|| format!("Failed to update post {}", post_id))?;

        Ok(changed)
    }

    pub fn delete(&self, post_id: i64) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM posts WHERE id = ?", [post_id])
            .with_context(|| format!("Failed to delete post {}", post_id))?;
        Ok(removed)
    }

    /// Aggregate counts across all posts
    pub fn stats(&self) -> Result<Stats> {
        let (total_posts, total_likes, total_comments, avg_engagement): (i64, i64, i64, f64) =
            self.conn
                .query_row(
                    "SELECT COUNT(*), COALESCE(SUM(likes), 0), COALESCE(SUM(comments), 0),
                            COALESCE(AVG(engagement_rate), 0.0)
                     FROM posts",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .context("Failed to compute post stats")?;

        Ok(Stats {
            total_posts,
            total_likes,
            total_comments,
            avg_engagement: round_to_tenth(avg_engagement),
        })
    }

    /// Distinct non-empty categories, ascending
    pub fn categories(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT category
             FROM posts
             WHERE category IS NOT NULL AND category != ''
             ORDER BY category",
        )?;

        let categories = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list categories")?;

        Ok(categories)
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
