use anyhow::Context;
use csv::{ReaderBuilder, StringRecord};
use postboard_server::db::{
    repositories::{AuthorRepository, NewAuthor, NewPost, PostRepository, TagRepository},
    schema,
};
use rusqlite::Connection;
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::normalize::{
    clean_boolean, clean_datetime, clean_email, clean_float, clean_header, clean_integer,
    clean_location, clean_text, parse_float, parse_integer, parse_tags,
};

/// Rows between progress log lines
const PROGRESS_INTERVAL: usize = 5000;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Cannot read source file {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read CSV source: {0}")]
    Csv(#[from] csv::Error),

    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// Kinds of data defect the import repairs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairKind {
    BooleanInconsistency,
    DoublePercent,
    ExtraCommas,
    NullLocations,
    MissingImages,
    DuplicateTags,
    DoubleAtEmails,
    InvalidDates,
    InvalidNumbers,
    MalformedTags,
}

impl RepairKind {
    pub const ALL: [RepairKind; 10] = [
        RepairKind::BooleanInconsistency,
        RepairKind::DoublePercent,
        RepairKind::ExtraCommas,
        RepairKind::NullLocations,
        RepairKind::MissingImages,
        RepairKind::DuplicateTags,
        RepairKind::DoubleAtEmails,
        RepairKind::InvalidDates,
        RepairKind::InvalidNumbers,
        RepairKind::MalformedTags,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepairKind::BooleanInconsistency => "boolean_inconsistency",
            RepairKind::DoublePercent => "double_percent",
            RepairKind::ExtraCommas => "extra_commas",
            RepairKind::NullLocations => "null_locations",
            RepairKind::MissingImages => "missing_images",
            RepairKind::DuplicateTags => "duplicate_tags",
            RepairKind::DoubleAtEmails => "double_at_emails",
            RepairKind::InvalidDates => "invalid_dates",
            RepairKind::InvalidNumbers => "invalid_numbers",
            RepairKind::MalformedTags => "malformed_tags",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Per-kind repair tallies
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RepairCounts {
    counts: [usize; RepairKind::ALL.len()],
}

impl RepairCounts {
    pub fn record(&mut self, kind: RepairKind) {
        self.add(kind, 1);
    }

    pub fn add(&mut self, kind: RepairKind, count: usize) {
        self.counts[kind.index()] += count;
    }

    pub fn get(&self, kind: RepairKind) -> usize {
        self.counts[kind.index()]
    }

    /// Tallies in reporting order
    pub fn iter(&self) -> impl Iterator<Item = (RepairKind, usize)> + '_ {
        RepairKind::ALL.iter().map(|kind| (*kind, self.get(*kind)))
    }
}

/// Statistics collected during an import run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportStats {
    /// Data rows read from the source, malformed ones included
    pub rows_seen: usize,
    pub authors_created: usize,
    /// Rows written as posts, re-imported ids included
    pub posts_created: usize,
    /// Rows whose post id had already been written earlier in the run
    pub posts_replaced: usize,
    /// Rows without a usable author email
    pub rows_skipped: usize,
    /// Records with text that is not valid UTF-8
    pub malformed_rows: usize,
    pub tags_created: usize,
    pub repairs: RepairCounts,
}

/// Open the source file; fails before anything touches the store
pub fn open_source(path: &Path) -> Result<BufReader<File>, ImportError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ImportError::SourceUnreadable {
            path: path.to_path_buf(),
            source,
        })
}

/// Header name to column position, after header cleanup
struct Columns {
    positions: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        let mut positions = HashMap::new();
        for (index, header) in headers.iter().enumerate() {
            // First occurrence wins for repeated headers
            positions.entry(clean_header(header)).or_insert(index);
        }
        Self { positions }
    }

    /// Field value; a missing column or short row reads as empty
    fn get<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.positions
            .get(name)
            .and_then(|index| record.get(*index))
            .unwrap_or("")
    }
}

/// Raw text of one CSV row, keyed by the export's column names
struct RawRow<'r> {
    post_id: &'r str,
    post_text: &'r str,
    post_date: &'r str,
    likes: &'r str,
    comments: &'r str,
    shares: &'r str,
    total_engagements: &'r str,
    engagement_rate: &'r str,
    post_image_svg: &'r str,
    post_category: &'r str,
    location: &'r str,
    post_tags: &'r str,
    author_first_name: &'r str,
    author_last_name: &'r str,
    author_email: &'r str,
    author_company: &'r str,
    author_job_title: &'r str,
    author_bio: &'r str,
    author_follower_count: &'r str,
    author_verified: &'r str,
}

impl<'r> RawRow<'r> {
    fn from_record(columns: &Columns, record: &'r StringRecord) -> Self {
        let field = |name: &str| columns.get(record, name);
        Self {
            post_id: field("post_id"),
            post_text: field("post_text"),
            post_date: field("post_date"),
            likes: field("likes"),
            comments: field("comments"),
            shares: field("shares"),
            total_engagements: field("total_engagements"),
            engagement_rate: field("engagement_rate"),
            post_image_svg: field("post_image_svg"),
            post_category: field("post_category"),
            location: field("location"),
            post_tags: field("post_tags"),
            author_first_name: field("author_first_name"),
            author_last_name: field("author_last_name"),
            author_email: field("author_email"),
            author_company: field("author_company"),
            author_job_title: field("author_job_title"),
            author_bio: field("author_bio"),
            author_follower_count: field("author_follower_count"),
            author_verified: field("author_verified"),
        }
    }
}

/// A row after every field has been normalized
struct CleanRow {
    email: Option<String>,
    author: NewAuthor,
    post: NewPost,
    tags: Vec<String>,
}

fn integer_field(raw: &str, repairs: &mut RepairCounts) -> i64 {
    if parse_integer(raw).is_none() && !raw.trim().is_empty() {
        repairs.record(RepairKind::InvalidNumbers);
    }
    clean_integer(raw)
}

fn float_field(raw: &str, repairs: &mut RepairCounts) -> f64 {
    if parse_float(raw).is_none() && !raw.trim().is_empty() {
        repairs.record(RepairKind::InvalidNumbers);
    }
    clean_float(raw)
}

/// Normalize every field of a row, tallying the repairs applied
fn clean_row(raw: &RawRow<'_>, repairs: &mut RepairCounts) -> CleanRow {
    if raw.author_email.contains("@@") {
        repairs.record(RepairKind::DoubleAtEmails);
    }
    let email = clean_email(raw.author_email);

    let verified_lower = raw.author_verified.to_lowercase();
    if !matches!(verified_lower.as_str(), "true" | "false" | "0" | "1" | "") {
        repairs.record(RepairKind::BooleanInconsistency);
    }

    if raw.post_text.contains("%%") {
        repairs.record(RepairKind::DoublePercent);
    }
    if raw.post_text.to_lowercase().contains("extra, commas") {
        repairs.record(RepairKind::ExtraCommas);
    }

    let date = clean_datetime(raw.post_date);
    if date.is_none() && !raw.post_date.trim().is_empty() {
        repairs.record(RepairKind::InvalidDates);
    }

    let image_svg = clean_text(raw.post_image_svg);
    if image_svg.is_none() {
        repairs.record(RepairKind::MissingImages);
    }

    let location = clean_location(raw.location);
    let location_raw = raw.location.trim();
    if location_raw.is_empty() || location_raw.eq_ignore_ascii_case("null") {
        repairs.record(RepairKind::NullLocations);
    }

    let parsed_tags = parse_tags(raw.post_tags);
    repairs.add(RepairKind::DuplicateTags, parsed_tags.duplicates);
    if parsed_tags.malformed {
        repairs.record(RepairKind::MalformedTags);
    }

    let author = NewAuthor {
        first_name: clean_text(raw.author_first_name).unwrap_or_default(),
        last_name: clean_text(raw.author_last_name).unwrap_or_default(),
        email: email.clone().unwrap_or_default(),
        company: clean_text(raw.author_company),
        job_title: clean_text(raw.author_job_title),
        bio: clean_text(raw.author_bio),
        follower_count: integer_field(raw.author_follower_count, repairs),
        verified: clean_boolean(raw.author_verified),
    };

    let post = NewPost {
        id: integer_field(raw.post_id, repairs),
        author_id: 0,
        text: clean_text(raw.post_text),
        date,
        likes: integer_field(raw.likes, repairs),
        comments: integer_field(raw.comments, repairs),
        shares: integer_field(raw.shares, repairs),
        total_engagements: integer_field(raw.total_engagements, repairs),
        engagement_rate: float_field(raw.engagement_rate, repairs),
        image_svg,
        category: clean_text(raw.post_category),
        location,
    };

    CleanRow {
        email,
        author,
        post,
        tags: parsed_tags.tags,
    }
}

/// Load a CSV export into the store, replacing whatever it held.
///
/// The schema rebuild, every row, and the fallback author seed share one
/// transaction; an error anywhere leaves the store untouched.
pub fn run_import<R: Read>(source: R, conn: &mut Connection) -> Result<ImportStats, ImportError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(source);
    let columns = Columns::new(reader.headers()?);

    let tx = conn
        .transaction()
        .context("Failed to start import transaction")?;
    schema::recreate(&tx)?;

    let author_repo = AuthorRepository::new(&tx);
    let post_repo = PostRepository::new(&tx);
    let tag_repo = TagRepository::new(&tx);

    let mut stats = ImportStats::default();
    let mut authors: HashMap<String, i64> = HashMap::new();

    for result in reader.records() {
        stats.rows_seen += 1;
        if stats.rows_seen % PROGRESS_INTERVAL == 0 {
            tracing::info!("Processed {} rows...", stats.rows_seen);
        }

        // Only undecodable text is skippable; a read failure aborts and rolls back
        let record = match result {
            Ok(record) => record,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => {
                tracing::warn!("Skipping malformed record {}: {}", stats.rows_seen, e);
                stats.malformed_rows += 1;
                continue;
            }
            Err(e) => return Err(ImportError::Csv(e)),
        };

        let mut row = clean_row(&RawRow::from_record(&columns, &record), &mut stats.repairs);

        let Some(email) = row.email.take() else {
            tracing::debug!("Skipping row {} without author email", stats.rows_seen);
            stats.rows_skipped += 1;
            continue;
        };

        let author_id = match authors.get(&email) {
            Some(id) => *id,
            None => {
                let id = author_repo
                    .create(&row.author)
                    .with_context(|| format!("Failed to create author {}", email))?;
                stats.authors_created += 1;
                authors.insert(email, id);
                id
            }
        };

        row.post.author_id = author_id;
        let post_id = row.post.id;

        if post_repo.exists(post_id)? {
            tag_repo.delete_for_post(post_id)?;
            stats.posts_replaced += 1;
        }
        post_repo.upsert(&row.post)?;
        stats.posts_created += 1;

        stats.tags_created += tag_repo.add(post_id, &row.tags)?;
    }

    if schema::ensure_fallback_author(&tx)? {
        tracing::info!("Created fallback author {}", schema::FALLBACK_AUTHOR_EMAIL);
    } else {
        tracing::info!("Fallback author already present");
    }

    tx.commit().context("Failed to commit import transaction")?;
    tracing::info!(
        "Imported {} posts from {} rows",
        stats.posts_created,
        stats.rows_seen
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use postboard_server::db::Database;

    const HEADER: &str = "post_id,post_text ,post_date,likes,comments,shares,total_engagements,engagement_rate,post_image_svg,post_category,location,post_tags,author_first_name,author_last_name,author_email,author_company,author_job_title,author_bio ,author_follower_count,author_verified";

    fn csv_of(rows: &[&str]) -> String {
        let mut data = String::from(HEADER);
        for row in rows {
            data.push('\n');
            data.push_str(row);
        }
        data.push('\n');
        data
    }

    fn import(rows: &[&str]) -> (Database, ImportStats) {
        let db = Database::in_memory().expect("Failed to create in-memory database");
        let mut conn = db.connection().expect("Failed to get connection");
        let stats = run_import(csv_of(rows).as_bytes(), &mut conn).expect("Import failed");
        drop(conn);
        (db, stats)
    }

    fn count(db: &Database, table: &str) -> i64 {
        let conn = db.connection().expect("Failed to get connection");
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .expect("Failed to count rows")
    }

    const ROW_ONE: &str = r##"1,"Growth of 40%% this quarter, extra, commas",2024-07-28 15:20:48,10,2,1,13,4.5,<svg/>,Business,"Austin, TX","[""#growth"",""#growth"",""#q3""]",Ann,Lee,Ann@@Example.com,Acme,CEO,Bio,1500,True"##;
    const ROW_TWO: &str = r##"2,Second post,2024-07-29,5,1,0,6,2.0,,Technology,null,"[""#ai""]",Bob,Ray,bob@example.com,,,,20,yes"##;

    #[test]
    fn test_import_cleans_and_counts() {
        let (db, stats) = import(&[ROW_ONE, ROW_TWO]);

        assert_eq!(stats.rows_seen, 2);
        assert_eq!(stats.authors_created, 2);
        assert_eq!(stats.posts_created, 2);
        assert_eq!(stats.posts_replaced, 0);
        assert_eq!(stats.tags_created, 3);

        assert_eq!(stats.repairs.get(RepairKind::DoubleAtEmails), 1);
        assert_eq!(stats.repairs.get(RepairKind::DoublePercent), 1);
        assert_eq!(stats.repairs.get(RepairKind::ExtraCommas), 1);
        assert_eq!(stats.repairs.get(RepairKind::DuplicateTags), 1);
        assert_eq!(stats.repairs.get(RepairKind::MissingImages), 1);
        assert_eq!(stats.repairs.get(RepairKind::NullLocations), 1);
        assert_eq!(stats.repairs.get(RepairKind::BooleanInconsistency), 1);

        let conn = db.connection().expect("Failed to get connection");
        let post = PostRepository::new(&conn)
            .get_by_id(1)
            .expect("Failed to load post")
            .expect("Post 1 should exist");
        assert_eq!(post.content.as_deref(), Some("Growth of 40% this quarter"));
        assert_eq!(post.location.as_deref(), Some("Austin, TX"));
        assert_eq!(post.author.email, "ann@example.com");
        assert!(post.author.verified);

        let second = PostRepository::new(&conn)
            .get_by_id(2)
            .expect("Failed to load post")
            .expect("Post 2 should exist");
        assert_eq!(second.date.as_deref(), Some("2024-07-29 00:00:00"));
        assert_eq!(second.location, None);
        assert_eq!(second.image, None);

        let tags = TagRepository::new(&conn).for_post(1).expect("Failed to load tags");
        assert_eq!(tags, vec!["#growth", "#q3"]);
    }

    #[test]
    fn test_reimport_replaces_post_and_tags() {
        let updated = r##"1,Rewritten,2024-08-01 09:00:00,99,0,0,99,1.0,<svg/>,Business,Austin,"[""#new""]",Ann,Lee,ann@example.com,Acme,CEO,Bio,1500,true"##;
        let (db, stats) = import(&[ROW_ONE, updated]);

        assert_eq!(stats.posts_created, 2);
        assert_eq!(stats.posts_replaced, 1);
        assert_eq!(stats.authors_created, 1);
        assert_eq!(count(&db, "posts"), 1);
        // Ann plus the fallback author
        assert_eq!(count(&db, "authors"), 2);

        let conn = db.connection().expect("Failed to get connection");
        let post = PostRepository::new(&conn)
            .get_by_id(1)
            .expect("Failed to load post")
            .expect("Post 1 should exist");
        assert_eq!(post.content.as_deref(), Some("Rewritten"));
        assert_eq!(post.likes, 99);

        let tags = TagRepository::new(&conn).for_post(1).expect("Failed to load tags");
        assert_eq!(tags, vec!["#new"]);
    }

    #[test]
    fn test_rows_without_email_are_skipped() {
        let no_email = "3,Orphan,2024-07-30 10:00:00,1,1,1,3,1.0,<svg/>,Business,Paris,[],Nobody,Here,  ,,,,0,false";
        let (db, stats) = import(&[ROW_TWO, no_email]);

        assert_eq!(stats.rows_seen, 2);
        assert_eq!(stats.rows_skipped, 1);
        assert_eq!(stats.posts_created, 1);
        assert_eq!(count(&db, "posts"), 1);
    }

    #[test]
    fn test_fallback_author_seeded_once() {
        let admin_row = "4,Admin post,2024-07-30 10:00:00,0,0,0,0,0,<svg/>,News,Remote,[],Sys,Admin,SYS.ADMIN@socialmediaposts.com,,,,0,1";
        let (db, _) = import(&[admin_row]);

        let conn = db.connection().expect("Failed to get connection");
        let admins: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM authors WHERE email = ?",
                [schema::FALLBACK_AUTHOR_EMAIL],
                |row| row.get(0),
            )
            .expect("Failed to count admins");
        assert_eq!(admins, 1);

        let (empty_db, stats) = import(&[]);
        assert_eq!(stats.rows_seen, 0);
        assert_eq!(count(&empty_db, "authors"), 1);
    }

    #[test]
    fn test_uneven_rows_and_bad_values() {
        let short = "5,Short row,not a date,lots";
        let (db, stats) = import(&[short]);

        // The author email column is missing entirely
        assert_eq!(stats.rows_skipped, 1);
        assert_eq!(stats.repairs.get(RepairKind::InvalidDates), 1);
        assert_eq!(stats.repairs.get(RepairKind::InvalidNumbers), 1);
        assert_eq!(count(&db, "posts"), 0);

        let long = format!("{},{}", ROW_TWO, "surplus,columns");
        let (_, stats) = import(&[long.as_str()]);
        assert_eq!(stats.posts_created, 1);
    }

    #[test]
    fn test_malformed_tags_counted() {
        let row = "6,Tagged,2024-07-30 10:00:00,0,0,0,0,0,<svg/>,News,Remote,#a;#b,Cy,Doe,cy@example.com,,,,0,0";
        let (db, stats) = import(&[row]);

        assert_eq!(stats.repairs.get(RepairKind::MalformedTags), 1);
        assert_eq!(stats.tags_created, 0);
        assert_eq!(count(&db, "post_tags"), 0);
    }

    #[test]
    fn test_import_replaces_previous_contents() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = dir.path().join("posts.db");
        let csv_path = dir.path().join("posts.csv");
        std::fs::write(&csv_path, csv_of(&[ROW_ONE, ROW_TWO])).expect("Failed to write CSV");

        let db = Database::new(&db_path).expect("Failed to open database");
        for _ in 0..2 {
            let source = open_source(&csv_path).expect("Source should open");
            let mut conn = db.connection().expect("Failed to get connection");
            run_import(source, &mut conn).expect("Import failed");
        }

        assert_eq!(count(&db, "posts"), 2);
        assert_eq!(count(&db, "authors"), 3);
        assert_eq!(count(&db, "post_tags"), 3);
    }

    /// Serves `data` and then fails every further read
    struct FailingReader {
        data: std::io::Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let read = self.data.read(buf)?;
            if read == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"));
            }
            Ok(read)
        }
    }

    #[test]
    fn test_read_failure_rolls_back() {
        let (db, _) = import(&[ROW_ONE, ROW_TWO]);

        let source = FailingReader {
            data: std::io::Cursor::new(b"post_id,author_email\n3,a@b.com\n4,c@d.com".to_vec()),
        };
        let mut conn = db.connection().expect("Failed to get connection");
        let result = run_import(source, &mut conn);
        drop(conn);

        assert!(matches!(result, Err(ImportError::Csv(_))));
        // Previous load is untouched
        assert_eq!(count(&db, "posts"), 2);
        assert_eq!(count(&db, "authors"), 3);
        assert_eq!(count(&db, "post_tags"), 3);
    }

    #[test]
    fn test_invalid_utf8_record_skipped() {
        let mut data = csv_of(&[ROW_TWO]).into_bytes();
        data.extend_from_slice(b"7,Bad \xff text,,,,,,,,,,,,,x@y.com,,,,,\n");

        let db = Database::in_memory().expect("Failed to create in-memory database");
        let mut conn = db.connection().expect("Failed to get connection");
        let stats = run_import(data.as_slice(), &mut conn).expect("Import failed");
        drop(conn);

        assert_eq!(stats.rows_seen, 2);
        assert_eq!(stats.malformed_rows, 1);
        assert_eq!(stats.posts_created, 1);
        assert_eq!(count(&db, "posts"), 1);
    }

    #[test]
    fn test_missing_source_is_reported() {
        let err = open_source(Path::new("/nonexistent/posts.csv")).unwrap_err();
        assert!(matches!(err, ImportError::SourceUnreadable { .. }));
    }

    #[test]
    fn test_repair_counts_iterate_in_order() {
        let mut repairs = RepairCounts::default();
        repairs.add(RepairKind::MissingImages, 3);

        let names: Vec<&str> = repairs.iter().map(|(kind, _)| kind.as_str()).collect();
        assert_eq!(names.first(), Some(&"boolean_inconsistency"));
        assert_eq!(names.len(), RepairKind::ALL.len());
        assert_eq!(
            repairs.iter().find(|(kind, _)| *kind == RepairKind::MissingImages),
            Some((RepairKind::MissingImages, 3))
        );
    }
}
