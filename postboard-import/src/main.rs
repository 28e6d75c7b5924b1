mod importer;
mod normalize;

use anyhow::{Context, Result};
use clap::Parser;
use importer::ImportStats;
use postboard_server::db::Database;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Postboard CSV Import Utility
///
/// Cleans the raw social-media export and loads it into a fresh SQLite store.
/// Any existing tables in the target database are dropped first.
#[derive(Parser, Debug)]
#[command(name = "postboard-import")]
#[command(about = "Clean and import the social media posts CSV", long_about = None)]
struct Args {
    /// Path to the source CSV file
    #[arg(short, long, env = "CSV_PATH", default_value = "social_media_posts_data.csv")]
    csv: PathBuf,

    /// Path to the SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "social_media.db")]
    database: PathBuf,
}

/// "double_at_emails" -> "Double At Emails"
fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Display import statistics in a formatted way
fn display_stats(stats: &ImportStats) {
    println!();
    println!("Import Summary");
    println!("==============");
    println!();
    println!("Total rows processed: {}", stats.rows_seen);
    println!("Unique authors created: {}", stats.authors_created);
    println!("Posts imported: {}", stats.posts_created);
    println!("Posts replaced: {}", stats.posts_replaced);
    println!("Rows skipped (no email): {}", stats.rows_skipped);
    println!("Malformed rows: {}", stats.malformed_rows);
    println!("Tags created: {}", stats.tags_created);

    println!();
    println!("Data issues fixed:");
    for (kind, count) in stats.repairs.iter() {
        println!("  {}: {}", title_case(kind.as_str()), count);
    }

    println!();
    println!("Import completed successfully!");
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postboard_import=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    println!("Postboard CSV Import Utility");
    println!("============================");
    println!();
    println!("CSV file: {}", args.csv.display());
    println!("Database: {}", args.database.display());
    println!();

    // Open the source before touching the store
    let source = importer::open_source(&args.csv)?;

    let db = Database::new(&args.database).context("Failed to open database")?;
    let mut conn = db.connection()?;

    println!("Importing and cleaning data...");
    let stats = importer::run_import(source, &mut conn)?;

    display_stats(&stats);

    Ok(())
}
