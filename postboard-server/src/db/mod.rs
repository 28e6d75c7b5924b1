pub mod schema;
pub mod connection;
pub mod filter;
pub mod repositories;

pub use connection::{Database, DbConnection, DbPool};
pub use filter::PostFilter;
