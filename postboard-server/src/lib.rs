// Library exports for postboard-server
// The import tool reuses the store modules from here

pub mod api;
pub mod config;
pub mod db;
pub mod state;

pub use api::build_router;
pub use state::AppState;
