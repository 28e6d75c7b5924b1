use axum::{extract::State, Json};

use crate::{
    api::ApiResult,
    db::repositories::AuthorRepository,
    state::AppState,
};
use postboard_types::AuthorSummary;

/// Upper bound on the author picker list
const MAX_AUTHORS: i64 = 100;

/// GET /api/authors - Authors for the post creation form
pub async fn get_authors(State(state): State<AppState>) -> ApiResult<Json<Vec<AuthorSummary>>> {
    let conn = state.db.connection()?;
    let authors = AuthorRepository::new(&conn).list_summaries(MAX_AUTHORS)?;
    Ok(Json(authors))
}
