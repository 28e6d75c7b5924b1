use axum::{extract::State, Json};

use crate::{
    api::ApiResult,
    db::repositories::PostRepository,
    state::AppState,
};
use postboard_types::Stats;

/// GET /api/stats - Dashboard totals
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<Stats>> {
    let conn = state.db.connection()?;
    let stats = PostRepository::new(&conn).stats()?;
    Ok(Json(stats))
}

/// GET /api/categories - Distinct non-empty categories
pub async fn get_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let conn = state.db.connection()?;
    let categories = PostRepository::new(&conn).categories()?;
    Ok(Json(categories))
}
