use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde::Deserialize;

use crate::{
    api::{ApiError, ApiResult},
    db::{
        repositories::{AuthorRepository, NewPost, PostRepository, TagRepository},
        schema::DATETIME_FORMAT,
        PostFilter,
    },
    state::AppState,
};
use postboard_types::{
    CreatePostRequest, CreatePostResponse, MessageResponse, Pagination, Post, PostPage, SortBy,
    UpdatePostRequest,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPostsQuery {
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    date_from: Option<String>,
    #[serde(default)]
    date_to: Option<String>,
    #[serde(default)]
    sort_by: Option<String>,
    #[serde(default = "default_page")]
    page: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

fn post_not_found() -> ApiError {
    ApiError::NotFound("Post not found".to_string())
}

/// Treat a missing or blank body field as absent
fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

/// GET /api/posts - Filtered, sorted, paginated post listing
pub async fn get_posts(
    State(state): State<AppState>,
    query: Result<Query<ListPostsQuery>, QueryRejection>,
) -> ApiResult<Json<PostPage>> {
    let Query(query) = query?;
    let page = query.page.max(1);
    let limit = query.limit.max(1);
    let sort = query
        .sort_by
        .as_deref()
        .and_then(SortBy::parse)
        .unwrap_or_default();
    tracing::debug!("Listing posts page {} (limit {}, sort {})", page, limit, sort.as_str());
    let filter = PostFilter::new(
        query.search.as_deref(),
        query.category.as_deref(),
        query.date_from.as_deref(),
        query.date_to.as_deref(),
    );

    let conn = state.db.connection()?;
    let post_repo = PostRepository::new(&conn);
    let tag_repo = TagRepository::new(&conn);

    let total = post_repo.count(&filter)?;
    let offset = (page - 1).saturating_mul(limit);
    let mut posts = post_repo.list(&filter, sort, limit, offset)?;

    for post in &mut posts {
        post.tags = tag_repo.for_post(post.id)?;
    }

    Ok(Json(PostPage {
        posts,
        pagination: Pagination::new(page, limit, total),
    }))
}

/// GET /api/posts/:id - Get a single post by ID
pub async fn get_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Post>> {
    let Path(post_id) = path?;
    let conn = state.db.connection()?;

    let mut post = PostRepository::new(&conn)
        .get_by_id(post_id)?
        .ok_or_else(post_not_found)?;
    post.tags = TagRepository::new(&conn).for_post(post_id)?;

    Ok(Json(post))
}

/// POST /api/posts - Create a new post for an existing author
pub async fn create_post(
    State(state): State<AppState>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatePostResponse>)> {
    let Json(payload) = payload?;
    let author_email = required(payload.author_email.as_deref(), "Author email is required")?;
    let content = required(payload.content.as_deref(), "Content is required")?;

    let mut conn = state.db.connection()?;
    let tx = conn.transaction()?;

    let author_id = AuthorRepository::new(&tx)
        .find_id_by_email(author_email)?
        .ok_or_else(|| ApiError::NotFound("Author not found".to_string()))?;

    let post_repo = PostRepository::new(&tx);
    let post_id = post_repo.next_id()?;
    post_repo.create(&NewPost {
        id: post_id,
        author_id,
        text: Some(content.to_string()),
        date: Some(Local::now().format(DATETIME_FORMAT).to_string()),
        image_svg: Some(payload.image_svg.clone().unwrap_or_default()),
        category: Some(payload.category.clone().unwrap_or_default()),
        location: Some(payload.location.clone().unwrap_or_default()),
        ..NewPost::default()
    })?;
    TagRepository::new(&tx).add(post_id, &payload.tags)?;

    tx.commit()?;
    tracing::info!("Created post {} for author {}", post_id, author_id);

    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponse {
            message: "Post created successfully".to_string(),
            id: post_id,
        }),
    ))
}

/// PUT /api/posts/:id - Update only the supplied fields of a post
pub async fn update_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(post_id) = path?;
    let Json(payload) = payload?;
    let mut conn = state.db.connection()?;
    let tx = conn.transaction()?;

    let post_repo = PostRepository::new(&tx);
    if !post_repo.exists(post_id)? {
        return Err(post_not_found());
    }

    if payload.is_empty() {
        tracing::debug!("Update for post {} carried no fields", post_id);
    } else {
        post_repo.update(post_id, &payload)?;

        // Supplied tags replace the whole set
        if let Some(tags) = &payload.tags {
            TagRepository::new(&tx).replace(post_id, tags)?;
        }
    }

    tx.commit()?;

    Ok(Json(MessageResponse {
        message: "Post updated successfully".to_string(),
    }))
}

/// DELETE /api/posts/:id - Delete a post and its tags
pub async fn delete_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(post_id) = path?;
    let mut conn = state.db.connection()?;
    let tx = conn.transaction()?;

    let post_repo = PostRepository::new(&tx);
    if !post_repo.exists(post_id)? {
        return Err(post_not_found());
    }

    TagRepository::new(&tx).delete_for_post(post_id)?;
    post_repo.delete(post_id)?;

    tx.commit()?;
    tracing::info!("Deleted post {}", post_id);

    Ok(Json(MessageResponse {
        message: "Post deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_blank() {
        assert!(required(None, "missing").is_err());
        assert!(required(Some("   "), "missing").is_err());
        assert_eq!(required(Some(" a@b.com "), "missing").unwrap(), "a@b.com");
    }

    #[test]
    fn test_query_defaults() {
        let query: ListPostsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 10);
        assert!(query.sort_by.is_none());
    }
}
