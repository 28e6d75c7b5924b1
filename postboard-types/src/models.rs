use serde::{Deserialize, Serialize};

// Distinguishes an absent field from an explicit `null` in update payloads
mod present_or_null {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Author as embedded in a post response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostAuthor {
    pub id: i64,
    /// "first last", as displayed by clients
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: Option<String>,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub follower_count: i64,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub author: PostAuthor,
    pub content: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS`
    pub date: Option<String>,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub total_engagements: i64,
    pub engagement_rate: f64,
    pub image: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Compact author listing used by post creation forms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_posts: i64,
    pub posts_per_page: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(current_page: i64, posts_per_page: i64, total_posts: i64) -> Self {
        let total_pages = if posts_per_page > 0 {
            total_posts / posts_per_page + i64::from(total_posts % posts_per_page != 0)
        } else {
            0
        };
        Self {
            current_page,
            total_pages,
            total_posts,
            posts_per_page,
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_posts: i64,
    pub total_likes: i64,
    pub total_comments: i64,
    pub avg_engagement: f64,
}

// Request/Response types for API
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image_svg: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; `None` leaves a field alone and `Some(None)` clears it
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[serde(default, deserialize_with = "present_or_null::deserialize")]
    pub content: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_or_null::deserialize")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_or_null::deserialize")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_or_null::deserialize")]
    pub image_svg: Option<Option<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl UpdatePostRequest {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.category.is_none()
            && self.location.is_none()
            && self.image_svg.is_none()
            && self.tags.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePostResponse {
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_last_partial_page() {
        let pagination = Pagination::new(3, 10, 25);
        assert_eq!(pagination.total_pages, 3);
        assert!(!pagination.has_next);
        assert!(pagination.has_prev);
    }

    #[test]
    fn test_pagination_empty() {
        let pagination = Pagination::new(1, 10, 0);
        assert_eq!(pagination.total_pages, 0);
        assert!(!pagination.has_next);
        assert!(!pagination.has_prev);
    }

    #[test]
    fn test_pagination_exact_multiple() {
        let pagination = Pagination::new(1, 10, 20);
        assert_eq!(pagination.total_pages, 2);
        assert!(pagination.has_next);
    }

    #[test]
    fn test_pagination_huge_page_size() {
        let pagination = Pagination::new(1, i64::MAX, 3);
        assert_eq!(pagination.total_pages, 1);
        assert!(!pagination.has_next);

        let pagination = Pagination::new(2, i64::MAX, i64::MAX);
        assert_eq!(pagination.total_pages, 1);
        assert!(pagination.has_prev);
    }

    #[test]
    fn test_update_request_null_clears_text_fields() {
        let request: UpdatePostRequest =
            serde_json::from_str(r#"{"content":null,"category":"News"}"#).unwrap();
        assert_eq!(request.content, Some(None));
        assert_eq!(request.category, Some(Some("News".to_string())));
        assert_eq!(request.image_svg, None);
        assert!(!request.is_empty());

        let empty: UpdatePostRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_update_request_location_states() {
        let absent: UpdatePostRequest = serde_json::from_str(r#"{"content":"x"}"#).unwrap();
        assert_eq!(absent.location, None);

        let cleared: UpdatePostRequest = serde_json::from_str(r#"{"location":null}"#).unwrap();
        assert_eq!(cleared.location, Some(None));

        let set: UpdatePostRequest =
            serde_json::from_str(r#"{"location":"Austin, TX"}"#).unwrap();
        assert_eq!(set.location, Some(Some("Austin, TX".to_string())));
    }

    #[test]
    fn test_pagination_serializes_camel_case() {
        let value = serde_json::to_value(Pagination::new(1, 10, 5)).unwrap();
        assert_eq!(value["currentPage"], 1);
        assert_eq!(value["totalPages"], 1);
        assert_eq!(value["postsPerPage"], 10);
        assert_eq!(value["hasNext"], false);
    }
}
