use serde::{Deserialize, Serialize};

/// Ordering applied to the post listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    MostLiked,
    MostCommented,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Newest => "newest",
            SortBy::Oldest => "oldest",
            SortBy::MostLiked => "mostLiked",
            SortBy::MostCommented => "mostCommented",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "newest" => Some(SortBy::Newest),
            "oldest" => Some(SortBy::Oldest),
            "mostLiked" => Some(SortBy::MostLiked),
            "mostCommented" => Some(SortBy::MostCommented),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_keys() {
        assert_eq!(SortBy::parse("newest"), Some(SortBy::Newest));
        assert_eq!(SortBy::parse("oldest"), Some(SortBy::Oldest));
        assert_eq!(SortBy::parse(" mostLiked "), Some(SortBy::MostLiked));
        assert_eq!(SortBy::parse("mostCommented"), Some(SortBy::MostCommented));
    }

    #[test]
    fn test_parse_unknown_key() {
        assert_eq!(SortBy::parse("MostLiked"), None);
        assert_eq!(SortBy::parse(""), None);
    }

    #[test]
    fn test_as_str_matches_parse() {
        for sort in [
            SortBy::Newest,
            SortBy::Oldest,
            SortBy::MostLiked,
            SortBy::MostCommented,
        ] {
            assert_eq!(SortBy::parse(sort.as_str()), Some(sort));
        }
    }
}
