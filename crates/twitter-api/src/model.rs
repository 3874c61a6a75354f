//! Wire types for the API v2 responses.
//!
//! Only the fields requested through `tweet.fields`, `user.fields` and
//! `media.fields` are modelled. Everything optional in the API is optional
//! here, since the API omits fields it has no value for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_metrics: Option<PublicMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Attachments>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced_tweets: Vec<ReferencedTweet>,
}

impl Tweet {
    /// Media keys attached to this post, in attachment order.
    pub fn media_keys(&self) -> &[String] {
        self.attachments
            .as_ref()
            .map(|a| a.media_keys.as_slice())
            .unwrap_or_default()
    }
}

/// Engagement counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicMetrics {
    pub like_count: u64,
    pub retweet_count: u64,
    pub reply_count: u64,
    #[serde(default)]
    pub quote_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachments {
    #[serde(default)]
    pub media_keys: Vec<String>,
}

/// Reference to another post (`retweeted`, `quoted` or `replied_to`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedTweet {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub media_key: String,
    /// `photo`, `video` or `animated_gif`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image_url: Option<String>,
}

/// Objects pulled in through `expansions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub media: Vec<Media>,
}

impl Includes {
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Resolve media keys against the expansion list, skipping unknown keys.
    pub fn media_for<'a>(&'a self, keys: &'a [String]) -> impl Iterator<Item = &'a Media> + 'a {
        keys.iter()
            .filter_map(|key| self.media.iter().find(|m| &m.media_key == key))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub result_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest_id: Option<String>,
}

/// Partial error reported alongside (or instead of) `data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiProblem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl std::fmt::Display for ApiProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.title, &self.detail) {
            (Some(title), Some(detail)) => write!(f, "{title}: {detail}"),
            (Some(title), None) => write!(f, "{title}"),
            (None, Some(detail)) => write!(f, "{detail}"),
            (None, None) => write!(f, "unknown api error"),
        }
    }
}

/// Response of `GET /2/tweets/search/recent`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<Tweet>,
    #[serde(default)]
    pub includes: Includes,
    #[serde(default)]
    pub meta: Meta,
}

impl SearchResponse {
    /// Results come back newest first.
    pub fn newest(&self) -> Option<&Tweet> {
        self.data.first()
    }
}

/// Response of `GET /2/tweets/:id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetResponse {
    #[serde(default)]
    pub data: Option<Tweet>,
    #[serde(default)]
    pub includes: Includes,
    #[serde(default)]
    pub errors: Vec<ApiProblem>,
}

/// Response of `GET /2/users/by/username/:username`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    #[serde(default)]
    pub data: Option<User>,
    #[serde(default)]
    pub errors: Vec<ApiProblem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_FIXTURE: &str = r#"{
        "data": [
            {
                "id": "1800000000000000002",
                "text": "Second post https://t.co/abc123",
                "created_at": "2024-06-10T08:30:00.000Z",
                "author_id": "42",
                "public_metrics": {"retweet_count": 2, "reply_count": 1, "like_count": 5, "quote_count": 0},
                "attachments": {"media_keys": ["3_1"]}
            },
            {
                "id": "1800000000000000001",
                "text": "First post",
                "created_at": "2024-06-09T08:30:00.000Z",
                "author_id": "42"
            }
        ],
        "includes": {
            "users": [{"id": "42", "name": "Example", "username": "example", "profile_image_url": "https://pbs.twimg.com/a.jpg"}],
            "media": [{"media_key": "3_1", "type": "photo", "url": "https://pbs.twimg.com/media/x.jpg"}]
        },
        "meta": {"newest_id": "1800000000000000002", "oldest_id": "1800000000000000001", "result_count": 2}
    }"#;

    #[test]
    fn test_search_response_parsing() {
        let response: SearchResponse = serde_json::from_str(SEARCH_FIXTURE).unwrap();

        assert_eq!(response.meta.result_count, 2);
        let newest = response.newest().unwrap();
        assert_eq!(newest.id, "1800000000000000002");
        assert_eq!(newest.media_keys(), ["3_1".to_string()]);
        assert_eq!(newest.public_metrics.unwrap().like_count, 5);
        assert_eq!(
            newest.created_at.unwrap().to_rfc3339(),
            "2024-06-10T08:30:00+00:00"
        );

        let media: Vec<_> = response.includes.media_for(newest.media_keys()).collect();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].kind, "photo");
        assert_eq!(response.includes.user("42").unwrap().username, "example");
    }

    #[test]
    fn test_empty_search_response() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"meta": {"result_count": 0}}"#).unwrap();
        assert!(response.newest().is_none());
        assert!(response.includes.users.is_empty());
    }

    #[test]
    fn test_tweet_response_with_errors_only() {
        let response: TweetResponse = serde_json::from_str(
            r#"{"errors": [{"title": "Not Found Error", "detail": "Could not find tweet with id: [1].", "type": "https://api.twitter.com/2/problems/resource-not-found"}]}"#,
        )
        .unwrap();
        assert!(response.data.is_none());
        assert_eq!(
            response.errors[0].to_string(),
            "Not Found Error: Could not find tweet with id: [1]."
        );
    }

    #[test]
    fn test_media_for_skips_unknown_keys() {
        let includes = Includes {
            users: vec![],
            media: vec![Media {
                media_key: "k1".to_string(),
                kind: "video".to_string(),
                url: None,
                preview_image_url: Some("https://pbs.twimg.com/p.jpg".to_string()),
            }],
        };
        let keys = vec!["missing".to_string(), "k1".to_string()];
        let found: Vec<_> = includes.media_for(&keys).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].media_key, "k1");
    }
}
