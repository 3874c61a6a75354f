//! X/Twitter implementation of [`FeedSource`].

use async_trait::async_trait;
use tracing::{debug, info};
use twitter_api::{
    Includes, SearchQuery, SearchResponse, Tweet, TweetResponse, TwitterClient, TwitterError, User,
};

use super::{Author, FeedSource, Item, ItemDetail, ItemId, MediaKind, MediaRef, Metrics};
use crate::config::SourceConfig;
use crate::utils::retry::{Backoff, RetryPolicy, retry_with_backoff};
use crate::{Error, Result};

/// Follows one account through recent search.
pub struct TwitterSource {
    client: TwitterClient,
    query: SearchQuery,
    retry: RetryPolicy,
    label: String,
}

impl TwitterSource {
    pub fn new(http: reqwest::Client, config: &SourceConfig) -> Result<Self> {
        let client = TwitterClient::new(http, &config.api_base_url, &config.bearer_token)
            .map_err(|e| Error::config(e.to_string()))?;

        let query = SearchQuery::from_user(&config.username)
            .exclude_retweets(config.filter.exclude_reposts)
            .exclude_replies(config.filter.exclude_replies)
            .exclude_quotes(config.filter.exclude_quotes)
            .max_results(config.batch_size);

        Ok(Self {
            client,
            query,
            retry: RetryPolicy::default(),
            label: format!("@{}", config.username),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Confirm the configured account exists and the token is accepted.
    ///
    /// Unknown accounts and rejected credentials are fatal; anything else is
    /// reported as a scan error so startup can continue.
    pub async fn verify_account(&self) -> Result<User> {
        let username = self.query.from.as_str();
        let user = retry_with_backoff("user lookup", &self.retry, classify, || {
            self.client.user_by_username(username)
        })
        .await
        .map_err(|e| match e {
            e if e.is_auth() => Error::auth(format!("source API rejected credentials: {e}")),
            TwitterError::NotFound(_) => {
                Error::config(format!("source account @{username} does not exist"))
            }
            e => Error::scan(e.to_string()),
        })?;

        info!("Source account @{} has id {}", user.username, user.id);
        Ok(user)
    }
}

#[async_trait]
impl FeedSource for TwitterSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn scan_latest(&self) -> Result<Option<Item>> {
        let response = retry_with_backoff("recent search", &self.retry, classify, || {
            self.client.search_recent(&self.query)
        })
        .await
        .map_err(|e| Error::scan(e.to_string()))?;

        debug!(
            result_count = response.meta.result_count,
            "Scanned {}", self.label
        );
        Ok(latest_from_search(&response))
    }

    async fn fetch_detail(&self, id: &ItemId) -> Result<ItemDetail> {
        let response = retry_with_backoff("post detail", &self.retry, classify, || {
            self.client.tweet(id.as_str())
        })
        .await
        .map_err(|e| Error::detail_fetch(id.as_str(), e.to_string()))?;

        detail_from_response(id, response)
    }
}

fn classify(err: &TwitterError) -> Backoff {
    if !err.is_retryable() {
        return Backoff::Stop;
    }
    match err.retry_after() {
        Some(wait) => Backoff::RetryAfter(wait),
        None => Backoff::Retry,
    }
}

fn latest_from_search(response: &SearchResponse) -> Option<Item> {
    response.newest().map(item_from_tweet)
}

fn detail_from_response(id: &ItemId, response: TweetResponse) -> Result<ItemDetail> {
    let TweetResponse { data, includes, .. } = response;
    let tweet = data.ok_or_else(|| Error::detail_fetch(id.as_str(), "response has no data"))?;

    let author = tweet
        .author_id
        .as_deref()
        .and_then(|author_id| includes.user(author_id))
        .or_else(|| includes.users.first())
        .map(author_from_user)
        .ok_or_else(|| Error::detail_fetch(id.as_str(), "author record missing from response"))?;

    let media = media_from_includes(&tweet, &includes);
    Ok(ItemDetail {
        item: item_from_tweet(&tweet),
        author,
        media,
    })
}

fn item_from_tweet(tweet: &Tweet) -> Item {
    Item {
        id: ItemId::new(&tweet.id),
        text: tweet.text.clone(),
        created_at: tweet.created_at,
        author_id: tweet.author_id.clone(),
        metrics: tweet.public_metrics.map(|m| Metrics {
            likes: m.like_count,
            reposts: m.retweet_count,
            replies: m.reply_count,
        }),
    }
}

fn author_from_user(user: &User) -> Author {
    Author {
        id: user.id.clone(),
        display_name: user.name.clone(),
        handle: user.username.clone(),
        avatar_url: user.profile_image_url.clone(),
    }
}

fn media_from_includes(tweet: &Tweet, includes: &Includes) -> Vec<MediaRef> {
    includes
        .media_for(tweet.media_keys())
        .map(|m| MediaRef {
            kind: MediaKind::from_tag(&m.kind),
            url: m.url.clone(),
            preview_url: m.preview_image_url.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::http_client::build_http_client;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use twitter_api::{Attachments, Media, PublicMetrics};

    fn tweet(id: &str) -> Tweet {
        Tweet {
            id: id.to_string(),
            text: "hello https://t.co/xyz".to_string(),
            created_at: None,
            author_id: Some("42".to_string()),
            public_metrics: Some(PublicMetrics {
                like_count: 5,
                retweet_count: 2,
                reply_count: 1,
                quote_count: 0,
            }),
            attachments: Some(Attachments {
                media_keys: vec!["m1".to_string()],
            }),
            referenced_tweets: vec![],
        }
    }

    fn user() -> User {
        User {
            id: "42".to_string(),
            name: "Example".to_string(),
            username: "example".to_string(),
            profile_image_url: Some("https://pbs.twimg.com/a.jpg".to_string()),
        }
    }

    fn includes() -> Includes {
        Includes {
            users: vec![user()],
            media: vec![Media {
                media_key: "m1".to_string(),
                kind: "photo".to_string(),
                url: Some("https://pbs.twimg.com/media/1.jpg".to_string()),
                preview_image_url: None,
            }],
        }
    }

    #[test]
    fn test_latest_from_search_takes_first() {
        let response = SearchResponse {
            data: vec![tweet("2"), tweet("1")],
            ..Default::default()
        };
        let item = latest_from_search(&response).unwrap();
        assert_eq!(item.id, ItemId::from("2"));
        assert_eq!(
            item.metrics,
            Some(Metrics {
                likes: 5,
                reposts: 2,
                replies: 1
            })
        );
    }

    #[test]
    fn test_latest_from_empty_search() {
        assert!(latest_from_search(&SearchResponse::default()).is_none());
    }

    #[test]
    fn test_detail_maps_author_and_media() {
        let response = TweetResponse {
            data: Some(tweet("7")),
            includes: includes(),
            errors: vec![],
        };
        let detail = detail_from_response(&ItemId::from("7"), response).unwrap();

        assert_eq!(detail.item.id, ItemId::from("7"));
        assert_eq!(detail.author.handle, "example");
        assert_eq!(detail.author.display_name, "Example");
        assert_eq!(detail.media.len(), 1);
        assert!(detail.media[0].is_photo());
    }

    #[test]
    fn test_detail_without_author_is_error() {
        let response = TweetResponse {
            data: Some(tweet("7")),
            includes: Includes::default(),
            errors: vec![],
        };
        let err = detail_from_response(&ItemId::from("7"), response).unwrap_err();
        assert!(matches!(err, Error::DetailFetch { ref id, .. } if id == "7"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&TwitterError::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            }),
            Backoff::RetryAfter(Duration::from_secs(3))
        );
        assert_eq!(
            classify(&TwitterError::Server {
                status: 502,
                body: String::new()
            }),
            Backoff::Retry
        );
        assert_eq!(
            classify(&TwitterError::Status {
                status: 400,
                body: String::new()
            }),
            Backoff::Stop
        );
    }

    #[test]
    fn test_source_label_and_query() {
        let config = SourceConfig {
            username: "example".to_string(),
            bearer_token: "t".to_string(),
            api_base_url: twitter_api::DEFAULT_BASE_URL.to_string(),
            filter: crate::config::ScanFilter {
                exclude_reposts: true,
                exclude_replies: false,
                exclude_quotes: true,
            },
            batch_size: 10,
        };
        let http = build_http_client(Duration::from_secs(5)).unwrap();
        let source = TwitterSource::new(http, &config).unwrap();
        assert_eq!(source.name(), "@example");
        assert_eq!(
            source.query.query_string(),
            "from:example -is:retweet -is:quote"
        );
    }

    /// Local API whose user lookup answers with the status named by the
    /// handle; every request is counted.
    async fn spawn_api() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/2/users/by/username/{username}",
            get(move |Path(username): Path<String>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    match username.as_str() {
                        "example" => Json(json!({
                            "data": { "id": "42", "name": "Example", "username": "example" }
                        }))
                        .into_response(),
                        "nobody" => Json(json!({
                            "errors": [{ "title": "Not Found Error" }]
                        }))
                        .into_response(),
                        "revoked" => StatusCode::UNAUTHORIZED.into_response(),
                        _ => StatusCode::SERVICE_UNAVAILABLE.into_response(),
                    }
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), hits)
    }

    fn local_source(base: &str, username: &str) -> TwitterSource {
        let config = SourceConfig {
            username: username.to_string(),
            bearer_token: "t".to_string(),
            api_base_url: base.to_string(),
            filter: crate::config::ScanFilter {
                exclude_reposts: true,
                exclude_replies: true,
                exclude_quotes: true,
            },
            batch_size: 10,
        };
        let http = build_http_client(Duration::from_secs(5)).unwrap();
        TwitterSource::new(http, &config)
            .unwrap()
            .with_retry_policy(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(20),
            })
    }

    #[tokio::test]
    async fn test_verify_account_found() {
        let (base, hits) = spawn_api().await;
        let user = local_source(&base, "example")
            .verify_account()
            .await
            .unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_verify_account_rejected_token_is_fatal() {
        let (base, hits) = spawn_api().await;
        let err = local_source(&base, "revoked")
            .verify_account()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)), "{err:?}");
        assert!(err.is_fatal());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_verify_account_unknown_is_config_error() {
        let (base, hits) = spawn_api().await;
        let err = local_source(&base, "nobody")
            .verify_account()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{err:?}");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_verify_account_retries_server_errors() {
        let (base, hits) = spawn_api().await;
        let err = local_source(&base, "flaky")
            .verify_account()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Scan(_)), "{err:?}");
        assert!(!err.is_fatal());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
