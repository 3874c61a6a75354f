use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Response, StatusCode, header::HeaderMap};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Result, TwitterError};
use crate::model::{SearchResponse, TweetResponse, User, UserResponse};

/// Public API host.
pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

/// Smallest and largest `max_results` accepted by recent search.
const MIN_RESULTS: u32 = 10;
const MAX_RESULTS: u32 = 100;

const TWEET_FIELDS: &str = "created_at,public_metrics,attachments,referenced_tweets";
const USER_FIELDS: &str = "profile_image_url,username,name";
const MEDIA_FIELDS: &str = "url,preview_image_url,type";
const EXPANSIONS: &str = "author_id,attachments.media_keys";

/// Recent-search query for posts authored by one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub from: String,
    pub exclude_retweets: bool,
    pub exclude_replies: bool,
    pub exclude_quotes: bool,
    pub max_results: u32,
}

impl SearchQuery {
    pub fn from_user(username: impl Into<String>) -> Self {
        Self {
            from: username.into(),
            exclude_retweets: true,
            exclude_replies: true,
            exclude_quotes: true,
            max_results: MIN_RESULTS,
        }
    }

    pub fn exclude_retweets(mut self, exclude: bool) -> Self {
        self.exclude_retweets = exclude;
        self
    }

    pub fn exclude_replies(mut self, exclude: bool) -> Self {
        self.exclude_replies = exclude;
        self
    }

    pub fn exclude_quotes(mut self, exclude: bool) -> Self {
        self.exclude_quotes = exclude;
        self
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    /// Render the search operator string, e.g. `from:user -is:retweet`.
    pub fn query_string(&self) -> String {
        let mut query = format!("from:{}", self.from);
        if self.exclude_retweets {
            query.push_str(" -is:retweet");
        }
        if self.exclude_replies {
            query.push_str(" -is:reply");
        }
        if self.exclude_quotes {
            query.push_str(" -is:quote");
        }
        query
    }

    fn clamped_max_results(&self) -> u32 {
        self.max_results.clamp(MIN_RESULTS, MAX_RESULTS)
    }
}

/// API v2 client authenticated with an app-only bearer token.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    client: Client,
    base_url: Url,
    bearer_token: String,
}

impl TwitterClient {
    pub fn new(client: Client, base_url: &str, bearer_token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
            bearer_token: bearer_token.into(),
        })
    }

    /// Search recent posts. Results are ordered newest first.
    pub async fn search_recent(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let query_string = query.query_string();
        let max_results = query.clamped_max_results().to_string();
        debug!(query = %query_string, "Searching recent posts");

        self.get(
            "2/tweets/search/recent",
            &[
                ("query", query_string.as_str()),
                ("max_results", max_results.as_str()),
                ("tweet.fields", TWEET_FIELDS),
                ("expansions", EXPANSIONS),
                ("user.fields", USER_FIELDS),
                ("media.fields", MEDIA_FIELDS),
            ],
        )
        .await
    }

    /// Fetch one post with author and media expansions.
    pub async fn tweet(&self, id: &str) -> Result<TweetResponse> {
        debug!(tweet_id = %id, "Fetching post detail");

        let response: TweetResponse = self
            .get(
                &format!("2/tweets/{id}"),
                &[
                    ("tweet.fields", TWEET_FIELDS),
                    ("expansions", EXPANSIONS),
                    ("user.fields", USER_FIELDS),
                    ("media.fields", MEDIA_FIELDS),
                ],
            )
            .await?;

        if response.data.is_none() {
            let reason = response
                .errors
                .first()
                .map(|p| p.to_string())
                .unwrap_or_else(|| format!("post {id}"));
            return Err(TwitterError::NotFound(reason));
        }
        Ok(response)
    }

    /// Look up an account by handle.
    pub async fn user_by_username(&self, username: &str) -> Result<User> {
        let response: UserResponse = self
            .get(
                &format!("2/users/by/username/{username}"),
                &[("user.fields", USER_FIELDS)],
            )
            .await?;

        match response.data {
            Some(user) => Ok(user),
            None => Err(TwitterError::NotFound(
                response
                    .errors
                    .first()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| format!("user @{username}")),
            )),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| TwitterError::Api(format!("invalid path {path}: {e}")))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .query(params)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.bytes().await?;
        trace!(len = body.len(), "Received API response");
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Request paths are joined relative to the base, so a path prefix such as
/// a proxy mount point must end with `/` to survive the join.
fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| TwitterError::Api(format!("invalid base url {base_url}: {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Map non-success responses onto the error taxonomy.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = parse_retry_after(response.headers());
        return Err(TwitterError::RateLimited { retry_after });
    }

    let body = response.text().await.unwrap_or_default();
    let status_code = status.as_u16();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TwitterError::Unauthorized {
            status: status_code,
            body,
        },
        StatusCode::NOT_FOUND => TwitterError::NotFound(body),
        s if s.is_server_error() => TwitterError::Server {
            status: status_code,
            body,
        },
        _ => TwitterError::Status {
            status: status_code,
            body,
        },
    })
}

/// Wait hint for a 429: `retry-after` seconds, else the `x-rate-limit-reset`
/// epoch timestamp relative to now.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header_u64 = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };

    if let Some(secs) = header_u64("retry-after") {
        return Some(Duration::from_secs(secs));
    }

    let reset = header_u64("x-rate-limit-reset")?;
    let now = Utc::now().timestamp().max(0) as u64;
    Some(Duration::from_secs(reset.saturating_sub(now)))
}
