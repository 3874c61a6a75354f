//! Typed client for the subset of the X/Twitter API v2 needed to follow a
//! single account: recent search, single post lookup and user lookup.

pub mod client;
pub mod error;
pub mod model;

pub use client::{DEFAULT_BASE_URL, SearchQuery, TwitterClient};
pub use error::{Result, TwitterError};
pub use model::{
    ApiProblem, Attachments, Includes, Media, Meta, PublicMetrics, ReferencedTweet, SearchResponse,
    Tweet, TweetResponse, User, UserResponse,
};
