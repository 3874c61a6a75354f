//! Source feed abstraction.
//!
//! Fetching is split in two stages: [`FeedSource::scan_latest`] cheaply finds
//! the newest qualifying item, and [`FeedSource::fetch_detail`] enriches only
//! the item that turned out to be new.

mod item;
mod twitter;

pub use item::{Author, Item, ItemDetail, ItemId, MediaKind, MediaRef, Metrics};
pub use twitter::TwitterSource;

use async_trait::async_trait;

use crate::Result;

/// A feed of items published by one account.
#[async_trait]
pub trait FeedSource: Send + Sync + 'static {
    /// Human-readable label for logs.
    fn name(&self) -> &str;

    /// Newest qualifying item, or `None` when nothing matches.
    ///
    /// A failed query is an `Err`, never `Ok(None)`.
    async fn scan_latest(&self) -> Result<Option<Item>>;

    /// Re-fetch one item with author and media.
    async fn fetch_detail(&self, id: &ItemId) -> Result<ItemDetail>;
}
