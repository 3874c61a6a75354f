//! Builds the embed posted for a delivered item.
//!
//! Pure and deterministic: the same item, author and media always produce
//! the same payload.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::source::{Author, Item, MediaRef};

/// Brand accent (Twitter blue).
pub const ACCENT_COLOR: u32 = 0x1DA1F2;
pub const FOOTER_TEXT: &str = "Twitter";
pub const FOOTER_ICON_URL: &str =
    "https://cdn.jsdelivr.net/gh/devicons/devicon/icons/twitter/twitter-original.svg";
pub const HEADLINE: &str = "🐦 **New tweet!**";

const SITE_URL: &str = "https://twitter.com";

/// Short links from the source's own shortener; redundant once media is attached.
static SHORT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://t\.co/\w+").expect("valid short link regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
    pub icon_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub color: u32,
    pub author: EmbedAuthor,
    /// Discord rejects an embed with an empty description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub footer: EmbedFooter,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

/// Destination-ready message body, minus the mention prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub headline: String,
    pub embed: Embed,
}

pub fn item_url(handle: &str, id: &str) -> String {
    format!("{SITE_URL}/{handle}/status/{id}")
}

pub fn profile_url(handle: &str) -> String {
    format!("{SITE_URL}/{handle}")
}

/// Format one item for the sink.
pub fn build_payload(item: &Item, author: &Author, media: &[MediaRef]) -> NotificationPayload {
    let description = if media.is_empty() {
        item.text.clone()
    } else {
        strip_short_links(&item.text)
    };

    let fields = item
        .metrics
        .map(|m| {
            vec![
                field("❤️ Likes", m.likes),
                field("🔄 Retweets", m.reposts),
                field("💬 Replies", m.replies),
            ]
        })
        .unwrap_or_default();

    let image = media
        .iter()
        .filter(|m| m.is_photo())
        .find_map(|m| m.url.clone())
        .map(|url| EmbedImage { url });

    NotificationPayload {
        headline: HEADLINE.to_string(),
        embed: Embed {
            color: ACCENT_COLOR,
            author: EmbedAuthor {
                name: format!("{} (@{})", author.display_name, author.handle),
                icon_url: author.avatar_url.clone(),
                url: profile_url(&author.handle),
            },
            description,
            url: item_url(&author.handle, item.id.as_str()),
            timestamp: item.created_at.map(|t| t.to_rfc3339()),
            footer: EmbedFooter {
                text: FOOTER_TEXT.to_string(),
                icon_url: FOOTER_ICON_URL.to_string(),
            },
            fields,
            image,
        },
    }
}

fn strip_short_links(text: &str) -> String {
    SHORT_LINK_RE.replace_all(text, "").trim().to_string()
}

fn field(name: &str, value: u64) -> EmbedField {
    EmbedField {
        name: name.to_string(),
        value: value.to_string(),
        inline: true,
    }
}
