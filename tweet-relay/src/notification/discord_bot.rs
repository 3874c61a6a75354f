//! Discord bot session used only to look up the mention role.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::mention::RoleDirectory;
use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartialGuild {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildRole {
    pub id: String,
    pub name: String,
}

/// An authenticated bot session.
pub struct DiscordBot {
    client: Client,
    base_url: String,
    token: String,
}

impl DiscordBot {
    /// Establish the session by validating the token against `/users/@me`.
    ///
    /// Any failure here is an [`Error::Auth`].
    pub async fn connect(client: Client, base_url: &str, token: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let response = client
            .get(format!("{base_url}/users/@me"))
            .header(reqwest::header::AUTHORIZATION, format!("Bot {token}"))
            .send()
            .await
            .map_err(|e| Error::auth(format!("could not reach Discord: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::auth("Discord rejected the bot token"));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "Discord session failed: {status} - {body}"
            )));
        }

        let user: BotUser = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("unexpected Discord session response: {e}")))?;
        info!("Discord bot logged in as {} ({})", user.username, user.id);

        Ok(Self {
            client,
            base_url,
            token: token.to_string(),
        })
    }

    /// Guilds the bot belongs to, in the order Discord returns them.
    pub async fn guilds(&self) -> Result<Vec<PartialGuild>> {
        self.get_json("/users/@me/guilds").await
    }

    pub async fn roles(&self, guild_id: &str) -> Result<Vec<GuildRole>> {
        self.get_json(&format!("/guilds/{guild_id}/roles")).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bot {}", self.token),
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::MentionResolution(format!(
                "GET {path} failed: {status} - {body}"
            )));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl RoleDirectory for DiscordBot {
    async fn find_role(&self, name: &str) -> Result<Option<String>> {
        let guilds = self.guilds().await?;
        let Some(guild) = guilds.first() else {
            warn!("Bot has not joined any guild");
            return Ok(None);
        };
        if guilds.len() > 1 {
            warn!(
                "Bot is in {} guilds; using the first one ({})",
                guilds.len(),
                guild.name
            );
        }

        let roles = self.roles(&guild.id).await?;
        Ok(find_role_id(&roles, name))
    }
}

fn find_role_id(roles: &[GuildRole], name: &str) -> Option<String> {
    roles.iter().find(|r| r.name == name).map(|r| r.id.clone())
}
