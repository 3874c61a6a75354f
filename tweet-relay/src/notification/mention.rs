//! Group-mention resolution.
//!
//! The target is resolved once at startup by walking an ordered list of
//! tiers; the first tier that yields a target wins. The result is immutable
//! for the rest of the process.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::Result;

/// Who the notification addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MentionTarget {
    /// A specific role, by resolved id.
    Role { id: String },
    /// Every member of the destination.
    Broadcast,
    /// Mentions disabled: plain text only.
    None,
}

impl MentionTarget {
    /// Wire prefix understood by the sink.
    pub fn prefix(&self) -> Option<String> {
        match self {
            MentionTarget::Role { id } => Some(format!("<@&{id}>")),
            MentionTarget::Broadcast => Some("@everyone".to_string()),
            MentionTarget::None => None,
        }
    }

    /// Prefix `headline` with the mention, if any.
    pub fn render(&self, headline: &str) -> String {
        match self.prefix() {
            Some(prefix) => format!("{prefix} {headline}"),
            None => headline.to_string(),
        }
    }
}

/// One step of the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentionTier {
    Role(String),
    Broadcast,
}

/// Role lookup in the single destination group.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Id of the role named exactly `name`, or `None` when absent.
    async fn find_role(&self, name: &str) -> Result<Option<String>>;
}

/// Walks the mention tiers against a [`RoleDirectory`].
pub struct MentionResolver<'a> {
    directory: Option<&'a dyn RoleDirectory>,
}

impl<'a> MentionResolver<'a> {
    pub fn new(directory: Option<&'a dyn RoleDirectory>) -> Self {
        Self { directory }
    }

    /// Tier list for the configured role name. Empty names skip the role tier.
    pub fn tiers(role_name: Option<&str>) -> Vec<MentionTier> {
        let mut tiers = Vec::with_capacity(2);
        if let Some(name) = role_name.map(str::trim).filter(|n| !n.is_empty()) {
            tiers.push(MentionTier::Role(name.to_string()));
        }
        tiers.push(MentionTier::Broadcast);
        tiers
    }

    /// Resolve the target. Never fails: lookup problems fall through to the
    /// next tier with a warning.
    pub async fn resolve(&self, role_name: Option<&str>, enabled: bool) -> MentionTarget {
        if !enabled {
            info!("Mentions disabled; notifications will be sent as plain text");
            return MentionTarget::None;
        }

        for tier in Self::tiers(role_name) {
            if let Some(target) = self.try_tier(&tier).await {
                info!(target = ?target, "Resolved mention target");
                return target;
            }
        }
        MentionTarget::None
    }

    async fn try_tier(&self, tier: &MentionTier) -> Option<MentionTarget> {
        match tier {
            MentionTier::Broadcast => Some(MentionTarget::Broadcast),
            MentionTier::Role(name) => {
                let Some(directory) = self.directory else {
                    warn!("No destination session for role @{}; falling back", name);
                    return None;
                };
                match directory.find_role(name).await {
                    Ok(Some(id)) => {
                        info!("Found role @{} with id {}", name, id);
                        Some(MentionTarget::Role { id })
                    }
                    Ok(None) => {
                        warn!("Role @{} not found in destination; falling back", name);
                        None
                    }
                    Err(e) => {
                        warn!(error = %e, "Role lookup for @{} failed; falling back", name);
                        None
                    }
                }
            }
        }
    }
}
