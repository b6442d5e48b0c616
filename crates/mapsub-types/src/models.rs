use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat platforms an account can hold an identity on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Discord,
    /// osu! usernames, as seen through the osu! IRC gateway.
    Osu,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discord => "discord",
            Self::Osu => "osu",
        }
    }

    /// Parse a platform tag. `irc` is accepted as an alias for osu!.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "discord" => Some(Self::Discord),
            "osu" | "irc" => Some(Self::Osu),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discord => f.write_str("Discord"),
            Self::Osu => f.write_str("osu!"),
        }
    }
}

/// An external chat identity: which platform, and the user's id there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub platform: Platform,
    pub id: String,
}

impl Identity {
    pub fn new(platform: Platform, id: impl Into<String>) -> Self {
        Self {
            platform,
            id: id.into(),
        }
    }

    pub fn discord(id: impl Into<String>) -> Self {
        Self::new(Platform::Discord, id)
    }

    pub fn osu(username: impl Into<String>) -> Self {
        Self::new(Platform::Osu, username)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform.as_str(), self.id)
    }
}

/// A logical end user. Always holds at least one platform identity.
///
/// Values handed out by the store are snapshots; changing a field here does
/// not touch the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub discord_id: Option<String>,
    pub osu_username: Option<String>,
    /// Bearer token for linking more identities. Anyone holding it can link.
    pub secret: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Mapper {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Subscriber count for a requested mapper name. Unknown mappers count 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperCount {
    pub name: String,
    pub mapper: Option<Mapper>,
    pub subscribers: u64,
}

/// One row of the popularity ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedMapper {
    pub mapper: Mapper,
    pub subscribers: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_tags() {
        assert_eq!(Platform::from_tag("Discord"), Some(Platform::Discord));
        assert_eq!(Platform::from_tag("irc"), Some(Platform::Osu));
        assert_eq!(Platform::from_tag("osu"), Some(Platform::Osu));
        assert_eq!(Platform::from_tag("telegram"), None);
    }
}
