use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use mapsub_core::{CommandOptions, Links};

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub commands: CommandOptions,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = CommandOptions::default();

        let db_path: PathBuf = get("MAPSUB_DB_PATH").unwrap_or_else(|| "mapsub.db".into()).into();

        let top_default = parse_or(get("MAPSUB_TOP_DEFAULT"), "MAPSUB_TOP_DEFAULT", defaults.top_default)?;
        let top_max = parse_or(get("MAPSUB_TOP_MAX"), "MAPSUB_TOP_MAX", defaults.top_max)?;
        if top_default == 0 || top_max == 0 {
            bail!("MAPSUB_TOP_DEFAULT and MAPSUB_TOP_MAX must be at least 1");
        }
        let reveal_secret_on_init = parse_or(
            get("MAPSUB_REVEAL_SECRET_ON_INIT"),
            "MAPSUB_REVEAL_SECRET_ON_INIT",
            defaults.reveal_secret_on_init,
        )?;

        let links = Links {
            server: get("MAPSUB_SERVER_URL"),
            invite: get("MAPSUB_INVITE_URL"),
            osu: get("MAPSUB_OSU_URL"),
            help: get("MAPSUB_HELP_URL"),
        };

        Ok(Self {
            db_path,
            commands: CommandOptions {
                links,
                top_default,
                top_max,
                reveal_secret_on_init,
            },
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: '{}'", key, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("mapsub.db"));
        assert_eq!(config.commands.top_default, 10);
        assert_eq!(config.commands.top_max, 50);
        assert!(config.commands.reveal_secret_on_init);
        assert!(config.commands.links.help.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("MAPSUB_DB_PATH", "/tmp/subs.db"),
            ("MAPSUB_TOP_MAX", "20"),
            ("MAPSUB_REVEAL_SECRET_ON_INIT", "false"),
            ("MAPSUB_HELP_URL", "https://example.com/help"),
            ("MAPSUB_INVITE_URL", "  "),
        ])
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/subs.db"));
        assert_eq!(config.commands.top_max, 20);
        assert!(!config.commands.reveal_secret_on_init);
        assert_eq!(config.commands.links.help.as_deref(), Some("https://example.com/help"));
        assert!(config.commands.links.invite.is_none());
    }

    #[test]
    fn bad_numbers_are_errors() {
        let err = config_from(&[("MAPSUB_TOP_DEFAULT", "ten")]).unwrap_err();
        assert!(err.to_string().contains("MAPSUB_TOP_DEFAULT"));
    }

    #[test]
    fn zero_top_limits_are_errors() {
        assert!(config_from(&[("MAPSUB_TOP_MAX", "0")]).is_err());
        assert!(config_from(&[("MAPSUB_TOP_DEFAULT", "0")]).is_err());
    }
}
