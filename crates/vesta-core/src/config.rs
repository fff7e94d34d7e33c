use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Fired-job channel capacity shared by the engine and the delivery task.
pub const FIRED_CHANNEL_CAPACITY: usize = 256;

/// Top-level config (vesta.toml + VESTA_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VestaConfig {
    /// IANA timezone name used for all user-facing date handling,
    /// e.g. "America/Buenos_Aires".
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// Guilds the slash commands are registered in.
    #[serde(default)]
    pub guild_ids: Vec<u64>,
}

impl Default for VestaConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            discord: DiscordConfig {
                bot_token: String::new(),
                guild_ids: Vec::new(),
            },
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl VestaConfig {
    /// Load config from a TOML file with VESTA_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.vesta/vesta.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: VestaConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("VESTA_").split("_"))
            .extract()
            .map_err(|e| crate::error::VestaError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.vesta/vesta.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timezone_is_utc() {
        let config = VestaConfig::default();
        assert_eq!(config.timezone, "UTC");
        assert!(config.discord.guild_ids.is_empty());
    }

    #[test]
    fn toml_round_trip() {
        let toml = r#"
            timezone = "America/Buenos_Aires"

            [discord]
            bot_token = "token-123"
            guild_ids = [42, 43]
        "#;
        let config: VestaConfig = Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .unwrap();
        assert_eq!(config.timezone, "America/Buenos_Aires");
        assert_eq!(config.discord.guild_ids, vec![42, 43]);
    }
}
