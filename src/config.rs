use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer};
use std::{fmt, time::Duration};

use crate::audio::track::SearchType;

/// Runtime configuration for the bot.
///
/// Values are resolved in this order, later sources overriding earlier ones:
///
/// 1. Built-in defaults (see the `default_*` functions below)
/// 2. An optional `config.{toml,yaml,json}` file in the working directory
/// 3. Environment variables, including those loaded from a `.env` file
///
/// Environment variable names are the upper-case field names, e.g.
/// `DISCORD_TOKEN`, `SEARCH_TYPE` or `MAX_QUEUE_SIZE`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    #[serde(default, deserialize_with = "optional_id")]
    pub guild_id: Option<u64>, // Para comandos de desarrollo; vacío = global

    // Audio
    #[serde(default)]
    pub search_type: SearchType,
    #[serde(default = "default_volume")]
    pub default_volume: u8,
    #[serde(default)]
    pub max_queue_size: Option<usize>, // None = sin límite
    #[serde(default = "default_max_playlist_size")]
    pub max_playlist_size: usize,
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,

    // APIs (Opcionales)
    pub genius_token: Option<String>,
}

fn default_volume() -> u8 {
    100
}

fn default_max_playlist_size() -> usize {
    100
}

fn default_load_timeout_secs() -> u64 {
    10
}

/// `GUILD_ID=` (vacío) equivale a no configurarlo.
fn optional_id<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OptionalId;

    impl<'de> de::Visitor<'de> for OptionalId {
        type Value = Option<u64>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a numeric Discord id or an empty string")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Self::Value, E> {
            Ok(Some(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Self::Value, E> {
            u64::try_from(value)
                .map(Some)
                .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
            let value = value.trim();
            if value.is_empty() {
                return Ok(None);
            }
            value
                .parse()
                .map(Some)
                .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(OptionalId)
}

impl Config {
    /// Loads and validates the configuration.
    ///
    /// # Errors
    ///
    /// Fails when `DISCORD_TOKEN` is missing, a value cannot be parsed
    /// (including an unknown `SEARCH_TYPE`) or [`Config::validate`] rejects it.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().ignore_empty(true))
            .build()
            .context("Error al leer la configuración")?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: config::Config) -> Result<Self> {
        let config: Self = settings
            .try_deserialize()
            .context("Configuración inválida")?;

        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - The Discord token must not be empty
    /// - Volume must be between 0 and 100
    /// - Load timeout and playlist size must be greater than 0
    /// - A queue limit, when set, must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN must not be empty");
        }

        if self.default_volume > 100 {
            anyhow::bail!("Default volume must be between 0 and 100, got: {}", self.default_volume);
        }

        if self.load_timeout_secs == 0 {
            anyhow::bail!("Load timeout must be greater than 0");
        }

        if self.max_playlist_size == 0 {
            anyhow::bail!("Max playlist size must be greater than 0");
        }

        if self.max_queue_size == Some(0) {
            anyhow::bail!("Max queue size must be greater than 0 when set");
        }

        Ok(())
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Tokens are never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: commands {}\n  \
            Audio: {} search, {}% vol, {}s load timeout\n  \
            Limits: {} queue, {} playlist\n  \
            Lyrics: {}",
            self.guild_id
                .map_or("global".to_string(), |id| format!("in guild {}", id)),
            self.search_type,
            self.default_volume,
            self.load_timeout_secs,
            self.max_queue_size
                .map_or("unbounded".to_string(), |max| max.to_string()),
            self.max_playlist_size,
            if self.genius_token.is_some() { "enabled" } else { "disabled" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings(overrides: &[(&str, &str)]) -> config::Config {
        let mut builder = config::Config::builder();
        for (key, value) in overrides {
            builder = builder
                .set_override(*key, *value)
                .expect("override válido");
        }
        builder.build().expect("configuración construida")
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let config = Config::from_settings(settings(&[("discord_token", "secret")])).unwrap();

        assert_eq!(config.guild_id, None);
        assert_eq!(config.search_type, SearchType::YouTube);
        assert_eq!(config.default_volume, 100);
        assert_eq!(config.max_queue_size, None);
        assert_eq!(config.max_playlist_size, 100);
        assert_eq!(config.load_timeout(), Duration::from_secs(10));
        assert_eq!(config.genius_token, None);
    }

    #[test]
    fn reads_every_field() {
        let config = Config::from_settings(settings(&[
            ("discord_token", "secret"),
            ("guild_id", "42"),
            ("search_type", "soundCloud"),
            ("default_volume", "60"),
            ("max_queue_size", "500"),
            ("max_playlist_size", "25"),
            ("load_timeout_secs", "5"),
            ("genius_token", "genius"),
        ]))
        .unwrap();

        assert_eq!(config.guild_id, Some(42));
        assert_eq!(config.search_type, SearchType::SoundCloud);
        assert_eq!(config.default_volume, 60);
        assert_eq!(config.max_queue_size, Some(500));
        assert_eq!(config.max_playlist_size, 25);
        assert_eq!(config.load_timeout_secs, 5);
        assert_eq!(config.genius_token.as_deref(), Some("genius"));
    }

    #[test]
    fn blank_guild_id_means_global_registration() {
        for blank in ["", "   "] {
            let config = Config::from_settings(settings(&[
                ("discord_token", "secret"),
                ("guild_id", blank),
            ]))
            .unwrap();

            assert_eq!(config.guild_id, None);
            assert!(config.summary().contains("commands global"));
        }
    }

    #[test]
    fn malformed_guild_id_is_rejected() {
        let result = Config::from_settings(settings(&[
            ("discord_token", "secret"),
            ("guild_id", "my-server"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_search_type_is_rejected() {
        let result = Config::from_settings(settings(&[
            ("discord_token", "secret"),
            ("search_type", "spotify"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn missing_token_is_rejected() {
        assert!(Config::from_settings(settings(&[])).is_err());
        assert!(Config::from_settings(settings(&[("discord_token", "  ")])).is_err());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for (key, value) in [
            ("default_volume", "150"),
            ("load_timeout_secs", "0"),
            ("max_playlist_size", "0"),
            ("max_queue_size", "0"),
        ] {
            let result = Config::from_settings(settings(&[("discord_token", "secret"), (key, value)]));
            assert!(result.is_err(), "{} = {} should be rejected", key, value);
        }
    }

    #[test]
    fn summary_never_contains_tokens() {
        let config = Config::from_settings(settings(&[
            ("discord_token", "super-secret-token"),
            ("genius_token", "genius-secret"),
        ]))
        .unwrap();

        let summary = config.summary();
        assert!(!summary.contains("super-secret-token"));
        assert!(!summary.contains("genius-secret"));
        assert!(summary.contains("unbounded queue"));
        assert!(summary.contains("Lyrics: enabled"));
    }
}
