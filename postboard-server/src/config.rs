use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub database: Database,
}

/// Optional settings files, applied in order on top of the defaults
const SETTINGS_FILES: [&str; 2] = ["settings.toml", "postboard-server/settings.toml"];

/// Environment variables and the setting each one replaces
const ENV_OVERRIDES: [(&str, &str); 3] = [
    ("DATABASE_PATH", "database.path"),
    ("PORT", "server.port"),
    ("HOST", "server.host"),
];

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = SETTINGS_FILES
            .into_iter()
            .map(Path::new)
            .filter(|path| path.exists())
            .fold(Self::defaults()?, |builder, path| {
                builder.add_source(File::from(path).required(false))
            });

        Self::with_overrides(builder, |name| std::env::var(name).ok())?
            .build()?
            .try_deserialize()
    }

    /// Environment values win over files and defaults
    fn with_overrides<F>(
        mut builder: ConfigBuilder<DefaultState>,
        lookup: F,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(var) {
                builder = builder.set_override(key, value)?;
            }
        }
        Ok(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("database.path", "social_media.db")
    }
}
