//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and overridden by `GROWPAY__*` environment
//! variables (`GROWPAY__APP__LEVEL=debug`, `GROWPAY__DATABASE__SQLITE=growpay.db`).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
}

impl Settings {
    pub fn new(file: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .set_default("database", "memory")?
            .add_source(File::with_name(file).required(false))
            .add_source(Environment::with_prefix("GROWPAY").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Connection string for sea-orm.
    pub fn database_url(&self) -> String {
        match &self.database {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}
