use config::ConfigError;

use crate::auth::parse_duration;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Token signing and lifetime settings
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_token_ttl: String,  // duration string (e.g., "15m")
    pub refresh_token_ttl: String, // duration string (e.g., "7d")
    #[serde(default)]
    pub secure_cookies: bool,
}

impl AuthSettings {
    /// Reject settings that would make every token unusable or interchangeable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            return Err(ConfigError::Message(
                "auth secrets must not be empty".to_string(),
            ));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::Message(
                "access and refresh secrets must differ".to_string(),
            ));
        }
        for ttl in [&self.access_token_ttl, &self.refresh_token_ttl] {
            parse_duration(ttl).map_err(|e| ConfigError::Message(e.to_string()))?;
        }
        Ok(())
    }

    /// Access token lifetime in seconds
    pub fn access_token_seconds(&self) -> i64 {
        parse_duration(&self.access_token_ttl).unwrap_or(0)
    }

    /// Refresh token lifetime in seconds
    pub fn refresh_token_seconds(&self) -> i64 {
        parse_duration(&self.refresh_token_ttl).unwrap_or(0)
    }
}

/// Load settings from `configuration.{yaml,toml,json}` and `APP_*` environment variables
///
/// Environment variables use `__` as the nesting separator,
/// e.g. `APP_AUTH__ACCESS_SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.auth.validate()?;
    Ok(settings)
}
