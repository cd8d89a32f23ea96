use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use dotenvy::dotenv;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub addr: String,
    pub port: u16,
    pub cors_origin: String,
}

#[derive(Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_access_minutes")]
    pub access_token_expires_minutes: i64,
    #[serde(default = "default_refresh_days")]
    pub refresh_token_expires_days: i64,
    /// bcrypt work factor used when storing new passwords.
    #[serde(default = "default_hash_cost")]
    pub password_hash_cost: u32,
}

// Keep the signing secret out of logs.
impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field(
                "access_token_expires_minutes",
                &self.access_token_expires_minutes,
            )
            .field("refresh_token_expires_days", &self.refresh_token_expires_days)
            .field("password_hash_cost", &self.password_hash_cost)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub web: WebConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
}

fn default_max_connections() -> u32 {
    5
}

fn default_access_minutes() -> i64 {
    15
}

fn default_refresh_days() -> i64 {
    7
}

fn default_hash_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

impl AppConfig {
    /// Loads `Config.toml` and overlays `APP_`-prefixed environment variables,
    /// e.g. `APP_DATABASE__URL` or `APP_JWT__SECRET`.
    pub fn from_env() -> Result<Self, figment::Error> {
        dotenv().ok();
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file("Config.toml")) // For non-sensitive defaults
            .merge(Env::prefixed("APP_").split("__"))
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.web.addr, self.web.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_toml_and_defaults_fill_in() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "Config.toml",
                r#"
                [web]
                addr = "127.0.0.1"
                port = 8080
                cors_origin = "http://localhost:8081"

                [database]
                url = "sqlite://inventory.db"
                "#,
            )?;
            jail.set_env("APP_JWT__SECRET", "from-env");
            jail.set_env("APP_WEB__PORT", "9000");

            let config: AppConfig = AppConfig::figment().extract()?;
            assert_eq!(config.web.port, 9000);
            assert_eq!(config.jwt.secret, "from-env");
            assert_eq!(config.jwt.access_token_expires_minutes, 15);
            assert_eq!(config.database.max_connections, 5);
            assert_eq!(config.socket_addr(), "127.0.0.1:9000");
            assert!(!format!("{config:?}").contains("from-env"));
            Ok(())
        });
    }

    #[test]
    fn missing_secret_is_an_error() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "Config.toml",
                r#"
                [web]
                addr = "127.0.0.1"
                port = 8080
                cors_origin = "*"

                [database]
                url = "sqlite::memory:"
                "#,
            )?;
            assert!(AppConfig::figment().extract::<AppConfig>().is_err());
            Ok(())
        });
    }
}
