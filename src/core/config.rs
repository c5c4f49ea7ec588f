use std::time::Duration;

use mongodb::options::ClientOptions;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};

#[derive(Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub postgres: PostgresConfig,
    pub mongo: MongoConfig,
    pub jwt_auth_config: JwtAuthConfig,
    pub uploads: UploadConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self, config::ConfigError> {
        let base_path = std::env::current_dir()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        let config_dir = base_path.join("src/core/configurations");

        let app_environment: Environment = std::env::var("ACHIEVEMENTS_APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .try_into()
            .map_err(config::ConfigError::Message)?;

        let configurations = config::Config::builder()
            .add_source(
                config::File::from(config_dir.join(app_environment.as_str())).required(true),
            )
            // APP_POSTGRES__PASSWORD=... overrides postgres.password
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        configurations.try_deserialize()
    }
}

#[derive(Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Deserialize, Clone)]
pub struct PostgresConfig {
    pub username: String,
    pub password: Secret<String>,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime_secs: u64,
    pub acquire_timeout_secs: u64,
}

impl PostgresConfig {
    pub fn connect(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(self.password.expose_secret())
            .port(self.port)
            .database(&self.database_name);

        options.log_statements(tracing::log::LevelFilter::Trace)
    }

    /// Lazily connecting pool; connections are opened on first use.
    pub fn pool(&self) -> PgPool {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .max_lifetime(Duration::from_secs(self.max_lifetime_secs))
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .connect_lazy_with(self.connect())
    }
}

#[derive(Deserialize, Clone)]
pub struct MongoConfig {
    pub uri: Secret<String>,
    pub database_name: String,
    pub connect_timeout_secs: u64,
}

impl MongoConfig {
    pub async fn connect(&self) -> Result<mongodb::Database, mongodb::error::Error> {
        let mut options = ClientOptions::parse(self.uri.expose_secret()).await?;
        options.app_name = Some("student_achievements".to_string());
        options.connect_timeout = Some(Duration::from_secs(self.connect_timeout_secs));
        options.server_selection_timeout = Some(Duration::from_secs(self.connect_timeout_secs));

        let client = mongodb::Client::with_options(options)?;
        Ok(client.database(&self.database_name))
    }
}

#[derive(Deserialize, Clone)]
pub struct JwtAuthConfig {
    pub secret: Secret<String>,
    /// Minutes.
    pub token_expiration_time: i64,
    /// Minutes.
    pub refresh_token_expiration_time: i64,
}

#[derive(Deserialize, Clone)]
pub struct UploadConfig {
    pub directory: String,
    pub public_base_url: String,
    pub max_file_size: usize,
}

pub enum Environment {
    Local,
    Sandbox,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not supported environment. Use either `local`, `sandbox` or `production` ",
                other
            )),
        }
    }
}
