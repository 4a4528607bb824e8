use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

pub const DEFAULT_DISPATCH_API_BASE_URL: &str = "https://api.github.com";

#[derive(Debug, Clone, Deserialize)]
pub struct FormConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub dispatch: DispatchConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: Secret<String>,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    pub api_base_url: String,
}

/// Individual connection parameters, used when no full `MONGODB_URI` is given.
struct MongoParts {
    host: String,
    port: u16,
    username: String,
    password: String,
    database: String,
}

impl MongoParts {
    fn uri(&self) -> String {
        format!(
            "mongodb://{}:{}@{}:{}/{}?authSource=admin",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

impl FormConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let database = get_env("MONGO_INITDB_DATABASE", Some("forms"), is_prod)?;
        let uri = match env::var("MONGODB_URI") {
            Ok(uri) => uri,
            Err(_) => MongoParts {
                host: get_env("MONGO_HOST", Some("localhost"), is_prod)?,
                port: get_env("MONGO_PORT", Some("27017"), is_prod)?
                    .parse()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!("Invalid MONGO_PORT: {}", e))
                    })?,
                username: get_env("MONGO_INITDB_ROOT_USERNAME", Some("changeme"), is_prod)?,
                password: get_env("MONGO_INITDB_ROOT_PASSWORD", Some("changeme"), is_prod)?,
                database: database.clone(),
            }
            .uri(),
        };

        Ok(FormConfig {
            common: common_config,
            mongodb: MongoConfig {
                uri: Secret::new(uri),
                database,
            },
            dispatch: DispatchConfig {
                api_base_url: env::var("DISPATCH_API_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DISPATCH_API_BASE_URL.to_string()),
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
        })
    }
}

impl MongoConfig {
    /// The connection URI with any credentials masked, for logging.
    pub fn redacted_uri(&self) -> String {
        let uri = self.uri.expose_secret();
        match (uri.find("://"), uri.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}***{}", &uri[..scheme_end + 3], &uri[at..])
            }
            _ => uri.clone(),
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
