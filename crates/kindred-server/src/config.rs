use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Duration;

use kindred_api::notify::BrokerConfig;
use kindred_api::tokens::{default_lifetime, parse_lifetime};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-secret-key",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_lifetime: Duration,
    /// `None` allows any origin.
    pub cors_origin: Option<String>,
    /// `None` when no broker is configured or the environment is `test`.
    pub broker: Option<BrokerConfig>,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("KINDRED_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("KINDRED_JWT_SECRET is unset or still a placeholder");
        }

        let jwt_lifetime = match var("KINDRED_JWT_EXPIRATION") {
            Some(raw) => parse_lifetime(&raw)
                .with_context(|| format!("invalid KINDRED_JWT_EXPIRATION '{}'", raw))?,
            None => default_lifetime(),
        };

        let port = match var("KINDRED_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid KINDRED_PORT '{}'", raw))?,
            None => 3000,
        };

        let environment = var("KINDRED_ENV").unwrap_or_else(|| "development".into());
        let broker = match var("KINDRED_BROKER_URL") {
            Some(url) if environment != "test" => Some(BrokerConfig {
                url,
                exchange: var("KINDRED_BROKER_EXCHANGE").unwrap_or_else(|| "kindred.events".into()),
                queue: var("KINDRED_BROKER_QUEUE").unwrap_or_else(|| "messages".into()),
            }),
            _ => None,
        };

        Ok(Self {
            host: var("KINDRED_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("KINDRED_DB_PATH").unwrap_or_else(|| "kindred.db".into()).into(),
            jwt_secret,
            jwt_lifetime,
            cors_origin: var("KINDRED_CORS_ORIGIN").filter(|origin| origin != "*"),
            broker,
            environment,
        })
    }
}
