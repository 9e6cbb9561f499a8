use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

// Top-level configuration: one section per collaborator
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub identity: IdentityConfig,
    pub payment: PaymentConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Caching is optional: without REDIS_URL the catalog is always read from the store
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub catalog_ttl_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Taken from the service-account credential blob.
    pub project_id: String,
    pub jwks_url: String,
}

impl IdentityConfig {
    pub fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub secret_key: String,
    pub api_base: String,
    /// Base URL the hosted checkout redirects back to.
    pub site_domain: String,
    pub currency: String,
    pub webhook_secret: Option<String>,
}

impl PaymentConfig {
    pub fn success_url(&self) -> String {
        format!(
            "{}/dashboard/payment-success?session_id={{CHECKOUT_SESSION_ID}}",
            self.site_domain.trim_end_matches('/')
        )
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/dashboard/payment-failed", self.site_domain.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("IDENTITY_CREDENTIALS is not a base64-encoded service account: {0}")]
    Credentials(String),
}

#[derive(Deserialize)]
struct ServiceAccount {
    project_id: String,
}

const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source; `from_env` passes
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        Ok(Config {
            app: AppConfig {
                host: vars.or("HOST", "0.0.0.0"),
                port: vars.parse_or("PORT", 3000)?,
                environment: vars.or("ENVIRONMENT", "development"),
                rust_log: vars.or("RUST_LOG", "ticket_market=debug,tower_http=debug"),
                log_format: match vars.or("LOG_FORMAT", "pretty").as_str() {
                    "pretty" => LogFormat::Pretty,
                    "json" => LogFormat::Json,
                    other => {
                        return Err(ConfigError::Invalid {
                            name: "LOG_FORMAT",
                            value: other.to_string(),
                        })
                    }
                },
            },
            database: DatabaseConfig {
                url: vars.required("DATABASE_URL")?,
                pool_size: vars.parse_or("DB_POOL_SIZE", 20)?,
            },
            redis: RedisConfig {
                url: vars.optional("REDIS_URL"),
                catalog_ttl_seconds: vars.parse_or("CATALOG_CACHE_TTL", 300)?,
            },
            identity: IdentityConfig {
                project_id: project_id_from_credentials(&vars.required("IDENTITY_CREDENTIALS")?)?,
                jwks_url: vars.or("IDENTITY_JWKS_URL", DEFAULT_JWKS_URL),
            },
            payment: PaymentConfig {
                secret_key: vars.required("STRIPE_SECRET_KEY")?,
                api_base: vars.or("PAYMENT_API_BASE", "https://api.stripe.com"),
                site_domain: vars.required("SITE_DOMAIN")?,
                currency: vars.or("PAYMENT_CURRENCY", "usd"),
                webhook_secret: vars.optional("PAYMENT_WEBHOOK_SECRET"),
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: vars.parse_or("CIRCUIT_BREAKER_FAILURE_THRESHOLD", 5)?,
                timeout_seconds: vars.parse_or("CIRCUIT_BREAKER_TIMEOUT_SECONDS", 60)?,
            },
        })
    }
}

fn project_id_from_credentials(encoded: &str) -> Result<String, ConfigError> {
    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ConfigError::Credentials(e.to_string()))?;
    let account: ServiceAccount =
        serde_json::from_slice(&decoded).map_err(|e| ConfigError::Credentials(e.to_string()))?;
    Ok(account.project_id)
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(name) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value }),
            None => Ok(default),
        }
    }
}
