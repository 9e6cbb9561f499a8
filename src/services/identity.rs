//! Bearer-token verification against the identity provider's published keys.

use async_trait::async_trait;
use jsonwebtoken::{
    decode, decode_header,
    jwk::{Jwk, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::IdentityConfig;
use crate::models::user::normalize_email;

/// The verified caller. Carries no role: roles live in the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("token header has no key id")]
    MissingKeyId,
    #[error("no published key with id {0}")]
    UnknownKey(String),
    #[error("token carries no email claim")]
    MissingEmail,
    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(#[from] reqwest::Error),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    email: Option<String>,
}

/// Verifies ID tokens issued for one project. Keys are fetched lazily and
/// refetched once whenever a token names a key id that is not cached.
pub struct JwksVerifier {
    http: reqwest::Client,
    jwks_url: String,
    validation: Validation,
    keys: RwLock<JwkSet>,
}

impl JwksVerifier {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        Self::with_algorithms(config, &[Algorithm::RS256])
    }

    pub fn with_algorithms(
        config: &IdentityConfig,
        algorithms: &[Algorithm],
    ) -> Result<Self, IdentityError> {
        let mut validation = Validation::new(algorithms.first().copied().unwrap_or(Algorithm::RS256));
        validation.algorithms = algorithms.to_vec();
        validation.set_audience(&[config.project_id.as_str()]);
        validation.set_issuer(&[config.issuer()]);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            jwks_url: config.jwks_url.clone(),
            validation,
            keys: RwLock::new(JwkSet { keys: Vec::new() }),
        })
    }

    async fn cached_key(&self, kid: &str) -> Option<Jwk> {
        self.keys.read().await.find(kid).cloned()
    }

    async fn refresh_keys(&self) -> Result<(), IdentityError> {
        debug!(url = %self.jwks_url, "fetching identity signing keys");
        let set: JwkSet = self
            .http
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        *self.keys.write().await = set;
        Ok(())
    }

    async fn key_for(&self, kid: &str) -> Result<Jwk, IdentityError> {
        if let Some(jwk) = self.cached_key(kid).await {
            return Ok(jwk);
        }
        self.refresh_keys().await?;
        self.cached_key(kid)
            .await
            .ok_or_else(|| IdentityError::UnknownKey(kid.to_string()))
    }
}

#[async_trait]
impl IdentityVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, IdentityError> {
        let header = decode_header(token)?;
        let kid = header.kid.ok_or(IdentityError::MissingKeyId)?;
        let jwk = self.key_for(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk)?;

        let claims = decode::<Claims>(token, &key, &self.validation)
            .map_err(|e| {
                warn!("token rejected: {}", e);
                e
            })?
            .claims;

        let email = claims.email.ok_or(IdentityError::MissingEmail)?;
        Ok(Principal {
            uid: claims.sub,
            email: normalize_email(&email),
        })
    }
}
