//! OAuth2 access tokens for the Drive API.
//!
//! A service account signs a short-lived RS256 assertion and trades it at
//! the key's `token_uri` for a bearer token. Tokens are cached until shortly
//! before they expire.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::errors::ServiceError;

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_SKEW: Duration = Duration::from_secs(60);

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, ServiceError>;
}

/// Fixed bearer token, for stores that need no exchange.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, ServiceError> {
        Ok(self.0.clone())
    }
}

/// The fields of a Google service-account key file this service uses.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".into()
}

impl ServiceAccountKey {
    pub fn from_json(blob: &str) -> Result<Self, ServiceError> {
        serde_json::from_str(blob).map_err(|e| {
            ServiceError::ConfigurationMissing(format!("service-account credentials unreadable: {e}"))
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    client: reqwest::Client,
    cached: RwLock<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey, client: reqwest::Client) -> Result<Self, ServiceError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            ServiceError::ConfigurationMissing(format!("service-account private key invalid: {e}"))
        })?;
        Ok(Self { key, signing_key, client, cached: RwLock::new(None) })
    }

    fn assertion(&self) -> Result<String, ServiceError> {
        let iat = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: DRIVE_SCOPE.to_string(),
            aud: self.key.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| ServiceError::store("sign assertion", e))
    }

    #[instrument(skip(self), fields(client_email = %self.key.client_email))]
    async fn exchange(&self) -> Result<CachedToken, ServiceError> {
        let assertion = self.assertion()?;
        let resp = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| ServiceError::store("token exchange", e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::store("token exchange", format!("{status}: {body}")));
        }
        let parsed: TokenResponse =
            resp.json().await.map_err(|e| ServiceError::store("token exchange", e))?;
        info!(expires_in = parsed.expires_in, "obtained drive access token");
        let lifetime = Duration::from_secs(parsed.expires_in).saturating_sub(REFRESH_SKEW);
        Ok(CachedToken { token: parsed.access_token, refresh_at: Instant::now() + lifetime })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String, ServiceError> {
        if let Some(c) = self.cached.read().await.as_ref() {
            if Instant::now() < c.refresh_at {
                return Ok(c.token.clone());
            }
        }
        let mut slot = self.cached.write().await;
        // another request may have refreshed while we waited for the lock
        if let Some(c) = slot.as_ref() {
            if Instant::now() < c.refresh_at {
                return Ok(c.token.clone());
            }
        }
        debug!("refreshing drive access token");
        let fresh = self.exchange().await?;
        let token = fresh.token.clone();
        *slot = Some(fresh);
        Ok(token)
    }
}
