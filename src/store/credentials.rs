//! OAuth2 access tokens for the Firestore REST API
//!
//! Tokens come from, in order: a fixed `access_token`, a service account key
//! file (signed JWT exchanged at the key's `token_uri`), or the GCE metadata
//! server. Minted tokens are cached until shortly before they expire.

use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{StoreError, StoreResult};
use crate::config::StoreConfig;

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: u64 = 3600;
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct ServiceAccountFile {
    #[serde(rename = "type")]
    kind: String,
    client_email: String,
    private_key: String,
    token_uri: String,
}

/// Service account key able to sign token requests
pub struct ServiceAccount {
    client_email: String,
    token_uri: Url,
    key: EncodingKey,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

impl ServiceAccount {
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let file: ServiceAccountFile = serde_json::from_str(json)
            .map_err(|e| StoreError::Unavailable(format!("Invalid service account key: {}", e)))?;
        if file.kind != "service_account" {
            return Err(StoreError::Unavailable(format!(
                "Unsupported credential type {}",
                file.kind
            )));
        }
        let key = EncodingKey::from_rsa_pem(file.private_key.as_bytes())
            .map_err(|e| StoreError::Unavailable(format!("Invalid service account private key: {}", e)))?;
        let token_uri = Url::parse(&file.token_uri)
            .map_err(|e| StoreError::Unavailable(format!("Invalid token_uri {}: {}", file.token_uri, e)))?;

        Ok(Self {
            client_email: file.client_email,
            token_uri,
            key,
        })
    }

    pub fn from_file(path: &str) -> StoreResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Unavailable(format!("Cannot read credentials file {}: {}", path, e)))?;
        Self::from_json(&json)
    }

    fn assertion(&self) -> StoreResult<String> {
        let iat = jsonwebtoken::get_current_timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: DATASTORE_SCOPE,
            aud: self.token_uri.as_str(),
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| StoreError::Unavailable(format!("Failed to sign token request: {}", e)))
    }
}

pub enum TokenSource {
    /// No `Authorization` header, as the emulator expects
    Anonymous,
    Static(String),
    ServiceAccount(ServiceAccount),
    MetadataServer(Url),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct TokenProvider {
    source: TokenSource,
    client: Client,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(source: TokenSource, client: Client) -> Self {
        Self {
            source,
            client,
            cached: RwLock::new(None),
        }
    }

    pub fn from_config(config: &StoreConfig, client: Client) -> StoreResult<Self> {
        let configured = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        let source = if configured(&config.emulator_host).is_some() {
            TokenSource::Anonymous
        } else if let Some(token) = configured(&config.access_token) {
            TokenSource::Static(token)
        } else if let Some(path) = configured(&config.credentials_file) {
            TokenSource::ServiceAccount(ServiceAccount::from_file(&path)?)
        } else {
            let url = Url::parse(&config.metadata_url).map_err(|e| {
                StoreError::Unavailable(format!("Invalid metadata URL {}: {}", config.metadata_url, e))
            })?;
            TokenSource::MetadataServer(url)
        };

        Ok(Self::new(source, client))
    }

    pub fn describe(&self) -> &'static str {
        match self.source {
            TokenSource::Anonymous => "no credentials",
            TokenSource::Static(_) => "static access token",
            TokenSource::ServiceAccount(_) => "service account key",
            TokenSource::MetadataServer(_) => "metadata server",
        }
    }

    /// Current bearer token, minting a new one when the cached token is stale
    pub async fn token(&self) -> StoreResult<Option<String>> {
        match self.source {
            TokenSource::Anonymous => return Ok(None),
            TokenSource::Static(ref token) => return Ok(Some(token.clone())),
            TokenSource::ServiceAccount(_) | TokenSource::MetadataServer(_) => {}
        }

        if let Some(token) = fresh(self.cached.read().await.as_ref()) {
            return Ok(Some(token));
        }

        let mut cached = self.cached.write().await;
        // Another request may have refreshed while this one waited for the lock
        if let Some(token) = fresh(cached.as_ref()) {
            return Ok(Some(token));
        }

        let minted = self.fetch().await?;
        let lifetime = Duration::from_secs(minted.expires_in.unwrap_or(TOKEN_LIFETIME_SECS));
        tracing::debug!("Minted Firestore access token from {}, valid {:?}", self.describe(), lifetime);

        *cached = Some(CachedToken {
            value: minted.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        });
        Ok(Some(minted.access_token))
    }

    /// Drop the cached token so the next request mints a new one
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    async fn fetch(&self) -> StoreResult<TokenResponse> {
        let request = match self.source {
            TokenSource::ServiceAccount(ref account) => {
                let assertion = account.assertion()?;
                self.client
                    .post(account.token_uri.clone())
                    .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            }
            TokenSource::MetadataServer(ref url) => {
                self.client.get(url.clone()).header("Metadata-Flavor", "Google")
            }
            TokenSource::Anonymous | TokenSource::Static(_) => {
                return Err(StoreError::Unavailable(
                    "No token endpoint configured".to_string(),
                ))
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Token request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Unavailable(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Malformed token response: {}", e)))
    }
}

fn fresh(cached: Option<&CachedToken>) -> Option<String> {
    cached
        .filter(|token| Instant::now() < token.refresh_at)
        .map(|token| token.value.clone())
}
