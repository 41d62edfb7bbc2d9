//! Service-account authentication for the Google REST APIs.
//!
//! A signed RS256 JWT is exchanged at the key's `token_uri` for a bearer
//! token (the OAuth "JWT bearer" grant). The token is cached in-process and
//! refreshed shortly before it expires.

use crate::error::CatalogError;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::debug;

/// Scopes needed to list, download and move Drive files and edit Sheets.
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN_SECS: u64 = 60;

/// The fields of a service-account JSON key that the token exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountCredentials {
    /// Read a key file, failing fast when it is absent.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::CredentialsMissing {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| CatalogError::InvalidCredentials {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Self::from_json(&text).map_err(|detail| CatalogError::InvalidCredentials {
            path: path.to_path_buf(),
            detail,
        })
    }

    fn from_json(text: &str) -> Result<Self, String> {
        let creds: Self = serde_json::from_str(text).map_err(|e| e.to_string())?;
        if creds.client_email.is_empty() || creds.private_key.is_empty() {
            return Err("client_email and private_key must be present".into());
        }
        Ok(creds)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    exp: u64,
    iat: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    refresh_at: u64,
}

/// Issues bearer tokens for one service account.
pub struct GoogleAuth {
    credentials: ServiceAccountCredentials,
    source: PathBuf,
    http: reqwest::Client,
    token: RwLock<Option<CachedToken>>,
}

impl GoogleAuth {
    /// Load the key at `path`. Returns [`CatalogError::CredentialsMissing`]
    /// before any network traffic when the file does not exist.
    pub fn from_file(path: &Path, http: reqwest::Client) -> Result<Self, CatalogError> {
        let credentials = ServiceAccountCredentials::from_file(path)?;
        debug!("Loaded service account {}", credentials.client_email);
        Ok(Self {
            credentials,
            source: path.to_path_buf(),
            http,
            token: RwLock::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.credentials.client_email
    }

    /// Current bearer token, exchanging a fresh assertion when needed.
    pub async fn access_token(&self) -> Result<String, CatalogError> {
        let now = unix_now()?;
        {
            let token = self.token.read().await;
            if let Some(ref t) = *token {
                if now < t.refresh_at {
                    return Ok(t.value.clone());
                }
            }
        }

        let fresh = self.exchange(now).await?;
        let value = fresh.access_token.clone();
        *self.token.write().await = Some(CachedToken {
            value: fresh.access_token,
            refresh_at: now + fresh.expires_in.saturating_sub(EXPIRY_MARGIN_SECS),
        });
        Ok(value)
    }

    async fn exchange(&self, now: u64) -> Result<TokenResponse, CatalogError> {
        let jwt = sign_assertion(&self.credentials, now).map_err(|detail| {
            CatalogError::InvalidCredentials {
                path: self.source.clone(),
                detail,
            }
        })?;

        let response = self
            .http
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CatalogError::AuthFailed {
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::AuthFailed {
                detail: format!("HTTP {status}: {body}"),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| CatalogError::AuthFailed {
            detail: format!("unreadable token response: {e}"),
        })?;
        debug!("Obtained access token valid for {}s", token.expires_in);
        Ok(token)
    }
}

fn unix_now() -> Result<u64, CatalogError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d: Duration| d.as_secs())
        .map_err(|e| CatalogError::Internal(format!("system clock before 1970: {e}")))
}

fn sign_assertion(creds: &ServiceAccountCredentials, now: u64) -> Result<String, String> {
    let claims = Claims {
        iss: &creds.client_email,
        scope: SCOPES.join(" "),
        aud: &creds.token_uri,
        exp: now + 3600,
        iat: now,
    };
    let key = EncodingKey::from_rsa_pem(creds.private_key.as_bytes())
        .map_err(|e| format!("private_key is not an RSA PEM key: {e}"))?;
    encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| e.to_string())
}
