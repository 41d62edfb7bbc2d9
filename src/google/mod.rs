//! Google Drive and Sheets clients.
//!
//! Both clients share one [`auth::GoogleAuth`] (and therefore one cached
//! token) and one `reqwest::Client` connection pool.
//!
//! The operations the pipeline needs are expressed as the [`DriveApi`] and
//! [`SheetsApi`] traits so runs can be exercised against in-memory fakes.

pub mod auth;
pub mod drive;
pub mod sheets;

pub use auth::{GoogleAuth, ServiceAccountCredentials};
pub use drive::{DriveApi, DriveClient};
pub use sheets::{SheetsApi, SheetsClient, Worksheet};

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use std::sync::Arc;
use std::time::Duration;

/// Build authenticated Drive and Sheets clients from the run configuration.
///
/// Fails with [`CatalogError::CredentialsMissing`] before any request is
/// made when the key file is absent.
pub fn connect(config: &CatalogConfig) -> Result<(DriveClient, SheetsClient), CatalogError> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api_timeout_secs))
        .build()
        .map_err(|e| CatalogError::Internal(format!("HTTP client: {e}")))?;

    let auth = Arc::new(GoogleAuth::from_file(&config.credentials_path, http.clone())?);
    tracing::info!("Using service account {}", auth.client_email());

    Ok((
        DriveClient::new(Arc::clone(&auth), http.clone()),
        SheetsClient::new(auth, http),
    ))
}
