//! Credential provider trait for bearer token acquisition

use async_trait::async_trait;

use crate::error::Result;
use crate::types::AccessToken;

/// Trait for obtaining bearer tokens for the embedding provider
///
/// Implementations:
/// - `GcpAuth`: service account JWT grant against the GCP token endpoint
///
/// No retry is performed internally; a failed acquisition surfaces
/// `Error::Auth` and the caller decides.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Get a valid access token, refreshing if the cached one is near expiry
    async fn get_token(&self) -> Result<AccessToken>;
}
