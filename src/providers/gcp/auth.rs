//! GCP authentication using a service account
//!
//! Signs an RS256 JWT from the service account key and exchanges it for an
//! OAuth2 bearer token. The token is cached with a safety margin inside one
//! `GcpAuth` instance, which is scoped to a single pipeline run.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::providers::credentials::CredentialProvider;
use crate::types::AccessToken;

/// Refresh when the cached token expires within this margin
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// GCP authentication manager
pub struct GcpAuth {
    /// Service account key path
    key_path: PathBuf,
    /// Project ID
    project_id: String,
    http: reqwest::Client,
    /// Cached access token
    token: RwLock<Option<AccessToken>>,
}

impl GcpAuth {
    /// Create from a service account JSON key file
    pub fn from_service_account(key_path: impl AsRef<Path>, project_id: String) -> Result<Self> {
        let key_path = key_path.as_ref().to_path_buf();
        if !key_path.exists() {
            return Err(Error::Auth(format!(
                "Service account key not found: {}",
                key_path.display()
            )));
        }

        Ok(Self {
            key_path,
            project_id,
            http: reqwest::Client::new(),
            token: RwLock::new(None),
        })
    }

    /// Get project ID
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Exchange a freshly signed service account JWT for an access token
    async fn refresh_token(&self) -> Result<AccessToken> {
        let key_content = tokio::fs::read_to_string(&self.key_path).await.map_err(|e| {
            Error::Auth(format!(
                "Failed to read service account key {}: {}",
                self.key_path.display(),
                e
            ))
        })?;

        #[derive(serde::Deserialize)]
        struct ServiceAccountKey {
            client_email: String,
            private_key: String,
            token_uri: String,
        }

        let key: ServiceAccountKey = serde_json::from_str(&key_content)
            .map_err(|e| Error::Auth(format!("Invalid service account key format: {}", e)))?;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;

        let claims = serde_json::json!({
            "iss": key.client_email,
            "scope": "https://www.googleapis.com/auth/cloud-platform",
            "aud": key.token_uri,
            "iat": now,
            "exp": now + 3600,
        });

        use base64::Engine;
        let header = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(r#"{"alg":"RS256","typ":"JWT"}"#.as_bytes());
        let payload =
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());

        let signing_input = format!("{}.{}", header, payload);

        let private_key = key.private_key.replace("\\n", "\n");
        let key_pair = ring::signature::RsaKeyPair::from_pkcs8(
            pem::parse(&private_key)
                .map_err(|e| Error::Auth(format!("Failed to parse private key PEM: {}", e)))?
                .contents(),
        )
        .map_err(|e| Error::Auth(format!("Failed to parse private key: {:?}", e)))?;

        let mut signature = vec![0u8; key_pair.public().modulus_len()];
        key_pair
            .sign(
                &ring::signature::RSA_PKCS1_SHA256,
                &ring::rand::SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|e| Error::Auth(format!("Failed to sign JWT: {:?}", e)))?;

        let signature_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&signature);
        let jwt = format!("{}.{}", signing_input, signature_b64);

        let response = self
            .http
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await
            .map_err(|e| Error::Auth(format!("Token exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "Token exchange failed ({}): {}",
                status, body
            )));
        }

        #[derive(serde::Deserialize)]
        struct TokenResponse {
            access_token: String,
            #[serde(default)]
            expires_in: Option<u64>,
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Failed to parse token response: {}", e)))?;

        let lifetime = Duration::from_secs(token_response.expires_in.unwrap_or(3600));
        Ok(AccessToken::new(
            token_response.access_token,
            Instant::now() + lifetime,
        ))
    }
}

#[async_trait]
impl CredentialProvider for GcpAuth {
    async fn get_token(&self) -> Result<AccessToken> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.expires_within(EXPIRY_MARGIN) {
                    return Ok(token.clone());
                }
            }
        }

        let fresh = self.refresh_token().await?;
        *self.token.write().await = Some(fresh.clone());
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_file_is_an_auth_error() {
        let err = GcpAuth::from_service_account("/nonexistent/sa.json", "demo".to_string())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Auth(ref msg) if msg.contains("/nonexistent/sa.json")));
    }
}
