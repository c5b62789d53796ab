//! Secret Manager REST client
//!
//! Authenticates with the workload's default service account via the
//! instance metadata server and reads the latest secret version.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;

use super::credentials::{CredentialError, SecretStore};

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const SECRET_MANAGER_URL: &str = "https://secretmanager.googleapis.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct AccessResponse {
    payload: SecretPayload,
}

#[derive(Deserialize)]
struct SecretPayload {
    data: String,
}

/// Secret store backed by Google Secret Manager
pub struct GcpSecretManager {
    http: Client,
    project_id: String,
}

impl GcpSecretManager {
    pub fn new(project_id: impl Into<String>) -> Result<Self, CredentialError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            project_id: project_id.into(),
        })
    }

    fn access_url(&self, secret: &str) -> String {
        format!(
            "{}/projects/{}/secrets/{}/versions/latest:access",
            SECRET_MANAGER_URL, self.project_id, secret
        )
    }

    async fn access_token(&self) -> Result<String, CredentialError> {
        let token = self
            .http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?
            .error_for_status()?
            .json::<TokenResponse>()
            .await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl SecretStore for GcpSecretManager {
    async fn access_latest(&self, secret: &str) -> Result<String, CredentialError> {
        let token = self.access_token().await?;

        let response = self
            .http
            .get(self.access_url(secret))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CredentialError::Status {
                secret: secret.to_owned(),
                status: status.as_u16(),
            });
        }

        let body = response.json::<AccessResponse>().await?;
        decode_payload(secret, &body.payload.data)
    }
}

fn decode_payload(secret: &str, data: &str) -> Result<String, CredentialError> {
    let invalid = |reason: String| CredentialError::Payload {
        secret: secret.to_owned(),
        reason,
    };

    let bytes = STANDARD.decode(data).map_err(|e| invalid(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| invalid(e.to_string()))
}
