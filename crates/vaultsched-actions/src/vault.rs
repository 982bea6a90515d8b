//! Vault API client and the backup-export action.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use vaultsched_scheduler::{JobAction, VaultConfig};

use crate::error::ActionError;

/// Refresh the token this long before it actually expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(15);

/// Endpoint used when a `vault_export` action does not override it.
const DEFAULT_EXPORT_ENDPOINT: &str = "admin/backup-database";

/// Thin client for the vault's HTTP API.
///
/// Authenticates with the client-credentials grant and caches the access
/// token until shortly before expiry, so back-to-back jobs do not re-login.
pub struct VaultClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3_600
}

impl VaultClient {
    pub fn new(config: &VaultConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token: Mutex::new(None),
        }
    }

    /// POST `endpoint` with a bearer token, logging in first if needed.
    pub async fn trigger_export(&self, endpoint: &str) -> Result<(), ActionError> {
        let token = self.bearer_token().await?;
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));

        let response = self.http.post(&url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            return Err(ActionError::Status {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(())
    }

    async fn bearer_token(&self) -> Result<String, ActionError> {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref()
            && Instant::now() + TOKEN_EXPIRY_MARGIN < cached.expires_at
        {
            return Ok(cached.access_token.clone());
        }

        let device_id = Uuid::new_v4().to_string();
        let params = [
            ("grant_type", "client_credentials"),
            ("scope", "api"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("deviceIdentifier", device_id.as_str()),
            ("deviceType", "7"),
            ("deviceName", "vaultsched"),
        ];

        let url = format!("{}/identity/connect/token", self.base_url);
        let response = self.http.post(&url).form(&params).send().await?;
        if !response.status().is_success() {
            return Err(ActionError::Login(format!(
                "status {}",
                response.status().as_u16()
            )));
        }

        let payload: TokenResponse = response.json().await?;
        let access_token = payload.access_token.clone();
        *guard = Some(CachedToken {
            access_token: payload.access_token,
            expires_at: Instant::now() + Duration::from_secs(payload.expires_in),
        });
        debug!("obtained vault access token");
        Ok(access_token)
    }
}

/// Triggers a vault backup export. The export itself runs server-side, which
/// is what makes this action safe to abandon on timeout.
pub struct VaultExportAction {
    client: Arc<VaultClient>,
    endpoint: String,
}

impl VaultExportAction {
    pub fn new(client: Arc<VaultClient>, endpoint: Option<&str>) -> Self {
        Self {
            client,
            endpoint: endpoint.unwrap_or(DEFAULT_EXPORT_ENDPOINT).to_string(),
        }
    }
}

#[async_trait]
impl JobAction for VaultExportAction {
    async fn invoke(&self) -> Result<(), String> {
        self.client
            .trigger_export(&self.endpoint)
            .await
            .map_err(|e| e.to_string())?;
        info!(endpoint = %self.endpoint, "vault export triggered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn vault_config(base_url: &str) -> VaultConfig {
        VaultConfig {
            base_url: base_url.to_string(),
            client_id: "organization.test".to_string(),
            client_secret: "s3cret".to_string(),
            timeout_secs: 5,
        }
    }

    async fn mock_login(server: &MockServer, expect: u64) {
        Mock::given(method("POST"))
            .and(path("/identity/connect/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=organization.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok-123",
                "expires_in": 3600,
            })))
            .expect(expect)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn export_logs_in_and_posts_with_bearer() {
        let server = MockServer::start().await;
        mock_login(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/admin/backup-database"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = VaultClient::new(&vault_config(&server.uri()));
        client.trigger_export(DEFAULT_EXPORT_ENDPOINT).await.unwrap();
    }

    #[tokio::test]
    async fn token_is_cached_across_invocations() {
        let server = MockServer::start().await;
        mock_login(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/admin/backup-database"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let client = Arc::new(VaultClient::new(&vault_config(&server.uri())));
        let action = VaultExportAction::new(Arc::clone(&client), None);
        action.invoke().await.unwrap();
        action.invoke().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_login_is_a_login_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/connect/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = VaultClient::new(&vault_config(&server.uri()));
        let err = client.trigger_export("admin/backup-database").await.unwrap_err();
        assert!(matches!(err, ActionError::Login(_)));
    }

    #[tokio::test]
    async fn non_success_export_status_is_reported() {
        let server = MockServer::start().await;
        mock_login(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/admin/backup-database"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = VaultClient::new(&vault_config(&server.uri()));
        let err = client.trigger_export("admin/backup-database").await.unwrap_err();
        match err {
            ActionError::Status { status, .. } => assert_eq!(status, 503),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn custom_endpoint_overrides_default() {
        let server = MockServer::start().await;
        mock_login(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/api/organizations/org-1/export"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(VaultClient::new(&vault_config(&server.uri())));
        let action =
            VaultExportAction::new(client, Some("/api/organizations/org-1/export"));
        action.invoke().await.unwrap();
    }
}
