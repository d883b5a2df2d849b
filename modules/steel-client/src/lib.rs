pub mod error;
pub mod types;

pub use error::{Result, SteelError};
pub use types::SessionInfo;

use std::time::Duration;

/// Provisioning a remote browser can take minutes on cold infrastructure.
pub const CREATE_TIMEOUT: Duration = Duration::from_secs(180);
/// Release is fire-and-forget from the caller's point of view.
pub const RELEASE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SteelClient {
    client: reqwest::Client,
    base_url: String,
    create_timeout: Duration,
    release_timeout: Duration,
}

impl SteelClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing HTTP client (connection pool shared with the caller).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            create_timeout: CREATE_TIMEOUT,
            release_timeout: RELEASE_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, create: Duration, release: Duration) -> Self {
        self.create_timeout = create;
        self.release_timeout = release;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Provision a new browser session via `POST /v1/sessions`.
    pub async fn create_session(&self) -> Result<SessionInfo> {
        let endpoint = format!("{}/v1/sessions", self.base_url);
        tracing::info!(endpoint = %endpoint, "Creating browser session");

        let resp = self
            .client
            .post(&endpoint)
            .timeout(self.create_timeout)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SteelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        let session: SessionInfo = serde_json::from_str(&body)?;
        tracing::info!(
            session_id = %session.id,
            websocket_url = %session.websocket_url,
            "Browser session created"
        );
        Ok(session)
    }

    /// Release a session via `POST /v1/sessions/{id}/release`. The response body is ignored.
    pub async fn release_session(&self, session_id: &str) -> Result<()> {
        let endpoint = format!("{}/v1/sessions/{}/release", self.base_url, session_id);
        tracing::info!(session_id, "Releasing browser session");

        let resp = self
            .client
            .post(&endpoint)
            .timeout(self.release_timeout)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SteelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(session_id, "Browser session released");
        Ok(())
    }
}
