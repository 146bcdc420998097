use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::core::config::AppConfig;
use crate::core::error::UsageError;
use crate::core::models::usage::UsageResponse;

pub const DEFAULT_USAGE_URL: &str = "https://api.anthropic.com/api/oauth/usage";
pub const DEFAULT_USER_AGENT: &str = "claude-code/2.0.32";
pub const DEFAULT_BETA: &str = "oauth-2025-04-20";

const ACCEPT_VALUE: &str = "application/json, text/plain, */*";
/// Pause between connection attempts while waiting for connectivity.
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Fetches one usage snapshot for a bearer token.
#[async_trait]
pub trait UsageFetching: Send + Sync {
    async fn fetch_usage(&self, token: &str) -> Result<UsageResponse, UsageError>;
}

/// Validate that a resolved endpoint URL uses HTTPS.
///
/// Must pass before the bearer token is sent anywhere.
pub fn validate_endpoint(url: &str) -> anyhow::Result<()> {
    if !url.starts_with("https://") {
        anyhow::bail!("usage endpoint must use HTTPS, got: {}", url);
    }
    Ok(())
}

/// HTTP client for the OAuth usage endpoint.
pub struct UsageClient {
    client: reqwest::Client,
    endpoint: String,
    user_agent: String,
    beta: String,
    connectivity_wait: Duration,
}

impl UsageClient {
    /// Build a client from configuration. The endpoint must be HTTPS.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        validate_endpoint(&config.api.endpoint)?;
        let timeout = config.settings.request_timeout();
        let mut client = Self::with_endpoint(&config.api.endpoint, timeout)?;
        client.user_agent = config.api.user_agent.clone();
        client.beta = config.api.beta.clone();
        Ok(client)
    }

    /// Build a client for an arbitrary endpoint without scheme validation.
    pub fn with_endpoint(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            beta: DEFAULT_BETA.to_string(),
            connectivity_wait: timeout,
        })
    }

    /// How long connection-level failures are re-attempted before giving up.
    #[cfg(test)]
    pub fn connectivity_wait(mut self, wait: Duration) -> Self {
        self.connectivity_wait = wait;
        self
    }

    fn request(&self, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(&self.endpoint)
            .header(ACCEPT, ACCEPT_VALUE)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, &self.user_agent)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header("anthropic-beta", &self.beta)
    }

    /// Send the request, pausing and re-connecting while the host is unreachable.
    /// Only connect errors are re-attempted; any response ends the loop.
    async fn send_waiting_for_connectivity(
        &self,
        token: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let deadline = Instant::now() + self.connectivity_wait;
        loop {
            match self.request(token).send().await {
                Err(e) if e.is_connect() && Instant::now() + CONNECT_RETRY_DELAY <= deadline => {
                    debug!(error = %e, "usage endpoint unreachable, waiting for connectivity");
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl UsageFetching for UsageClient {
    async fn fetch_usage(&self, token: &str) -> Result<UsageResponse, UsageError> {
        debug!(endpoint = %self.endpoint, "fetching usage");
        let response = self.send_waiting_for_connectivity(token).await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "usage endpoint returned non-200 status");
            return Err(UsageError::Http(status.as_u16()));
        }

        let body = response.bytes().await?;
        let usage: UsageResponse = serde_json::from_slice(&body)?;
        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> UsageClient {
        UsageClient::with_endpoint(
            &format!("{}/api/oauth/usage", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap()
        .connectivity_wait(Duration::ZERO)
    }

    #[test]
    fn validate_endpoint_accepts_https() {
        assert!(validate_endpoint(DEFAULT_USAGE_URL).is_ok());
    }

    #[test]
    fn validate_endpoint_rejects_http() {
        let err = validate_endpoint("http://evil.com").unwrap_err();
        assert!(err.to_string().contains("must use HTTPS"));
    }

    #[test]
    fn validate_endpoint_rejects_no_scheme() {
        assert!(validate_endpoint("api.anthropic.com/api/oauth/usage").is_err());
        assert!(validate_endpoint("").is_err());
    }

    #[test]
    fn from_config_rejects_http_endpoint() {
        let mut config = AppConfig::default();
        config.api.endpoint = "http://localhost/usage".to_string();
        assert!(UsageClient::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn fetch_sends_headers_and_decodes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/oauth/usage"))
            .and(header("authorization", "Bearer tok_abc"))
            .and(header("accept", ACCEPT_VALUE))
            .and(header("content-type", "application/json"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .and(header("anthropic-beta", DEFAULT_BETA))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "five_hour": { "utilization": 42.0, "resets_at": "2025-12-04T19:15:00Z" },
                "seven_day": { "utilization": 10.0, "resets_at": null },
                "extra_usage": {
                    "is_enabled": true,
                    "monthly_limit": 5000,
                    "used_credits": 250.0,
                    "utilization": 5.0
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let usage = client_for(&server).fetch_usage("tok_abc").await.unwrap();
        assert_eq!(usage.five_hour.unwrap().utilization, 42.0);
        assert_eq!(usage.seven_day.unwrap().utilization, 10.0);
        assert!(usage.extra_usage.unwrap().is_enabled);
    }

    #[tokio::test]
    async fn zero_configured_timeout_still_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let mut config = AppConfig::default();
        config.settings.request_timeout_secs = 0;
        let client = UsageClient::with_endpoint(
            &format!("{}/api/oauth/usage", server.uri()),
            config.settings.request_timeout(),
        )
        .unwrap();

        let usage = client.fetch_usage("tok").await.unwrap();
        assert_eq!(usage, UsageResponse::default());
    }

    #[tokio::test]
    async fn fetch_maps_unauthorized_to_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_usage("stale").await.unwrap_err();
        assert_eq!(err, UsageError::Http(401));
    }

    #[tokio::test]
    async fn fetch_treats_other_success_codes_as_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_usage("tok").await.unwrap_err();
        assert_eq!(err, UsageError::Http(204));
    }

    #[tokio::test]
    async fn fetch_does_not_retry_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_usage("tok").await.unwrap_err();
        assert_eq!(err, UsageError::Http(503));
    }

    #[tokio::test]
    async fn fetch_maps_schema_mismatch_to_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "five_hour": { "utilization": "high" } })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_usage("tok").await.unwrap_err();
        assert!(matches!(err, UsageError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn fetch_maps_non_json_body_to_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_usage("tok").await.unwrap_err();
        assert!(matches!(err, UsageError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn fetch_maps_refused_connection_to_network_error() {
        let port = free_port();

        let client = UsageClient::with_endpoint(
            &format!("http://127.0.0.1:{}/api/oauth/usage", port),
            Duration::from_secs(5),
        )
        .unwrap()
        .connectivity_wait(Duration::ZERO);

        let err = client.fetch_usage("tok").await.unwrap_err();
        assert!(matches!(err, UsageError::Network(_)));
    }

    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn fetch_waits_for_server_to_come_up() {
        let port = free_port();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();

        let server_task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let listener = std::net::TcpListener::bind(("127.0.0.1", port)).unwrap();
            let server = MockServer::builder().listener(listener).start().await;
            Mock::given(method("GET"))
                .and(path("/api/oauth/usage"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "five_hour": { "utilization": 7.0, "resets_at": null }
                })))
                .mount(&server)
                .await;
            let _ = done_rx.await;
        });

        let client = UsageClient::with_endpoint(
            &format!("http://127.0.0.1:{}/api/oauth/usage", port),
            Duration::from_secs(5),
        )
        .unwrap()
        .connectivity_wait(Duration::from_secs(10));

        let usage = client.fetch_usage("tok").await.unwrap();
        assert_eq!(usage.five_hour.unwrap().utilization, 7.0);

        let _ = done_tx.send(());
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn fetch_gives_up_when_wait_runs_out() {
        let port = free_port();
        let client = UsageClient::with_endpoint(
            &format!("http://127.0.0.1:{}/api/oauth/usage", port),
            Duration::from_secs(5),
        )
        .unwrap()
        .connectivity_wait(Duration::from_secs(3));

        let started = Instant::now();
        let err = client.fetch_usage("tok").await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, UsageError::Network(_)));
        // One pause fits in the budget, a second would overrun it.
        assert!(elapsed >= CONNECT_RETRY_DELAY, "gave up too early: {:?}", elapsed);
        assert!(elapsed < CONNECT_RETRY_DELAY * 2, "waited past budget: {:?}", elapsed);
    }
}
