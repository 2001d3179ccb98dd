use crate::config::HttpClientConfig;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use reqwest_tracing::TracingMiddleware;

/// Network utilities.
#[derive(Clone)]
pub struct Network {
    /// HTTP client used for OAuth discovery, retries transient failures.
    pub http_client: ClientWithMiddleware,
    /// HTTP client used for OAuth token requests. Authorization codes and rotated refresh tokens
    /// are single-use, so these requests are never retried.
    pub token_client: ClientWithMiddleware,
}

impl Network {
    /// Creates a new `Network` instance.
    pub fn new(http_client: ClientWithMiddleware, token_client: ClientWithMiddleware) -> Self {
        Self {
            http_client,
            token_client,
        }
    }

    /// Creates a new `Network` instance with HTTP clients that trace requests. Only the client
    /// used for idempotent requests retries transient failures.
    pub fn create(config: &HttpClientConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .connection_verbose(config.verbose)
            .build()?;
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.max_retries);

        Ok(Self::new(
            ClientBuilder::new(client.clone())
                .with(TracingMiddleware::default())
                .with(RetryTransientMiddleware::new_with_policy(retry_policy))
                .build(),
            ClientBuilder::new(client)
                .with(TracingMiddleware::default())
                .build(),
        ))
    }
}

#[cfg(test)]
pub mod tests {
    use super::Network;
    use crate::config::HttpClientConfig;
    use httpmock::MockServer;
    use std::time::Duration;

    #[tokio::test]
    async fn retries_transient_failures() -> anyhow::Result<()> {
        let server = MockServer::start();
        let failing_mock = server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/flaky");
            then.status(503);
        });

        let network = Network::create(&HttpClientConfig {
            max_retries: 2,
            ..Default::default()
        })?;
        let response = network.http_client.get(server.url("/flaky")).send().await?;
        assert_eq!(response.status().as_u16(), 503);
        failing_mock.assert_hits(3);

        let network = Network::create(&HttpClientConfig {
            max_retries: 0,
            timeout: Duration::from_secs(5),
            ..Default::default()
        })?;
        let response = network.http_client.get(server.url("/flaky")).send().await?;
        assert_eq!(response.status().as_u16(), 503);
        failing_mock.assert_hits(4);

        Ok(())
    }

    #[tokio::test]
    async fn never_retries_token_requests() -> anyhow::Result<()> {
        let server = MockServer::start();
        let token_mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST).path("/token");
            then.status(503);
        });

        let network = Network::create(&HttpClientConfig {
            max_retries: 2,
            ..Default::default()
        })?;
        let response = network
            .token_client
            .post(server.url("/token"))
            .body("grant_type=authorization_code&code=one-time-code")
            .send()
            .await?;
        assert_eq!(response.status().as_u16(), 503);
        token_mock.assert_hits(1);

        Ok(())
    }
}
