//! HTTP gateways to the graph service, the event store and the broker.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use tracing::{debug, info, warn};

use ktwin_core::{Broker, EventStore, GraphSource, KtwinError, KtwinResult, TwinGraph, WireMessage};

use super::cloudevents;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Request Policy
// =============================================================================

/// Timeout and retry settings shared by every gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPolicy {
    /// Timeout of a single request.
    pub timeout: Duration,
    /// Retry an idempotent read once after a transport error or a 5xx.
    pub retry_reads: bool,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry_reads: false,
        }
    }
}

impl RequestPolicy {
    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables the single read retry.
    pub fn with_retry_reads(mut self, retry_reads: bool) -> Self {
        self.retry_reads = retry_reads;
        self
    }
}

// =============================================================================
// Shared Client
// =============================================================================

/// A reqwest client configured with a [`RequestPolicy`].
///
/// Cloning is cheap; all gateways built from one instance share a pool.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    policy: RequestPolicy,
}

impl HttpGateway {
    /// Creates a client with the given policy.
    pub fn new(policy: RequestPolicy) -> reqwest::Result<Self> {
        let client = ClientBuilder::new().timeout(policy.timeout).build()?;
        Ok(Self { client, policy })
    }

    /// Returns the policy.
    pub fn policy(&self) -> &RequestPolicy {
        &self.policy
    }

    async fn get(&self, url: &str) -> reqwest::Result<Response> {
        let attempts = if self.policy.retry_reads { 2 } else { 1 };
        let mut attempt = 1;

        loop {
            let result = self.client.get(url).send().await;
            let retryable = match &result {
                Ok(resp) => resp.status().is_server_error(),
                Err(_) => true,
            };

            if !retryable || attempt >= attempts {
                return result;
            }

            debug!(url = %url, attempt, "Retrying read");
            attempt += 1;
        }
    }

    async fn post_event(&self, url: &str, msg: &WireMessage) -> KtwinResult<reqwest::Result<Response>> {
        let headers = cloudevents::to_headers(msg)?;
        Ok(self
            .client
            .post(url)
            .headers(headers)
            .body(msg.data.clone())
            .send()
            .await)
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

// =============================================================================
// Graph Source
// =============================================================================

/// Fetches graph fragments from the graph service.
///
/// `GET <base>/<instance>`; a 404 means the service does not know the
/// instance.
#[derive(Debug, Clone)]
pub struct HttpGraphSource {
    gateway: HttpGateway,
    base_url: String,
}

impl HttpGraphSource {
    /// Creates a graph source for the service at `base_url`.
    pub fn new(gateway: HttpGateway, base_url: impl Into<String>) -> Self {
        Self {
            gateway,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl GraphSource for HttpGraphSource {
    async fn fetch_fragment(&self, instance_name: &str) -> KtwinResult<Option<TwinGraph>> {
        let url = join(&self.base_url, instance_name);

        let resp = self
            .gateway
            .get(&url)
            .await
            .map_err(|e| KtwinError::graph_load(instance_name, e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            warn!(instance = %instance_name, status = status.as_u16(), "Graph service returned an error");
            return Err(KtwinError::graph_load(
                instance_name,
                format!("status code: {}", status.as_u16()),
            ));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| KtwinError::graph_load(instance_name, e.to_string()))?;
        let graph = TwinGraph::from_json(&body)
            .map_err(|e| KtwinError::graph_load(instance_name, format!("invalid graph: {e}")))?;

        Ok(Some(graph))
    }
}

// =============================================================================
// Event Store
// =============================================================================

/// Reads and writes the latest event of each twin in the event store.
#[derive(Debug, Clone)]
pub struct HttpEventStore {
    gateway: HttpGateway,
    base_url: String,
}

impl HttpEventStore {
    /// Creates a store client for the service at `base_url`.
    pub fn new(gateway: HttpGateway, base_url: impl Into<String>) -> Self {
        Self {
            gateway,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl EventStore for HttpEventStore {
    async fn get_latest(
        &self,
        interface_name: &str,
        instance_id: &str,
    ) -> KtwinResult<Option<WireMessage>> {
        let url = join(
            &self.base_url,
            &format!("api/v1/twin-events/{interface_name}/{instance_id}/latest"),
        );

        let resp = self
            .gateway
            .get(&url)
            .await
            .map_err(|e| KtwinError::StoreUnavailable(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!(interface = %interface_name, instance = %instance_id, "No stored event");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(KtwinError::StoreUnavailable(format!(
                "GET {url} returned status code {}",
                status.as_u16()
            )));
        }

        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| KtwinError::StoreUnavailable(e.to_string()))?;

        cloudevents::from_http(&headers, &body).map(Some)
    }

    async fn put(&self, msg: WireMessage) -> KtwinResult<()> {
        let url = join(&self.base_url, "api/v1/twin-events");

        let resp = self
            .gateway
            .post_event(&url, &msg)
            .await?
            .map_err(|e| KtwinError::StoreUnavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(KtwinError::StoreUnavailable(format!(
                "POST {url} returned status code {}",
                status.as_u16()
            )));
        }

        debug!(event_type = %msg.event_type, source = %msg.source, "Stored twin event");
        Ok(())
    }
}

// =============================================================================
// Broker
// =============================================================================

/// Publishes events to the broker ingress.
#[derive(Debug, Clone)]
pub struct HttpBroker {
    gateway: HttpGateway,
    base_url: String,
}

impl HttpBroker {
    /// Creates a broker client for the ingress at `base_url`.
    pub fn new(gateway: HttpGateway, base_url: impl Into<String>) -> Self {
        Self {
            gateway,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Broker for HttpBroker {
    async fn publish(&self, msg: WireMessage) -> KtwinResult<()> {
        let url = join(&self.base_url, "");

        let resp = self
            .gateway
            .post_event(&url, &msg)
            .await?
            .map_err(|e| KtwinError::BrokerUnavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(KtwinError::BrokerUnavailable(format!(
                "status code {}",
                status.as_u16()
            )));
        }

        info!(event_type = %msg.event_type, source = %msg.source, "Published event");
        Ok(())
    }
}
