//! The execution client: HTTP transport, retry orchestration, and health
//! tracking.
//!
//! One [`Client`] serves any number of concurrent requests against any
//! provider. Atomic calls go through the retry policy; streaming calls get
//! a single attempt and hand back a typed chunk stream.

use crate::config::ClientConfig;
use crate::providers::{PreparedRequest, Provider};
use crate::request::Request;
use crate::response::{Response, StreamingChunk};
use crate::retry;
use crate::{Error, Result};
use std::sync::RwLock;
use std::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Typed stream of decoded chunks from a streaming call.
pub type ChunkStream = ReceiverStream<StreamingChunk>;

#[derive(Debug)]
struct Health {
    healthy: bool,
    since: Instant,
}

/// Protocol execution client.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Client {
    config: ClientConfig,
    http: reqwest::Client,
    health: RwLock<Health>,
}

impl Client {
    /// Builds a client with its own connection pool sized from
    /// configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .pool_max_idle_per_host(config.connection_pool_size)
            .build()?;

        Ok(Self {
            config,
            http,
            health: RwLock::new(Health {
                healthy: true,
                since: Instant::now(),
            }),
        })
    }

    /// Builds a client with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Executes an atomic request and returns the fully parsed response.
    ///
    /// Transient failures (HTTP 429/502/503/504, connect and timeout
    /// errors) are retried with exponential backoff per the client's retry
    /// configuration. Cancelling the token aborts immediately, including
    /// mid-backoff.
    pub async fn execute(
        &self,
        request: &dyn Request,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let body = request.marshal()?;
        let headers = request.headers();
        let provider = request.provider();
        let protocol = request.protocol();

        let body = &body;
        let headers = &headers;
        retry::retry(cancel, &self.config.retry, move || async move {
            let prepared = provider.prepare_request(protocol, body.clone(), headers)?;
            let response = self.send(provider.as_ref(), &prepared).await?;

            // Health reflects the whole attempt, so a 2xx with an
            // undecodable body still counts as a failure.
            match provider.process_response(response, protocol).await {
                Ok(parsed) => {
                    self.set_healthy(true);
                    Ok(parsed)
                }
                Err(err) => {
                    self.set_healthy(false);
                    Err(err)
                }
            }
        })
        .await
    }

    /// Executes a streaming request and returns a bounded stream of
    /// decoded chunks.
    ///
    /// Fails fast if the protocol cannot stream. Streaming calls are never
    /// retried. The caller is responsible for requesting streaming output
    /// in the wire body (typically a `stream: true` option). The stream
    /// ends after the backend's terminal marker, on body exhaustion, after
    /// one final error chunk on a hard read failure, or when the token is
    /// cancelled.
    pub async fn execute_stream(
        &self,
        request: &dyn Request,
        cancel: &CancellationToken,
    ) -> Result<ChunkStream> {
        let protocol = request.protocol();
        if !protocol.supports_streaming() {
            return Err(Error::StreamingUnsupported(protocol));
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let body = request.marshal()?;
        let provider = request.provider();
        let prepared = provider.prepare_stream_request(protocol, body, &request.headers())?;
        let response = self.send(provider.as_ref(), &prepared).await?;

        let status = response.status();
        if !status.is_success() {
            self.set_healthy(false);
            let body = response.text().await.unwrap_or_default();
            return Err(Error::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown"),
                body,
            ));
        }

        let rx = provider.process_stream_response(response, protocol, cancel.clone())?;
        self.set_healthy(true);
        Ok(ReceiverStream::new(rx))
    }

    /// The coarse health flag: `false` after a transport failure or server
    /// error, `true` after any subsequent success. Last write wins.
    pub fn is_healthy(&self) -> bool {
        self.health.read().expect("health lock poisoned").healthy
    }

    async fn send(
        &self,
        provider: &dyn Provider,
        prepared: &PreparedRequest,
    ) -> Result<reqwest::Response> {
        let mut headers = prepared.headers.clone();
        provider.set_headers(&mut headers);

        let mut builder = self.http.post(&prepared.url).body(prepared.body.clone());
        for (name, value) in &headers {
            builder = builder.header(name, value);
        }

        match builder.send().await {
            Ok(response) => Ok(response),
            Err(e) => {
                self.set_healthy(false);
                Err(Error::Http(e))
            }
        }
    }

    fn set_healthy(&self, healthy: bool) {
        let mut health = self.health.write().expect("health lock poisoned");
        if health.healthy != healthy {
            tracing::debug!(
                healthy,
                stable_for_ms = health.since.elapsed().as_millis() as u64,
                "client health changed"
            );
            health.since = Instant::now();
        }
        health.healthy = healthy;
    }
}
