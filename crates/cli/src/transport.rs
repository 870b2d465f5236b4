// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network transport abstraction.
//!
//! Provides a trait-based transport layer that enables:
//! - Real HTTP requests for production ([`HttpTransport`])
//! - Mock transports for unit testing
//! - Decorators such as the offline [`Interceptor`](crate::intercept::Interceptor)

use std::time::Duration;

use outpost_core::{BoxFuture, Method, RequestDescriptor, Response};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Error type for transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Network unreachable, connection refused or reset.
    #[error("network unreachable: {0}")]
    Unreachable(String),

    /// The request did not complete before its deadline.
    #[error("request timed out after {0:?}")]
    TimedOut(Duration),

    /// The request was cancelled by its owner.
    #[error("request cancelled")]
    Cancelled,

    /// The request could not be built (bad url, header or method).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Anything able to issue a request and return a response.
///
/// A response with any status code is a successful exchange; only failures
/// to reach the server are errors.
pub trait Transport: Send + Sync {
    fn send(&self, request: RequestDescriptor) -> BoxFuture<'_, TransportResult<Response>>;

    /// Fails with `InvalidRequest` when `send` could never build `request`,
    /// whatever the network does. Nothing is sent.
    fn check(&self, _request: &RequestDescriptor) -> TransportResult<()> {
        Ok(())
    }
}

/// HTTP transport implementation using reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    /// Base for relative request urls.
    base_url: Option<Url>,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    pub fn new(base_url: Option<&str>, timeout: Duration) -> TransportResult<Self> {
        let base_url = base_url
            .map(Url::parse)
            .transpose()
            .map_err(|e| TransportError::InvalidRequest(format!("base url: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("outpost/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        Ok(HttpTransport {
            client,
            base_url,
            timeout,
        })
    }

    /// Resolve a request url against the base url.
    pub fn resolve(&self, raw: &str) -> TransportResult<Url> {
        match Url::parse(raw) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base
                    .join(raw)
                    .map_err(|e| TransportError::InvalidRequest(format!("{raw}: {e}"))),
                None => Err(TransportError::InvalidRequest(format!(
                    "relative url '{raw}' with no base url configured"
                ))),
            },
            Err(e) => Err(TransportError::InvalidRequest(format!("{raw}: {e}"))),
        }
    }

    fn method(request: &RequestDescriptor) -> TransportResult<reqwest::Method> {
        reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))
    }

    async fn execute(&self, request: RequestDescriptor) -> TransportResult<Response> {
        let url = self.resolve(&request.url)?;
        let method = Self::method(&request)?;

        let mut builder = self.client.request(method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = resp.bytes().await.map_err(|e| self.map_error(e))?;

        Ok(Response::new(status, headers, body.to_vec()))
    }

    fn map_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::TimedOut(self.timeout)
        } else if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else {
            TransportError::Unreachable(e.to_string())
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: RequestDescriptor) -> BoxFuture<'_, TransportResult<Response>> {
        Box::pin(self.execute(request))
    }

    fn check(&self, request: &RequestDescriptor) -> TransportResult<()> {
        self.resolve(&request.url)?;
        Self::method(request)?;
        for (name, value) in &request.headers {
            reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(format!("header '{name}': {e}")))?;
            reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidRequest(format!("header '{name}': {e}")))?;
        }
        Ok(())
    }
}

/// Append a `_=<millis>` query parameter so no intermediary serves the probe
/// from cache.
pub fn cache_busted(raw: &str, millis: i64) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("_", &millis.to_string());
            url.to_string()
        }
        Err(_) => {
            let sep = if raw.contains('?') { '&' } else { '?' };
            format!("{raw}{sep}_={millis}")
        }
    }
}

/// Issue one lightweight connectivity probe.
///
/// The probe is a cache-busting `HEAD` request. It fails on any transport
/// error, on timeout, or when `parent` is cancelled. A probe-local child
/// token is cancelled when the deadline passes, and the in-flight request is
/// dropped with it, so nothing outlives the deadline.
pub async fn probe(
    transport: &dyn Transport,
    url: &str,
    timeout: Duration,
    parent: &CancellationToken,
) -> TransportResult<()> {
    let request = RequestDescriptor::new(
        Method::Head,
        cache_busted(url, chrono::Utc::now().timestamp_millis()),
    )
    .with_header("Cache-Control", "no-store");

    let token = parent.child_token();
    let _guard = token.clone().drop_guard();

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(TransportError::Cancelled),
        _ = tokio::time::sleep(timeout) => {
            token.cancel();
            Err(TransportError::TimedOut(timeout))
        }
        result = transport.send(request) => result.map(|_| ()),
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
