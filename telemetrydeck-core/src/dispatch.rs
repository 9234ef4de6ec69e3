//! HTTP dispatch of signal bodies
//!
//! Serialization and request construction happen on the caller's
//! thread and fail loudly. The exchange itself runs afterwards and never
//! fails: its outcome is written to the diagnostic sink and returned as
//! a [`Delivery`] to whoever awaits it.

use std::sync::{Arc, OnceLock};

use reqwest::header::{HeaderValue, CONTENT_TYPE};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::signal::SignalBody;
use crate::sink::DiagnosticSink;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Outcome of one HTTP exchange with the ingest API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Server answered with a status below 400
    Accepted(u16),
    /// Server answered with a status of 400 or above
    Rejected(u16),
    /// No response (connection refused, timeout, ...)
    TransportFailed(String),
}

impl Delivery {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Delivery::Accepted(_))
    }
}

/// A request ready to be executed, plus the body kept for diagnostics
#[derive(Debug)]
pub(crate) struct PreparedRequest {
    request: reqwest::Request,
    body: Vec<u8>,
}

/// What a background exchange needs from the client
pub(crate) struct ExchangeContext {
    pub http_client: reqwest::Client,
    pub test_mode: bool,
    pub sink: Arc<dyn DiagnosticSink>,
}

/// Serialize `signals` and build the POST request for the client's endpoint
pub(crate) fn prepare(client: &Client, signals: &[SignalBody]) -> Result<PreparedRequest> {
    let body = serde_json::to_vec(signals)?;

    let mut builder = client
        .http_client()
        .post(client.endpoint())
        .header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
        .body(body.clone());

    if let Some(timeout) = client.timeout() {
        builder = builder.timeout(timeout);
    }

    let request = builder
        .build()
        .map_err(|e| Error::RequestConstructionFailed(e.to_string()))?;

    tracing::debug!(
        endpoint = %request.url(),
        bytes = body.len(),
        "Prepared signal request"
    );

    Ok(PreparedRequest { request, body })
}

/// Execute a prepared request and report the outcome.
///
/// The response body is always read to the end, whatever the status.
pub(crate) async fn exchange(ctx: ExchangeContext, prepared: PreparedRequest) -> Delivery {
    let PreparedRequest { request, body } = prepared;
    let url = request.url().clone();

    let response = match ctx.http_client.execute(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(endpoint = %url, error = %e, "Failed to send signal");
            ctx.sink
                .write_line(&format!("failed to send signal to {}: {}", url, e));
            return Delivery::TransportFailed(e.to_string());
        }
    };

    let status = response.status().as_u16();
    let details = response.bytes().await;

    if status < 400 {
        tracing::debug!(endpoint = %url, status, "Signal delivered");
        return Delivery::Accepted(status);
    }

    tracing::warn!(endpoint = %url, status, "Signal rejected by server");

    if ctx.test_mode {
        ctx.sink.write_line(&format!("response status: {}", status));
        ctx.sink
            .write_line(&format!("request body: {}", String::from_utf8_lossy(&body)));
        match details {
            Ok(details) => ctx
                .sink
                .write_line(&format!("details: {}", String::from_utf8_lossy(&details))),
            Err(e) => ctx
                .sink
                .write_line(&format!("details: failed to read response body: {}", e)),
        }
    }

    Delivery::Rejected(status)
}

/// Run the exchange on a detached task nobody waits for.
///
/// Uses the caller's tokio runtime when there is one, so the task lives
/// as long as that runtime. Synchronous callers get the shared
/// background runtime instead.
pub(crate) fn spawn_detached(ctx: ExchangeContext, prepared: PreparedRequest) {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        drop(handle.spawn(async move {
            exchange(ctx, prepared).await;
        }));
        return;
    }

    match background_runtime() {
        Some(runtime) => {
            drop(runtime.spawn(async move {
                exchange(ctx, prepared).await;
            }));
        }
        None => ctx
            .sink
            .write_line("failed to send signal: no async runtime available"),
    }
}

/// Process-wide runtime for sends issued outside of any tokio runtime
fn background_runtime() -> Option<&'static tokio::runtime::Runtime> {
    static RUNTIME: OnceLock<Option<tokio::runtime::Runtime>> = OnceLock::new();

    RUNTIME
        .get_or_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("telemetrydeck-send")
                .enable_all()
                .build()
                .map_err(|e| tracing::warn!(error = %e, "Failed to start background runtime"))
                .ok()
        })
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::build_signal;

    #[test]
    fn test_malformed_endpoint_fails_locally() {
        let client = Client::builder("app").endpoint("not a url").build().unwrap();
        let signals = build_signal(&client, "App.launched", None).unwrap();

        let err = prepare(&client, &signals).unwrap_err();
        assert!(matches!(err, Error::RequestConstructionFailed(_)));
    }

    #[test]
    fn test_prepared_request_shape() {
        let client = Client::builder("app")
            .endpoint("http://127.0.0.1:9/v2/")
            .build()
            .unwrap();
        let signals = build_signal(&client, "App.launched", None).unwrap();

        let prepared = prepare(&client, &signals).unwrap();
        assert_eq!(prepared.request.method(), &reqwest::Method::POST);
        assert_eq!(prepared.request.url().as_str(), "http://127.0.0.1:9/v2/");
        assert_eq!(
            prepared.request.headers()[CONTENT_TYPE],
            "application/json; charset=utf-8"
        );

        let sent: Vec<SignalBody> = serde_json::from_slice(&prepared.body).unwrap();
        assert_eq!(sent, signals);
    }

    #[test]
    fn test_send_outside_runtime_returns_immediately() {
        // Port 9 (discard) is normally closed; the failure lands in the sink later.
        let client = Client::builder("app")
            .endpoint("http://127.0.0.1:9/v2/")
            .build()
            .unwrap();
        assert!(client.send_signal("App.launched", None).is_ok());
    }
}
