//! SidecarStore — state backend delegating to an out-of-process sidecar.
//!
//! Speaks the sidecar's HTTP state API:
//!
//! ```text
//! GET    /v1.0/state/{store}/{key}   → 200 value | 204 missing
//! POST   /v1.0/state/{store}         ← [{"key", "value", "metadata", "options"}]
//! DELETE /v1.0/state/{store}/{key}
//! ```
//!
//! Metadata travels as `metadata.<name>` query parameters on get/delete and
//! inside the item on save. Payloads are opaque bytes, so values are written
//! as base64 JSON strings and decoded again on read.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, ETAG, USER_AGENT};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::{StoreError, StoreResult};
use crate::store::StateStore;
use crate::types::{Metadata, SaveOptions, StateItem};

/// Default per-request timeout for sidecar calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

type HttpClient = Client<HttpConnector, Full<Bytes>>;

/// One entry of a bulk save request body.
#[derive(Serialize)]
struct SaveItem<'a> {
    key: &'a str,
    value: String,
    #[serde(skip_serializing_if = "is_empty")]
    metadata: &'a Metadata,
    options: &'a SaveOptions,
}

fn is_empty(metadata: &&Metadata) -> bool {
    metadata.is_empty()
}

/// State store backed by a sidecar's HTTP API.
///
/// Reads assume the value was written by this client. A raw value stored by
/// another client that happens to be a JSON string of valid base64 (for
/// example `"abcd"`) is decoded on read and comes back changed.
#[derive(Clone)]
pub struct SidecarStore {
    client: HttpClient,
    base: Url,
    timeout: Duration,
}

impl SidecarStore {
    /// Create a client for the sidecar listening at `base_url`
    /// (e.g. `http://127.0.0.1:3500`).
    pub fn new(base_url: &str) -> StoreResult<Self> {
        let base =
            Url::parse(base_url).map_err(|e| StoreError::Address(format!("{base_url}: {e}")))?;
        if base.scheme() != "http" || base.cannot_be_a_base() {
            return Err(StoreError::Address(format!(
                "{base_url}: only plain http sidecar endpoints are supported"
            )));
        }

        let client = Client::builder(TokioExecutor::new()).build_http();
        debug!(%base, "sidecar state client created");
        Ok(Self {
            client,
            base,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Client for a sidecar on the loopback interface.
    pub fn local(http_port: u16) -> StoreResult<Self> {
        Self::new(&format!("http://127.0.0.1:{http_port}"))
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build `{base}/v1.0/state/{segments...}` with metadata query params.
    fn state_url(&self, segments: &[&str], metadata: &Metadata) -> StoreResult<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| StoreError::Address(self.base.to_string()))?;
            path.pop_if_empty();
            path.extend(["v1.0", "state"]);
            path.extend(segments);
        }

        if !metadata.is_empty() {
            // Sorted so identical calls produce identical URLs.
            let sorted: BTreeMap<_, _> = metadata.iter().collect();
            let mut query = url.query_pairs_mut();
            for (name, value) in sorted {
                query.append_pair(&format!("metadata.{name}"), value);
            }
        }
        Ok(url)
    }

    async fn send(&self, method: Method, url: &Url, body: Bytes) -> StoreResult<Response<Bytes>> {
        let uri: http::Uri = url
            .as_str()
            .parse()
            .map_err(|e: http::uri::InvalidUri| StoreError::Address(e.to_string()))?;

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(USER_AGENT, concat!("statebridge/", env!("CARGO_PKG_VERSION")));
        if !body.is_empty() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let req = builder
            .body(Full::new(body))
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        let exchange = async {
            let resp = self
                .client
                .request(req)
                .await
                .map_err(|e| StoreError::Transport(format!("{method} {url}: {e}")))?;
            let (parts, body) = resp.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| StoreError::Transport(format!("{method} {url}: {e}")))?
                .to_bytes();
            Ok::<_, StoreError>(Response::from_parts(parts, body))
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }
}

fn status_error(resp: &Response<Bytes>) -> StoreError {
    StoreError::Status {
        status: resp.status().as_u16(),
        body: String::from_utf8_lossy(resp.body()).trim().to_string(),
    }
}

/// Undo the base64 wrapping applied on save.
///
/// Bodies that are not a base64 JSON string were written by another client
/// and are returned as-is.
fn decode_value(raw: Bytes) -> Bytes {
    match serde_json::from_slice::<String>(&raw) {
        Ok(encoded) => match BASE64.decode(encoded.as_bytes()) {
            Ok(decoded) => Bytes::from(decoded),
            Err(_) => raw,
        },
        Err(_) => raw,
    }
}

#[async_trait]
impl StateStore for SidecarStore {
    async fn get(&self, store: &str, key: &str, metadata: &Metadata) -> StoreResult<StateItem> {
        let url = self.state_url(&[store, key], metadata)?;
        let resp = self.send(Method::GET, &url, Bytes::new()).await?;

        match resp.status() {
            StatusCode::NO_CONTENT => Ok(StateItem::not_found(key)),
            status if status.is_success() => {
                let etag = resp
                    .headers()
                    .get(ETAG)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let value = decode_value(resp.into_body());
                Ok(StateItem::found(key, value).with_etag(etag))
            }
            _ => Err(status_error(&resp)),
        }
    }

    async fn save(
        &self,
        store: &str,
        key: &str,
        data: Bytes,
        metadata: &Metadata,
        options: &SaveOptions,
    ) -> StoreResult<()> {
        let url = self.state_url(&[store], &Metadata::new())?;
        let items = [SaveItem {
            key,
            value: BASE64.encode(&data),
            metadata,
            options,
        }];
        let body = serde_json::to_vec(&items).map_err(|e| StoreError::Serialize(e.to_string()))?;

        let resp = self.send(Method::POST, &url, Bytes::from(body)).await?;
        if !resp.status().is_success() {
            return Err(status_error(&resp));
        }
        debug!(%store, %key, len = data.len(), "state saved via sidecar");
        Ok(())
    }

    async fn delete(&self, store: &str, key: &str, metadata: &Metadata) -> StoreResult<()> {
        let url = self.state_url(&[store, key], metadata)?;
        let resp = self.send(Method::DELETE, &url, Bytes::new()).await?;
        if !resp.status().is_success() {
            return Err(status_error(&resp));
        }
        debug!(%store, %key, "state deleted via sidecar");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sidecar"
    }
}
