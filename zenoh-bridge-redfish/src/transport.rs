//! Fetching Redfish documents.
//!
//! Query endpoints are either absolute Redfish URIs (`/redfish/v1/...`),
//! fetched as-is, or paths such as `/Chassis[0]/Thermal` resolved from the
//! service root. Resolution follows `@odata.id` links and indexes into the
//! `Members` of collections, fetching every document on the way.

use std::future::Future;
use std::time::Duration;

use reqwest::header::ACCEPT;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::loader::REDFISH_URI_PREFIX;
use crate::model::Service;
use crate::selector::{Selector, get_field, index_into};

/// URI of the Redfish service root.
pub const SERVICE_ROOT: &str = "/redfish/v1";

/// Transport error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {uri} failed: {source}")]
    Http {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{uri} returned HTTP {status}")]
    Status { uri: String, status: u16 },

    #[error("Invalid JSON document from {uri}: {source}")]
    Decode {
        uri: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{path}' not found")]
    NotFound { path: String },

    #[error("Index {index} out of range at '{path}'")]
    IndexOutOfRange { path: String, index: usize },

    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

/// Source of the documents a query reads.
pub trait Transport: Send + Sync {
    /// Fetch the document `endpoint` designates on `service`.
    fn fetch(
        &self,
        service: &Service,
        endpoint: &str,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

/// Redfish over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn fetch(&self, service: &Service, endpoint: &str) -> Result<Value, TransportError> {
        let source = ServiceSource {
            client: &self.client,
            base: base_url(&service.host),
            service,
        };
        resolve(&source, endpoint).await
    }
}

/// Base URL of a service. Hosts without a scheme use HTTPS.
pub fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Fetches single documents by URI.
trait JsonSource: Sync {
    fn get(&self, uri: &str) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

struct ServiceSource<'a> {
    client: &'a reqwest::Client,
    base: String,
    service: &'a Service,
}

impl JsonSource for ServiceSource<'_> {
    async fn get(&self, uri: &str) -> Result<Value, TransportError> {
        let url = format!("{}{}", self.base, uri);
        trace!(service = %self.service.name, url = %url, "GET");

        let mut request = self.client.get(&url).header(ACCEPT, "application/json");
        if let Some((user, passwd)) = self.service.credentials() {
            request = request.basic_auth(user, Some(passwd));
        }

        let response = request.send().await.map_err(|source| TransportError::Http {
            uri: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                uri: url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| TransportError::Http {
            uri: url.clone(),
            source,
        })?;

        serde_json::from_slice(&body).map_err(|source| TransportError::Decode { uri: url, source })
    }
}

/// Resolve an endpoint to the document it designates.
async fn resolve<S: JsonSource>(source: &S, endpoint: &str) -> Result<Value, TransportError> {
    if endpoint.starts_with(REDFISH_URI_PREFIX) {
        return source.get(endpoint).await;
    }

    let selector = Selector::parse(endpoint).map_err(|e| TransportError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.reason,
    })?;

    let mut current = source.get(SERVICE_ROOT).await?;
    let mut path = SERVICE_ROOT.to_string();

    for segment in selector.segments() {
        path.push('/');
        path.push_str(&segment.name);

        let child = get_field(&current, &segment.name)
            .cloned()
            .ok_or_else(|| TransportError::NotFound { path: path.clone() })?;
        let mut child = follow_link(source, child).await?;

        if let Some(index) = segment.index {
            let item = index_into(&child, index).cloned().ok_or_else(|| {
                TransportError::IndexOutOfRange {
                    path: path.clone(),
                    index,
                }
            })?;
            path.push_str(&format!("[{}]", index));
            child = follow_link(source, item).await?;
        }

        current = child;
    }

    debug!(endpoint = %endpoint, "Resolved endpoint");
    Ok(current)
}

/// Target of a link object: an object made only of `@`-annotations that
/// carries an `@odata.id`.
fn link_target(node: &Value) -> Option<&str> {
    let object = node.as_object()?;
    if !object.keys().all(|key| key.starts_with('@')) {
        return None;
    }
    object.get("@odata.id")?.as_str()
}

async fn follow_link<S: JsonSource>(source: &S, node: Value) -> Result<Value, TransportError> {
    match link_target(&node) {
        Some(uri) => source.get(uri).await,
        None => Ok(node),
    }
}
