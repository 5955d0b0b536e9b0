// HTTP transport: request/response shapes and the reqwest-backed executor.
//
// The session never talks to `reqwest` directly. It builds `HttpRequest`s
// and hands them to an `HttpTransport`, which returns the status and body
// for every answer the server gives -- error statuses included. Only
// connection-level failures surface as `Err`.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::Error;

const USER_AGENT: &str = concat!("homeguard/", env!("CARGO_PKG_VERSION"));
const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// TLS verification mode (api-level mirror of core's TlsVerification).
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (test servers, intercepting proxies).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

// ── Request / response ───────────────────────────────────────────────

/// HTTP verbs used by the installation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// A fully-described outbound request.
///
/// The target is a parsed [`Url`], so a request without a target cannot
/// be constructed. A body requires a `Content-Type` header; see
/// [`validate`](Self::validate).
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: Url) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::Delete, url)
    }

    /// Add a header. Fails if `value` contains bytes not allowed in a header.
    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self, Error> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::InvalidRequest(format!("invalid value for header {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Attach a raw body. The caller is responsible for the content type.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `payload` as the JSON body and set the matching content type.
    pub fn json(self, payload: &impl Serialize) -> Result<Self, Error> {
        let body = serde_json::to_string(payload)
            .map_err(|e| Error::InvalidRequest(format!("failed to encode body: {e}")))?;
        Ok(self.header(CONTENT_TYPE, JSON_CONTENT_TYPE)?.body(body))
    }

    /// Check transport preconditions before sending.
    pub fn validate(&self) -> Result<(), Error> {
        if self.body.is_some() && !self.headers.contains_key(CONTENT_TYPE) {
            return Err(Error::InvalidRequest(format!(
                "{} {} carries a body but no Content-Type header",
                self.method, self.url
            )));
        }
        Ok(())
    }
}

/// Status and body of a server answer, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The installation API signals success with exactly `200`.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

// ── Transport trait ──────────────────────────────────────────────────

/// Executes requests against the remote service.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return the server's answer.
    ///
    /// Non-2xx statuses are returned as `Ok`; only requests that could not
    /// be sent, or whose response could not be read, yield `Err`.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, Error>;
}

/// [`HttpTransport`] backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client()?,
        })
    }

    /// Wrap a pre-built client.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        request.validate()?;
        debug!("{} {}", request.method, request.url);

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .http
            .request(method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(Error::Transport)?;

        Ok(HttpResponse { status, body })
    }
}
