//! HTTP transport consumed by document loading and search.
//!
//! [`Transport`] is the narrow seam between twnews and the network: a `GET`
//! returning status, content type, redirect target and body text, and a
//! `HEAD` used to walk redirects. [`ReqwestTransport`] keeps one persistent
//! client per [`Device`] profile, because desktop and mobile requests carry
//! different `User-Agent` headers and some sites serve different markup to
//! each.
//!
//! Redirects are never followed by the client itself; document loading
//! resolves them explicitly so that the final URL can be inspected.

use crate::error::TransportError;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument};

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 4.0.4; Galaxy Nexus Build/IMM76B) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/46.0.2490.76 Mobile Safari/537.36";

/// Device profile a request is issued as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Desktop,
    Mobile,
}

/// The parts of an HTTP response twnews looks at.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// `Location` header, present on redirects.
    pub location: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_json(&self) -> bool {
        match &self.content_type {
            Some(ctype) => ctype.contains("application/json"),
            None => {
                let head = self.body.trim_start();
                head.starts_with('{') || head.starts_with('[')
            }
        }
    }

    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ctype) => ctype.contains("text/html"),
            None => !self.is_json(),
        }
    }
}

/// HTTP access used by document loading and search; one call, one request.
///
/// Implementations must be safe to share between the extractors and
/// searches of one process.
pub trait Transport: Send + Sync {
    /// `GET url` without following redirects.
    fn get(
        &self,
        device: Device,
        url: &str,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;

    /// `HEAD url` without following redirects; the body is always empty.
    fn head(
        &self,
        device: Device,
        url: &str,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// [`Transport`] backed by two persistent `reqwest` clients.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    desktop: Client,
    mobile: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            desktop: build_client(DESKTOP_USER_AGENT)?,
            mobile: build_client(MOBILE_USER_AGENT)?,
        })
    }

    fn client(&self, device: Device) -> &Client {
        match device {
            Device::Desktop => &self.desktop,
            Device::Mobile => &self.mobile,
        }
    }
}

fn build_client(user_agent: &str) -> Result<Client, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml,application/json"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-TW,zh;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(header::USER_AGENT, HeaderValue::from_str(user_agent)?);

    let client = Client::builder()
        .default_headers(headers)
        .redirect(Policy::none())
        .gzip(true)
        .timeout(Duration::from_secs(30))
        .build()?;
    Ok(client)
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

impl Transport for ReqwestTransport {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, device: Device, url: &str) -> Result<HttpResponse, TransportError> {
        let resp = self.client(device).get(url).send().await?;
        let status = resp.status().as_u16();
        let content_type = header_string(resp.headers(), header::CONTENT_TYPE);
        let location = header_string(resp.headers(), header::LOCATION);
        let body = resp.text().await?;
        debug!(status, bytes = body.len(), ?content_type, "GET completed");
        Ok(HttpResponse {
            status,
            content_type,
            location,
            body,
        })
    }

    #[instrument(level = "debug", skip(self))]
    async fn head(&self, device: Device, url: &str) -> Result<HttpResponse, TransportError> {
        let resp = self.client(device).head(url).send().await?;
        Ok(HttpResponse {
            status: resp.status().as_u16(),
            content_type: header_string(resp.headers(), header::CONTENT_TYPE),
            location: header_string(resp.headers(), header::LOCATION),
            body: String::new(),
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Canned-response transport for unit tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Maps exact URLs to responses and records every request.
    ///
    /// Unknown URLs answer `404`. `HEAD` answers a registered redirect, then
    /// the status registered for the URL, and `200` otherwise.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        routes: HashMap<String, HttpResponse>,
        redirects: HashMap<String, String>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn html(mut self, url: &str, body: &str) -> Self {
            self.routes.insert(url.to_string(), response(200, "text/html; charset=utf-8", body));
            self
        }

        pub fn json(mut self, url: &str, body: &str) -> Self {
            self.routes.insert(url.to_string(), response(200, "application/json", body));
            self
        }

        pub fn status(mut self, url: &str, status: u16) -> Self {
            self.routes.insert(url.to_string(), response(status, "text/html", ""));
            self
        }

        pub fn redirect(mut self, from: &str, to: &str) -> Self {
            self.redirects.insert(from.to_string(), to.to_string());
            self
        }

        /// Requests seen so far as `(method, url)` pairs.
        pub fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        pub fn get_count(&self) -> usize {
            self.calls().iter().filter(|(m, _)| m == "GET").count()
        }

        fn record(&self, method: &str, url: &str) {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((method.to_string(), url.to_string()));
            }
        }
    }

    fn response(status: u16, ctype: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            content_type: Some(ctype.to_string()),
            location: None,
            body: body.to_string(),
        }
    }

    impl Transport for MockTransport {
        async fn get(&self, _device: Device, url: &str) -> Result<HttpResponse, TransportError> {
            self.record("GET", url);
            Ok(self
                .routes
                .get(url)
                .cloned()
                .unwrap_or_else(|| response(404, "text/html", "")))
        }

        async fn head(&self, _device: Device, url: &str) -> Result<HttpResponse, TransportError> {
            self.record("HEAD", url);
            match self.redirects.get(url) {
                Some(to) => Ok(HttpResponse {
                    status: 301,
                    content_type: None,
                    location: Some(to.clone()),
                    body: String::new(),
                }),
                None => Ok(HttpResponse {
                    status: self.routes.get(url).map_or(200, |r| r.status),
                    ..HttpResponse::default()
                }),
            }
        }
    }
}
