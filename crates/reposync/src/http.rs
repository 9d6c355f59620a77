//! HTTP transport boundary.
//!
//! Every outbound request goes through [`HttpTransport`] so the API client and
//! notifiers can be driven by an in-memory transport in tests.

use async_trait::async_trait;
use thiserror::Error;

/// HTTP methods the sync subsystem sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Header name/value pairs. Lookups through [`header_get`] ignore case.
pub type HttpHeaders = Vec<(String, String)>;

/// An outbound request, transport-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL, already checked by the caller.
    pub url: String,
    pub headers: HttpHeaders,
    /// Empty for GET.
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// A bodiless GET.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// A POST carrying `body` as is; set `Content-Type` with [`with_header`](Self::with_header).
    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }
}

/// A fully buffered response.
///
/// Any status is returned as `Ok`; deciding which statuses are failures is
/// left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }
}

/// Failure to get any response at all.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("http transport error: {0}")]
    Transport(String),

    #[error("no mock response registered for {method} {url}")]
    NoMockResponse { method: String, url: String },
}

/// Sends one request and buffers the whole response.
///
/// Implementations must not retry or follow redirects.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// First header value matching `name`, ignoring ASCII case.
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

pub mod reqwest_transport {
    use super::*;

    use std::time::Duration as StdDuration;

    /// Transport backed by a shared `reqwest::Client`.
    #[derive(Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }

        /// Build a client with a whole-request timeout.
        ///
        /// Redirects are not followed: a redirect target has not passed the
        /// URL safety check the API client applies before sending.
        pub fn with_timeout(timeout: StdDuration) -> Result<Self, HttpError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .map_err(|e| HttpError::Transport(e.to_string()))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let method = match request.method {
                HttpMethod::Get => reqwest::Method::GET,
                HttpMethod::Post => reqwest::Method::POST,
            };

            let mut builder = self.client.request(method, &request.url);
            for (k, v) in request.headers {
                builder = builder.header(&k, &v);
            }
            if !request.body.is_empty() {
                builder = builder.body(request.body);
            }

            let resp = builder
                .send()
                .await
                .map_err(|e| HttpError::Transport(e.to_string()))?;

            let status = resp.status().as_u16();
            let headers: HttpHeaders = resp
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        value.to_str().unwrap_or_default().to_string(),
                    )
                })
                .collect();

            let body = resp
                .bytes()
                .await
                .map_err(|e| HttpError::Transport(e.to_string()))?
                .to_vec();

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}

#[cfg(test)]
use std::collections::{HashMap, VecDeque};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// Scripted in-memory transport for unit tests.
///
/// Responses are queued per method and URL and handed out in FIFO order.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[cfg(test)]
#[derive(Default)]
struct MockTransportInner {
    routes: HashMap<(HttpMethod, String), VecDeque<HttpResponse>>,
    requests: Vec<HttpRequest>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        response: HttpResponse,
    ) {
        let mut inner = self.inner.lock().expect("mock transport lock");
        inner
            .routes
            .entry((method, url.into()))
            .or_default()
            .push_back(response);
    }

    /// Queue a `GET` returning `status` with a JSON body.
    pub fn push_json(&self, url: impl Into<String>, status: u16, body: &serde_json::Value) {
        self.push_response(
            HttpMethod::Get,
            url,
            HttpResponse {
                status,
                headers: vec![("Content-Type".into(), "application/json".into())],
                body: serde_json::to_vec(body).expect("serialize mock body"),
            },
        );
    }

    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.lock().expect("mock transport lock").requests.clone()
    }

    #[must_use]
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[cfg(test)]
#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut inner = self.inner.lock().expect("mock transport lock");

        let key = (request.method, request.url.clone());
        inner.requests.push(request);

        match inner.routes.get_mut(&key).and_then(|q| q.pop_front()) {
            Some(resp) => Ok(resp),
            None => Err(HttpError::NoMockResponse {
                method: key.0.as_str().to_string(),
                url: key.1,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn header_lookup_ignores_case_and_prefers_first() {
        let headers: HttpHeaders = vec![
            ("X-RateLimit-Remaining".to_string(), "10".to_string()),
            ("x-ratelimit-remaining".to_string(), "9".to_string()),
        ];
        assert_eq!(header_get(&headers, "x-ratelimit-remaining"), Some("10"));
        assert_eq!(header_get(&headers, "missing"), None);
    }

    #[test]
    fn request_builders_set_method_and_headers() {
        let req = HttpRequest::get("https://api.github.com/repos/o/r")
            .with_header("Accept", "application/vnd.github+json");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.header("accept"), Some("application/vnd.github+json"));
        assert!(req.body.is_empty());

        let post = HttpRequest::post("https://hooks.example.com", b"{}".to_vec());
        assert_eq!(post.method.as_str(), "POST");
        assert_eq!(post.body, b"{}".to_vec());
    }

    #[tokio::test]
    async fn mock_transport_replays_in_order_and_records_requests() {
        let transport = MockTransport::new();
        let url = "https://api.github.com/rate_limit";
        transport.push_json(url, 200, &serde_json::json!({"n": 1}));
        transport.push_json(url, 500, &serde_json::json!({"n": 2}));

        let first = transport.send(HttpRequest::get(url)).await.expect("first");
        let second = transport.send(HttpRequest::get(url)).await.expect("second");
        assert_eq!(first.status, 200);
        assert_eq!(second.status, 500);
        assert_eq!(transport.requested_urls(), vec![url.to_string(), url.to_string()]);

        let err = transport
            .send(HttpRequest::get(url))
            .await
            .expect_err("queue is drained");
        assert!(matches!(err, HttpError::NoMockResponse { .. }));
    }

    #[tokio::test]
    async fn reqwest_transport_posts_body_and_reads_response() {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            stream
                .set_read_timeout(Some(Duration::from_secs(2)))
                .expect("set_read_timeout");

            let mut buf = Vec::new();
            let mut tmp = [0u8; 4096];
            while let Ok(n) = stream.read(&mut tmp) {
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&tmp[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") && buf.ends_with(b"{\"ok\":1}") {
                    break;
                }
            }

            let text = String::from_utf8_lossy(&buf).to_string();
            let body = b"accepted";
            let response = format!(
                "HTTP/1.1 202 Accepted\r\nContent-Length: {}\r\nX-Test: yes\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("write headers");
            stream.write_all(body).expect("write body");
            text
        });

        let transport = reqwest_transport::ReqwestTransport::with_timeout(Duration::from_secs(5))
            .expect("reqwest transport should build");
        let resp = transport
            .send(
                HttpRequest::post(format!("http://{addr}/hook"), b"{\"ok\":1}".to_vec())
                    .with_header("Content-Type", "application/json"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(resp.status, 202);
        assert_eq!(resp.header("x-test"), Some("yes"));
        assert_eq!(resp.body, b"accepted".to_vec());

        let seen = handle.join().expect("server thread");
        assert!(seen.starts_with("POST /hook "), "unexpected request: {seen:?}");
        assert!(seen.to_lowercase().contains("content-type: application/json"));
    }
}
