//! HTTP client wrapper.
//!
//! Owns the base URL, the request timeout and the logging middleware, and
//! turns every transport outcome into either a JSON body or a classified
//! [`ApiError`].

use reqwest::{Client, ClientBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;
use url::Url;

use super::error::{ApiError, ApiResult};
use super::middleware::{RequestObserver, TracingObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Path relative to the base URL, e.g. `/logs/user/3`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Adds query parameters; pairs with an empty value are skipped.
    pub fn with_query<K, V, I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            let value = value.into();
            if !value.is_empty() {
                self.query.push((key.into(), value));
            }
        }
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Path plus query string, as it appears in logs.
    pub fn target(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: String = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{}", self.path, query)
    }
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    observers: Vec<Arc<dyn RequestObserver>>,
}

impl HttpClient {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8000/api";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Builds a client with the tracing observer installed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ApiError::Configuration(format!("invalid base URL '{}': {}", base_url, e)))?;

        let client = ClientBuilder::new()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| ApiError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout,
            observers: vec![Arc::new(TracingObserver)],
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Drops every observer, including the default tracing one.
    pub fn without_observers(mut self) -> Self {
        self.observers.clear();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `request(method, path, body?)`: one HTTP call, JSON body back.
    pub async fn request(&self, method: HttpMethod, path: &str, body: Option<Value>) -> ApiResult<Value> {
        let mut request = HttpRequest::new(method, path);
        request.body = body;
        self.send(request).await
    }

    /// Sends the request and decodes the body into `T`.
    pub async fn send_as<T: DeserializeOwned>(&self, request: HttpRequest) -> ApiResult<T> {
        let path = request.path.clone();
        let value = self.send(request).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode {
            path,
            message: e.to_string(),
        })
    }

    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: HttpRequest) -> ApiResult<Value> {
        let target = request.target();
        for observer in &self.observers {
            observer.on_request(request.method, &target);
        }

        let started = Instant::now();
        let outcome = self.execute(&request).await;
        let elapsed = started.elapsed();

        match &outcome {
            Ok((status, _)) => {
                for observer in &self.observers {
                    observer.on_response(request.method, &target, *status, elapsed);
                }
            }
            Err(error) => {
                for observer in &self.observers {
                    observer.on_error(request.method, &target, error, elapsed);
                }
            }
        }

        outcome.map(|(_, body)| body)
    }

    async fn execute(&self, request: &HttpRequest) -> ApiResult<(u16, Value)> {
        let url = self.build_url(request)?;

        let builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Put => self.client.put(url),
            HttpMethod::Delete => self.client.delete(url),
        };
        let builder = builder.header(reqwest::header::ACCEPT, "application/json");
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(request, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(request, e))?;

        classify(&request.path, status, text).map(|body| (status.as_u16(), body))
    }

    fn build_url(&self, request: &HttpRequest) -> ApiResult<Url> {
        let raw = format!("{}/{}", self.base_url, request.path.trim_start_matches('/'));
        let mut url = Url::parse(&raw)
            .map_err(|e| ApiError::Configuration(format!("invalid request URL '{}': {}", raw, e)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }

    fn transport_error(&self, request: &HttpRequest, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout {
                method: request.method.to_string(),
                path: request.path.clone(),
                timeout: self.timeout,
            }
        } else {
            ApiError::Network {
                method: request.method.to_string(),
                path: request.path.clone(),
                message: error.to_string(),
            }
        }
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Maps a received response onto the error taxonomy.
fn classify(path: &str, status: StatusCode, text: String) -> ApiResult<Value> {
    match status.as_u16() {
        200..=299 => {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&text).map_err(|e| ApiError::Decode {
                path: path.to_string(),
                message: e.to_string(),
            })
        }
        404 => Err(ApiError::NotFound { path: path.to_string() }),
        500 => Err(ApiError::Server { path: path.to_string() }),
        status => Err(ApiError::Http { status, body: text }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::recording::RecordingObserver;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout: Duration) -> HttpClient {
        HttpClient::new(server.uri(), timeout)
            .unwrap()
            .without_observers()
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = HttpClient::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[test]
    fn target_skips_empty_query_values() {
        let request = HttpRequest::get("/logs").with_query([("user_id", "3"), ("device", "")]);
        assert_eq!(request.target(), "/logs?user_id=3");
        assert_eq!(HttpRequest::get("/logs").target(), "/logs");
    }

    #[tokio::test]
    async fn returns_parsed_body_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));
        let body = client.request(HttpMethod::Get, "/health", None).await.unwrap();
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn sends_json_body_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pills"))
            .and(query_param("dry_run", "1"))
            .and(body_json(json!({"name": "Aspirin"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));
        let request = HttpRequest::post("/pills")
            .with_query([("dry_run", "1")])
            .with_json(json!({"name": "Aspirin"}));
        let body = client.send(request).await.unwrap();
        assert_eq!(body, json!({"id": 1}));
    }

    #[tokio::test]
    async fn empty_success_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/users/4"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));
        let body = client.request(HttpMethod::Delete, "/users/4", None).await.unwrap();
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn classifies_well_known_statuses() {
        let server = MockServer::start().await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(path("/conflict"))
            .respond_with(ResponseTemplate::new(409).set_body_string(r#"{"detail":"taken"}"#))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));

        let err = client.request(HttpMethod::Get, "/missing", None).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));

        let err = client.request(HttpMethod::Get, "/broken", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Server { .. }));

        let err = client.request(HttpMethod::Get, "/conflict", None).await.unwrap_err();
        match err {
            ApiError::Http { status, body } => {
                assert_eq!(status, 409);
                assert_eq!(body, r#"{"detail":"taken"}"#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_response_is_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(path("/reminders"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(50));
        let err = client.request(HttpMethod::Get, "/reminders", None).await.unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = HttpClient::new(format!("http://127.0.0.1:{}", port), Duration::from_secs(2))
            .unwrap()
            .without_observers();
        let err = client.request(HttpMethod::Get, "/health", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Network { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn non_json_success_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));
        let err = client.request(HttpMethod::Get, "/health", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn observers_see_request_and_outcome() {
        let server = MockServer::start().await;
        Mock::given(path("/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(path("/users/9"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let recorder = Arc::new(RecordingObserver::default());
        let client = client_for(&server, Duration::from_secs(2)).with_observer(recorder.clone());

        client.request(HttpMethod::Get, "/users", None).await.unwrap();
        let _ = client.request(HttpMethod::Get, "/users/9", None).await;

        assert_eq!(
            recorder.events(),
            vec![
                "request GET /users".to_string(),
                "response GET /users 200".to_string(),
                "request GET /users/9".to_string(),
                "error GET /users/9 404".to_string(),
            ]
        );
    }
}
