//! Request logging middleware.
//!
//! Observers are owned by the [`HttpClient`](super::HttpClient) instance that
//! calls them; there is no global hook. They see every request and its
//! outcome but get no way to change either.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::client::HttpMethod;
use super::error::ApiError;

pub trait RequestObserver: Send + Sync {
    fn on_request(&self, method: HttpMethod, path: &str);

    fn on_response(&self, method: HttpMethod, path: &str, status: u16, elapsed: Duration);

    fn on_error(&self, method: HttpMethod, path: &str, error: &ApiError, elapsed: Duration);
}

/// Default observer: one `tracing` event per request and per outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RequestObserver for TracingObserver {
    fn on_request(&self, method: HttpMethod, path: &str) {
        debug!(method = %method, path, "sending request");
    }

    fn on_response(&self, method: HttpMethod, path: &str, status: u16, elapsed: Duration) {
        info!(
            method = %method,
            path,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "response received"
        );
    }

    fn on_error(&self, method: HttpMethod, path: &str, error: &ApiError, elapsed: Duration) {
        warn!(
            method = %method,
            path,
            status = error.status(),
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error,
            "request failed"
        );
    }
}
