pub mod client;
pub mod endpoints;
pub mod error;
pub mod middleware;

pub use client::{HttpClient, HttpMethod, HttpRequest};
pub use endpoints::{ConnectionReport, LogFilters, MedTrackApi};
pub use error::{ApiError, ApiResult};
pub use middleware::{RequestObserver, TracingObserver};
