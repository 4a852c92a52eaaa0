//! Request logging
//!
//! The logger is a collaborator handed to the [`Service`](super::Service) at
//! construction, so tests can capture or silence the per-request line.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One completed request/response cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub method: String,
    /// Path plus query string, as received
    pub url: String,
    pub status: u16,
    pub elapsed: Duration,
}

impl RequestRecord {
    /// `GET /api/users - 3ms`
    pub fn log_line(&self) -> String {
        format!("{} {} - {}ms", self.method, self.url, self.elapsed.as_millis())
    }
}

pub trait RequestLogger: Send + Sync {
    fn record(&self, entry: &RequestRecord);
}

/// Emits every request as a structured `info` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRequestLogger;

impl RequestLogger for TracingRequestLogger {
    fn record(&self, entry: &RequestRecord) {
        tracing::info!(
            method = %entry.method,
            path = %entry.url,
            status = entry.status,
            elapsed_ms = entry.elapsed.as_millis() as u64,
            "{}",
            entry.log_line()
        );
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryRequestLogger {
    records: Mutex<Vec<RequestRecord>>,
}

impl MemoryRequestLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<RequestRecord> {
        self.records.lock().clone()
    }
}

impl RequestLogger for MemoryRequestLogger {
    fn record(&self, entry: &RequestRecord) {
        self.records.lock().push(entry.clone());
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentRequestLogger;

impl RequestLogger for SilentRequestLogger {
    fn record(&self, _entry: &RequestRecord) {}
}

/// Times the rest of the chain and reports the finished request.
pub async fn log_requests(
    State(logger): State<Arc<dyn RequestLogger>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    logger.record(&RequestRecord {
        method,
        url,
        status: response.status().as_u16(),
        elapsed: start.elapsed(),
    });
    response
}
