use axum::http::StatusCode;
use prometheus::{Encoder, TextEncoder};

/// Render every registered collector in the Prometheus text format.
pub fn encode_metrics() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buf = Vec::new();
    match encoder.encode(&families, &mut buf) {
        Ok(()) => (StatusCode::OK, String::from_utf8_lossy(&buf).into_owned()),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("encode error: {}", e)),
    }
}

pub async fn metrics_handler() -> (StatusCode, String) {
    encode_metrics()
}
