use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;

pub const UNKNOWN_CLIENT: &str = "unknown";

/// Logging middleware for request/response tracking
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        target: "portfolio_api::middleware",
        method = %method,
        path = %uri,
        status = %response.status(),
        latency_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}

/// Resolve the caller's address.
///
/// Forwarding headers are only honoured when the service sits behind a proxy
/// that sets them. Only the rightmost `X-Forwarded-For` entry is used: that is
/// the one the proxy appended, everything left of it is client supplied.
pub fn client_address(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        if let Some(forwarded) = forwarded_address(headers) {
            return forwarded;
        }
    }

    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn forwarded_address(headers: &HeaderMap) -> Option<String> {
    let from_forwarded_for = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .last();

    let from_real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    from_forwarded_for.or_else(from_real_ip).map(str::to_string)
}

/// The declared user agent, or an empty string when absent or not text.
pub fn user_agent(headers: &HeaderMap) -> &str {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}
