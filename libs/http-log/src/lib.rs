use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{error, info, trace, warn};

const SLOW_REQUEST: Duration = Duration::from_millis(500);

/// Logs one line per request.
///
/// Bodies are never buffered: push-ingest uploads and WebSocket upgrades stay
/// streaming. Long-lived requests (ingest, relay) are logged when they finish.
pub async fn print_request_response(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let streaming = is_streaming(req.headers());

    trace!("request headers = {:?}", req.headers());

    let res = next.run(req).await;
    let duration = start.elapsed();
    let status = res.status();

    trace!("response headers = {:?}", res.headers());

    if status.is_server_error() {
        error!(
            "[{} {}] [{}] {}ms",
            method,
            uri,
            status.as_u16(),
            duration.as_millis()
        );
    } else if status.is_client_error() || (!streaming && duration > SLOW_REQUEST) {
        warn!(
            "[{} {}] [{}] {}ms",
            method,
            uri,
            status.as_u16(),
            duration.as_millis()
        );
    } else {
        info!(
            "[{} {}] [{}] {}ms",
            method,
            uri,
            status.as_u16(),
            duration.as_millis()
        );
    }

    res
}

fn is_streaming(headers: &HeaderMap) -> bool {
    headers.contains_key(header::UPGRADE)
        || headers
            .get(header::TRANSFER_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_is_streaming() {
        let mut headers = HeaderMap::new();
        assert!(!is_streaming(&headers));

        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        assert!(is_streaming(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        assert!(is_streaming(&headers));
    }
}
