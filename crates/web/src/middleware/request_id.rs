//! Request ID middleware for request tracing and correlation.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// The HTTP header carrying the request ID.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Identifier of the current request, available as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub HeaderValue);

/// Tag every request with an ID.
///
/// An ID supplied by an upstream proxy is kept; otherwise a UUID v4 is
/// generated. The ID is recorded on the tracing span and the Sentry scope,
/// stored as a [`RequestId`] extension, and echoed in the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(generate);

    if let Ok(id) = id.to_str() {
        tracing::Span::current().record("request_id", id);
        sentry::configure_scope(|scope| scope.set_tag("request_id", id));
    }

    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    response.headers_mut().insert(REQUEST_ID_HEADER.clone(), id);
    response
}

fn generate() -> HeaderValue {
    let mut buf = Uuid::encode_buffer();
    let id = Uuid::new_v4().hyphenated().encode_lower(&mut buf);
    // A hyphenated UUID is always a valid header value
    HeaderValue::from_str(id).unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}
