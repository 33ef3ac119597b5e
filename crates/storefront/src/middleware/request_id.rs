//! Request correlation ids.
//!
//! Every request carries an `x-request-id`. A well-formed id from an upstream
//! proxy is kept; otherwise a UUID v4 is assigned. The id is recorded on the
//! tracing span and the Sentry scope, and echoed on the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream id accepted as is.
const MAX_UPSTREAM_ID_LEN: usize = 128;

fn upstream_id(request: &Request) -> Option<String> {
    let value = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let valid = !value.is_empty()
        && value.len() <= MAX_UPSTREAM_ID_LEN
        && value.bytes().all(|b| b.is_ascii_graphic());
    valid.then(|| value.to_string())
}

/// Assign or propagate the request id.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = upstream_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| scope.set_tag("request_id", &request_id));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/",
                get(|| async { "ok" }),
            )
            .layer(axum::middleware::from_fn(request_id_middleware))
    }

    async fn call(header: Option<&str>) -> String {
        let mut request = Request::builder().uri("/");
        if let Some(value) = header {
            request = request.header(REQUEST_ID_HEADER, value);
        }
        let response = app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        response.headers()[REQUEST_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_generates_id() {
        let header = call(None).await;
        assert!(Uuid::parse_str(&header).is_ok());
        assert_ne!(call(None).await, header);
    }

    #[tokio::test]
    async fn test_propagates_upstream_id() {
        assert_eq!(call(Some("cf-ray-8d2f")).await, "cf-ray-8d2f");
    }

    #[tokio::test]
    async fn test_replaces_oversized_upstream_id() {
        let long = "a".repeat(MAX_UPSTREAM_ID_LEN + 1);
        assert!(Uuid::parse_str(&call(Some(&long)).await).is_ok());
    }
}
