//! Axum middleware attached to the gateway router.
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::Instrument;

use crate::tracing_setup::create_request_span;

/// Run the request inside a `request` span and log start/end including latency.
pub async fn request_timing_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let span = create_request_span(method.as_str(), uri.path());

    async move {
        tracing::info!("Started processing {} {} {:?}", method, uri, version);

        let response = next.run(req).await;
        let duration = start.elapsed();

        let current = tracing::Span::current();
        current.record("http.status_code", response.status().as_u16());
        current.record("duration_ms", duration.as_millis() as u64);

        tracing::info!(
            "Completed {} {} {:?} - {} in {:?}",
            method,
            uri,
            version,
            response.status(),
            duration
        );

        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, http::StatusCode, middleware, routing::get};
    use tower::ServiceExt; // for oneshot

    use super::*;

    #[tokio::test]
    async fn test_request_timing_middleware_passes_response_through() {
        let app = Router::new()
            .route(
                "/",
                get(|| async {
                    axum::response::Response::builder()
                        .status(StatusCode::ACCEPTED)
                        .header("x-upstream", "yes")
                        .body(Body::empty())
                        .unwrap()
                }),
            )
            .layer(middleware::from_fn(request_timing_middleware));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get("x-upstream").unwrap(), "yes");
    }
}
