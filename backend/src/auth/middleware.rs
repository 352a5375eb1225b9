//! Middleware for gated routes and per-call deadlines.
//!
//! `require_identity` is layered only onto routes registered as
//! authenticated; public routes never see it.

use crate::api::common::error_response;
use crate::auth::context::RequestIdentity;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::time::Duration;

/// Rejects calls without a merchant identity and attaches the identity to
/// the request extensions for `Identity` to pick up.
pub async fn require_identity(
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let identity = RequestIdentity::from_headers(request.headers()).ok_or_else(|| {
        tracing::debug!(path = %request.uri().path(), "Rejected call without merchant identity");
        error_response(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "Missing merchant identity",
        )
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Bounds every call by the configured deadline.
///
/// The inner future is dropped on expiry. Storage statements that already
/// committed stay committed.
pub async fn enforce_deadline(
    State(deadline): State<Duration>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let path = request.uri().path().to_string();

    tokio::time::timeout(deadline, next.run(request))
        .await
        .map_err(|_| {
            tracing::warn!(path = %path, deadline_ms = deadline.as_millis() as u64, "Request deadline exceeded");
            error_response(
                StatusCode::GATEWAY_TIMEOUT,
                "deadline_exceeded",
                "Request timed out",
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::context::{Identity, MERCHANT_ID_HEADER, USER_ID_HEADER};
    use axum::{Router, body::Body, middleware, routing::get};
    use tower::ServiceExt;

    async fn whoami(Identity(identity): Identity) -> String {
        format!(
            "{}/{}",
            identity.merchant_id(),
            identity.user_id().unwrap_or("-")
        )
    }

    fn gated() -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn(require_identity))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_merchant_header_is_unauthenticated() {
        let response = gated()
            .oneshot(Request::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_string(response).await.contains("unauthenticated"));
    }

    #[tokio::test]
    async fn test_identity_reaches_handler() {
        let response = gated()
            .oneshot(
                Request::get("/whoami")
                    .header(MERCHANT_ID_HEADER, "m-1")
                    .header(USER_ID_HEADER, "u-9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "m-1/u-9");
    }

    #[tokio::test]
    async fn test_deadline_exceeded_is_gateway_timeout() {
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .route("/fast", get(|| async { "done" }))
            .layer(middleware::from_fn_with_state(
                Duration::from_millis(50),
                enforce_deadline,
            ));

        let slow = app
            .clone()
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(slow.status(), StatusCode::GATEWAY_TIMEOUT);

        let fast = app
            .oneshot(Request::get("/fast").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(fast.status(), StatusCode::OK);
    }
}
