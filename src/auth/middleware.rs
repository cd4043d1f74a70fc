//! The auth gate.

use axum::extract::Request;
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::Cookie;
use tracing::debug;

use super::session::{AUTH_COOKIE, LOGIN_PATH};

/// Gate protecting a route: callers without a session cookie are redirected
/// to the login entry point and the wrapped handler never runs. Cookie
/// contents are not validated here; callers that need fields decode them
/// through [`super::CurrentSession`].
pub async fn require_session(request: Request, next: Next) -> Response {
    let Some(header_value) = request.headers().get(header::COOKIE) else {
        return Redirect::temporary(LOGIN_PATH).into_response();
    };

    // A Cookie header we cannot even read as a string is a transport-level
    // failure, not a missing session.
    let Ok(raw) = header_value.to_str() else {
        debug!("unreadable cookie header");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let authenticated = Cookie::split_parse(raw)
        .filter_map(Result::ok)
        .any(|cookie| cookie.name() == AUTH_COOKIE && !cookie.value().is_empty());

    if authenticated {
        next.run(request).await
    } else {
        Redirect::temporary(LOGIN_PATH).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{HeaderValue, Request, StatusCode};
    use axum::routing::get;
    use axum::{Router, middleware};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Router whose protected handler bumps a counter when it actually runs.
    fn gated_app(hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/chat",
                get(move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        "chat"
                    }
                }),
            )
            .layer(middleware::from_fn(require_session))
    }

    fn request(cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/chat");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_cookie_redirects_to_login() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = gated_app(hits.clone());

        let response = app.oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            LOGIN_PATH
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_cookie_value_is_logged_out() {
        // What a request looks like after logout cleared the value: same as
        // never having had a cookie.
        let hits = Arc::new(AtomicUsize::new(0));
        let app = gated_app(hits.clone());

        let response = app.oneshot(request(Some("auth="))).await.unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_present_cookie_passes_through() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = gated_app(hits.clone());

        let response = app
            .oneshot(request(Some("auth=eyJ1c2VySWQiOiJhYmMifQ")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreadable_header_is_internal_error() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = gated_app(hits.clone());

        let mut req = request(None);
        req.headers_mut().insert(
            header::COOKIE,
            HeaderValue::from_bytes(b"auth=\xff\xfe").unwrap(),
        );

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_cookies_do_not_authenticate() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = gated_app(hits.clone());

        let response = app.oneshot(request(Some("theme=dark"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
