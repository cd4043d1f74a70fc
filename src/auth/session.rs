//! Session payload and cookie handling.
//!
//! There is no server-side session store: the `auth` cookie carries a
//! base64-encoded JSON bag of identity attributes and is the whole session.
//! The gate only checks presence; decoding is deferred to callers that read
//! specific fields, via [`CurrentSession`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ApiError;

/// Name of the session cookie.
pub const AUTH_COOKIE: &str = "auth";

/// Where unauthenticated callers are sent.
pub const LOGIN_PATH: &str = "/login";

/// Identity attributes carried in the session cookie. Deployments may expose
/// any subset beyond `userId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Stable opaque user id.
    #[serde(rename = "userId")]
    pub user_id: String,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Avatar URL resolved at login time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session cookie is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("session payload is not valid json: {0}")]
    Payload(#[from] serde_json::Error),
}

impl SessionClaims {
    /// Name to show for this user, falling back through the optional fields.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.user_id)
    }

    pub fn encode(&self) -> Result<String, SessionError> {
        Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(self)?))
    }

    pub fn decode(value: &str) -> Result<Self, SessionError> {
        let bytes = URL_SAFE_NO_PAD.decode(value)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Build the session cookie with root path scope.
pub fn session_cookie(claims: &SessionClaims) -> Result<Cookie<'static>, SessionError> {
    Ok(Cookie::build((AUTH_COOKIE, claims.encode()?))
        .path("/")
        .build())
}

/// Remove the session cookie from the jar: the response sets the same name
/// to an empty value with an expired lifetime, which the gate treats as if
/// the cookie had never existed.
pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build((AUTH_COOKIE, "")).path("/"))
}

/// Extractor yielding the decoded session claims for handlers that read
/// identity fields.
pub struct CurrentSession(pub SessionClaims);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(AUTH_COOKIE).filter(|cookie| !cookie.value().is_empty())
        else {
            return Err(ApiError::unauthorized("no active session"));
        };
        let claims = SessionClaims::decode(cookie.value())
            .map_err(|err| ApiError::bad_request(format!("session cookie: {err}")))?;
        Ok(Self(claims))
    }
}
