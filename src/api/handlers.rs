//! Request handlers.

use std::ffi::OsStr;
use std::path::Path as FilePath;

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::{Html, Redirect};
use axum_extra::extract::cookie::CookieJar;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::auth::{
    self, CurrentSession, ExchangedUser, SessionClaims, authorize_url, exchange_code,
};
use crate::avatar::Identity;

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Response for successful operations.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /login
///
/// Minimal sign-in page listing the configured providers. Rendering proper
/// is out of scope; this stays a static shell.
pub async fn login_page(State(state): State<AppState>) -> Html<String> {
    let mut providers = String::new();
    for name in state.config.providers.keys() {
        providers.push_str(&format!(
            "<li><a href=\"/auth/login/{name}\">Sign in with {name}</a></li>\n"
        ));
    }
    Html(format!(
        "<!DOCTYPE html><html><head><title>Sign in</title></head>\
         <body><h1>Sign in</h1><ul>\n{providers}</ul></body></html>"
    ))
}

/// GET /chat
///
/// Minimal chat shell for the room socket. Sits behind the auth gate and
/// reads the session for the display name.
pub async fn chat_page(CurrentSession(session): CurrentSession) -> Html<String> {
    let name = escape_html(session.display_name());
    Html(format!(
        "<!DOCTYPE html><html><head><title>Chat</title></head><body>\
         <p>Chatting as <b>{name}</b> &mdash; <a href=\"/logout\">sign out</a></p>\
         <ul id=\"messages\"></ul>\
         <form id=\"chatbox\"><input id=\"message\" autocomplete=\"off\"><button>Send</button></form>\
         <script>\
         const socket = new WebSocket(`ws://${{location.host}}/room`);\
         socket.onmessage = (e) => {{\
           const li = document.createElement('li');\
           li.textContent = e.data;\
           document.getElementById('messages').appendChild(li);\
         }};\
         document.getElementById('chatbox').onsubmit = (e) => {{\
           e.preventDefault();\
           const input = document.getElementById('message');\
           if (input.value) socket.send(input.value);\
           input.value = '';\
         }};\
         </script></body></html>"
    ))
}

/// GET /auth/login/{provider}
///
/// Redirects the user to the provider's authorization endpoint.
pub async fn login_start(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> ApiResult<Redirect> {
    let config = state
        .config
        .providers
        .get(&provider)
        .ok_or_else(|| ApiError::bad_request(format!("unknown provider: {provider}")))?;
    let url = authorize_url(config, &state.config.redirect_uri(&provider));
    Ok(Redirect::temporary(&url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
}

/// GET /auth/callback/{provider}
///
/// Completes the external exchange and turns its result into the session
/// cookie: derive the unique id, resolve an avatar, encode the claims.
pub async fn login_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Redirect)> {
    let config = state
        .config
        .providers
        .get(&provider)
        .ok_or_else(|| ApiError::bad_request(format!("unknown provider: {provider}")))?;

    let profile = exchange_code(
        &state.http,
        config,
        &state.config.redirect_uri(&provider),
        &query.code,
    )
    .await?;
    let user = ExchangedUser::new(profile);

    // Avatar resolution failure falls back to no picture, never an error.
    let avatar_url = match state.resolver.resolve(&user) {
        Ok(url) => Some(url),
        Err(err) => {
            warn!(user = user.unique_id(), %err, "avatar resolution exhausted");
            None
        }
    };

    let claims = SessionClaims {
        user_id: user.unique_id().to_string(),
        name: user.name().map(str::to_owned),
        avatar_url,
        email: Some(user.email().to_string()),
    };
    let cookie = auth::session_cookie(&claims)
        .map_err(|err| ApiError::internal(format!("encoding session: {err}")))?;

    info!(user = user.unique_id(), %provider, "login completed");
    Ok((jar.add(cookie), Redirect::temporary("/chat")))
}

/// GET /logout
///
/// Clears the session cookie; the gate then treats the caller as if the
/// cookie had never existed.
pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (auth::clear_session(jar), Redirect::temporary("/chat"))
}

/// POST /uploader
///
/// Multipart avatar upload: a `userId` field and an `avatarFile` file. The
/// file is persisted under the avatar directory with the user id as filename
/// stem, keeping the uploaded extension.
pub async fn upload_avatar(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<SuccessResponse>> {
    let mut user_id: Option<String> = None;
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("userId") => user_id = Some(field.text().await?),
            Some("avatarFile") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                file = Some((filename, field.bytes().await?));
            }
            _ => {}
        }
    }

    let user_id = user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing userId field"))?;
    if user_id.contains(['/', '\\']) || user_id.contains("..") {
        return Err(ApiError::bad_request("invalid userId"));
    }
    let (filename, data) = file.ok_or_else(|| ApiError::bad_request("missing avatarFile field"))?;

    let ext = FilePath::new(&filename)
        .extension()
        .and_then(OsStr::to_str)
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    let target = state.avatar_dir.join(format!("{user_id}{ext}"));

    fs::write(&target, &data)
        .await
        .map_err(|err| ApiError::internal(format!("persisting avatar: {err}")))?;

    info!(path = %target.display(), "avatar uploaded");
    Ok(Json(SuccessResponse {
        success: true,
        message: "avatar stored".to_string(),
        path: Some(format!("/avatars/{user_id}{ext}")),
    }))
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
