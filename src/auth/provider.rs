//! External identity exchange.
//!
//! The OAuth handshake is treated as an opaque two-call exchange: the
//! callback code is traded for an access token, the token for identity
//! attributes. Provider endpoints and credentials come from configuration.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::avatar::Identity;

/// One configured identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Authorization endpoint the user is redirected to.
    pub auth_url: String,
    /// Token endpoint the callback code is posted to.
    pub token_url: String,
    /// Endpoint returning identity attributes for a bearer token.
    pub userinfo_url: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_scopes")]
    pub scopes: String,
}

fn default_scopes() -> String {
    "openid email profile".to_string()
}

/// Identity attributes as returned by the provider's userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderProfile {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Build the URL the login entry redirects the user to.
pub fn authorize_url(config: &ProviderConfig, redirect_uri: &str) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}",
        config.auth_url,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&config.scopes),
    )
}

/// Complete the exchange: code -> access token -> identity attributes.
/// Failures surface to the caller; nothing is retried.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &ProviderConfig,
    redirect_uri: &str,
    code: &str,
) -> Result<ProviderProfile, reqwest::Error> {
    let token: TokenResponse = client
        .post(&config.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    client
        .get(&config.userinfo_url)
        .bearer_auth(&token.access_token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}

/// A provider identity with its stable unique id derived: the lowercase-hex
/// SHA-256 of the case-normalized email.
pub struct ExchangedUser {
    unique_id: String,
    profile: ProviderProfile,
}

impl ExchangedUser {
    pub fn new(profile: ProviderProfile) -> Self {
        let digest = Sha256::digest(profile.email.to_lowercase().as_bytes());
        Self {
            unique_id: hex::encode(digest),
            profile,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.profile.name.as_deref()
    }

    pub fn email(&self) -> &str {
        &self.profile.email
    }
}

impl Identity for ExchangedUser {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn avatar_url(&self) -> Option<&str> {
        self.profile.picture.as_deref()
    }
}
