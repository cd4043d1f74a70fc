//! Roomcast configuration.
//!
//! The listen address comes from the CLI; everything else lives in an
//! optional TOML file: the identity-provider registry and the public base
//! URL callbacks are built against.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::auth::ProviderConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL this deployment is reachable at, used to build the OAuth
    /// redirect URIs.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Identity providers, keyed by the name used in `/auth/login/{name}`.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            public_url: default_public_url(),
            providers: HashMap::new(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Callback URI registered with (and sent to) the named provider.
    pub fn redirect_uri(&self, provider: &str) -> String {
        format!(
            "{}/auth/callback/{provider}",
            self.public_url.trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_provider() {
        let sample = r#"
public_url = "https://chat.example.com"

[providers.google]
auth_url = "https://accounts.google.com/o/oauth2/auth"
token_url = "https://oauth2.googleapis.com/token"
userinfo_url = "https://openidconnect.googleapis.com/v1/userinfo"
client_id = "id"
client_secret = "secret"
"#;
        let config: Config = toml::from_str(sample).unwrap();
        assert_eq!(config.public_url, "https://chat.example.com");
        let google = &config.providers["google"];
        assert_eq!(google.client_id, "id");
        assert_eq!(google.scopes, "openid email profile");
    }

    #[test]
    fn test_redirect_uri_strips_trailing_slash() {
        let config = Config {
            public_url: "https://chat.example.com/".to_string(),
            providers: HashMap::new(),
        };
        assert_eq!(
            config.redirect_uri("google"),
            "https://chat.example.com/auth/callback/google"
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.public_url, "http://localhost:8080");
        assert!(config.providers.is_empty());
    }
}
