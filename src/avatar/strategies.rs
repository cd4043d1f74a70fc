//! Concrete avatar strategies.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use super::{AvatarStrategy, Identity, NoAvatar};

/// Path prefix local-store avatars are served from.
pub const AVATAR_URL_PREFIX: &str = "/avatars/";

/// External lookup-service template prefix. The scheme-relative form follows
/// whatever scheme the page itself was served over.
const LOOKUP_URL_PREFIX: &str = "//www.gravatar.com/avatar/";

/// Uses a URL the identity already carries (e.g. supplied by the external
/// identity provider). Fails if the identity has none or it is empty.
pub struct IdentitySupplied;

impl AvatarStrategy for IdentitySupplied {
    fn resolve(&self, identity: &dyn Identity) -> Result<String, NoAvatar> {
        identity
            .avatar_url()
            .filter(|url| !url.is_empty())
            .map(str::to_owned)
            .ok_or(NoAvatar)
    }
}

/// Derives a URL from the identity's unique id against a fixed external
/// service template. Always succeeds.
pub struct HashedLookup;

impl AvatarStrategy for HashedLookup {
    fn resolve(&self, identity: &dyn Identity) -> Result<String, NoAvatar> {
        Ok(format!("{LOOKUP_URL_PREFIX}{}", identity.unique_id()))
    }
}

/// Looks for a file in the configured directory whose name starts with the
/// identity's unique id; the resolved URL keeps the discovered extension.
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl AvatarStrategy for LocalStore {
    fn resolve(&self, identity: &dyn Identity) -> Result<String, NoAvatar> {
        let entries = fs::read_dir(&self.dir).map_err(|_| NoAvatar)?;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(identity.unique_id()) {
                let ext = Path::new(name)
                    .extension()
                    .and_then(OsStr::to_str)
                    .map(|ext| format!(".{ext}"))
                    .unwrap_or_default();
                return Ok(format!("{AVATAR_URL_PREFIX}{}{ext}", identity.unique_id()));
            }
        }
        Err(NoAvatar)
    }
}
