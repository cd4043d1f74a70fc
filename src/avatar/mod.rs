//! Avatar resolution.
//!
//! An [`AvatarResolver`] holds an ordered chain of [`AvatarStrategy`]
//! implementations and returns the first URL any of them can produce for an
//! identity. Strategy order is fixed at construction time and is part of the
//! observable contract: reordering the chain changes precedence.

mod strategies;

pub use strategies::{HashedLookup, IdentitySupplied, LocalStore};

use thiserror::Error;

/// An authenticated identity as seen by avatar resolution.
///
/// Concrete identity sources (the exchanged provider identity, test doubles)
/// implement this directly.
pub trait Identity {
    /// Stable opaque id, unique per user.
    fn unique_id(&self) -> &str;

    /// Avatar URL the identity itself carries, if any.
    fn avatar_url(&self) -> Option<&str>;
}

/// Returned by a single strategy that cannot provide a URL for an identity.
#[derive(Debug, Error)]
#[error("strategy cannot provide an avatar url")]
pub struct NoAvatar;

/// Returned by [`AvatarResolver::resolve`] when every strategy in the chain
/// has been exhausted. Callers substitute a default presentation; this is
/// never fatal.
#[derive(Debug, Error)]
#[error("no avatar url available from any configured strategy")]
pub struct NoAvatarAvailable;

/// One method of deriving a display-picture URL for an identity.
pub trait AvatarStrategy: Send + Sync {
    fn resolve(&self, identity: &dyn Identity) -> Result<String, NoAvatar>;
}

/// Ordered chain of avatar strategies. The first strategy that returns a URL
/// wins; later strategies are never consulted.
pub struct AvatarResolver {
    strategies: Vec<Box<dyn AvatarStrategy>>,
}

impl AvatarResolver {
    pub fn new(strategies: Vec<Box<dyn AvatarStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn resolve(&self, identity: &dyn Identity) -> Result<String, NoAvatarAvailable> {
        for strategy in &self.strategies {
            if let Ok(url) = strategy.resolve(identity) {
                return Ok(url);
            }
        }
        Err(NoAvatarAvailable)
    }
}
