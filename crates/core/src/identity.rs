//! Identity resolution seam.
//!
//! The account system is an external collaborator: it hands the
//! gateway a stable user id and display name for a token, or nothing.
//! Core code only sees [`Identity`] values and never inspects tokens
//! itself.

use async_trait::async_trait;
use std::sync::{
    Arc,
    atomic::{AtomicI32, Ordering},
};

/// The acting identity behind a connection or request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable user id. Negative for anonymous guests, so guest ids
    /// can never collide with account ids.
    pub user_id: i32,
    /// Display name shown to other participants.
    pub username: String,
    /// Whether this identity is an anonymous placeholder.
    pub guest: bool,
}

impl Identity {
    /// An authenticated identity.
    #[must_use]
    pub const fn user(user_id: i32, username: String) -> Self {
        Self {
            user_id,
            username,
            guest: false,
        }
    }
}

/// Resolves the acting identity for a connection.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a token into an identity. Absent or unknown tokens
    /// yield a guest identity rather than an error: anonymous viewers
    /// are first-class in watch parties.
    async fn resolve(&self, token: Option<&str>) -> Identity;
}

/// Shared identity provider handle.
pub type IdentityService = Arc<dyn IdentityProvider>;

/// Fallback provider that knows no accounts: every connection gets a
/// fresh, stable guest identity. Real deployments plug the account
/// system in behind [`IdentityProvider`] instead.
pub struct GuestIdentityProvider {
    next_guest: AtomicI32,
}

impl Default for GuestIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GuestIdentityProvider {
    /// Create a new guest-only provider.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_guest: AtomicI32::new(-1),
        }
    }
}

#[async_trait]
impl IdentityProvider for GuestIdentityProvider {
    async fn resolve(&self, _token: Option<&str>) -> Identity {
        let id = self.next_guest.fetch_sub(1, Ordering::Relaxed);
        Identity {
            user_id: id,
            username: format!("Guest {}", -id),
            guest: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guest_identities_are_stable_and_distinct() {
        let provider = GuestIdentityProvider::new();

        let first = provider.resolve(None).await;
        let second = provider.resolve(Some("ignored-token")).await;

        assert!(first.guest);
        assert!(first.user_id < 0);
        assert_ne!(first.user_id, second.user_id);
        assert_eq!(first.username, "Guest 1");
    }
}
