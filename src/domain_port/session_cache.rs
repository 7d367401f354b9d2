use crate::application_port::*;
use crate::domain_model::*;

/// The single live session of one identity.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SessionRecord {
    pub refresh_token: RefreshToken,
    pub password_hash: String,
}

/// Keyed by email. Entries expire after the refresh TTL, counted from the last `set`.
#[async_trait::async_trait]
pub trait SessionCache: Send + Sync {
    /// `Ok(None)` is a genuine miss; backend failures are errors.
    async fn get(&self, email: &str) -> Result<Option<SessionRecord>, AuthError>;

    /// Replace the whole entry and restart its TTL.
    async fn set(
        &self,
        email: &str,
        refresh_token: &RefreshToken,
        password_hash: &str,
    ) -> Result<(), AuthError>;

    /// Remove the entry. Removing an absent entry is not an error.
    async fn invalidate(&self, email: &str) -> Result<(), AuthError>;

    async fn ping(&self) -> Result<(), AuthError>;
}
