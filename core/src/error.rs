use thiserror::Error;

use crate::cache::ResourceKey;

/// Every failure the client can surface.
///
/// Cloneable so one refetch outcome can be handed to every coalesced waiter
/// and recorded on the cached resource at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No resolved player at submission time. Raised before any network call.
    #[error("no player is signed in")]
    MissingIdentity,

    /// Transport error, timeout, or server-side failure.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The backend rejected the payload, or answered with something malformed.
    #[error("validation failure: {0}")]
    ValidationFailure(String),

    /// Some of a multi-resource refetch failed. Resources not listed refreshed.
    #[error("refresh failed for {}", display_keys(.failed))]
    PartialRefreshFailure { failed: Vec<ResourceKey> },
}

impl ClientError {
    pub fn is_network(&self) -> bool {
        matches!(self, Self::NetworkFailure(_))
    }
}

fn display_keys(keys: &[ResourceKey]) -> String {
    keys.iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
