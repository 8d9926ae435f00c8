use crate::model::short_id::ShortId;
use crate::model::TimestampMs;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable opaque identity issued by the auth provider.
///
/// Kept as a string because role resolution depends on its lexicographic
/// order being the same on both peers.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a friend request or room invite document.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq)]
pub struct ProposalId(pub Uuid);

impl ProposalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProposalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable per-identity profile document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: UserId,
    pub display_name: String,
    /// Assigned at most once; injective and immutable afterwards.
    pub short_id: Option<ShortId>,
    /// Denormalized liveness flag, mirrored from the ephemeral store.
    pub online: bool,
    pub created_at: TimestampMs,
}

impl UserProfile {
    pub fn new(uid: UserId, display_name: impl Into<String>, created_at: TimestampMs) -> Self {
        Self {
            uid,
            display_name: display_name.into(),
            short_id: None,
            online: false,
            created_at,
        }
    }
}
