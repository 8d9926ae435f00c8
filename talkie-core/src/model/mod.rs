mod friend;
mod invite;
mod member;
mod room;
mod short_id;
mod signaling;
mod user;

pub use friend::{FriendEdge, FriendRequest, ProposalStatus};
pub use invite::RoomInvite;
pub use member::Member;
pub use room::{Room, RoomId};
pub use short_id::ShortId;
pub use signaling::{IceCandidate, IceServerConfig, Role, SdpKind, SessionDescription};
pub use user::{ProposalId, UserId, UserProfile};

/// Wall-clock instant in milliseconds since the Unix epoch.
pub type TimestampMs = u64;

pub fn now_ms() -> TimestampMs {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as TimestampMs)
        .unwrap_or(0)
}
