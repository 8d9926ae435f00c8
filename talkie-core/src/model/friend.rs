use crate::model::user::{ProposalId, UserId};
use crate::model::{ShortId, TimestampMs};
use serde::{Deserialize, Serialize};

/// Lifecycle of a directional proposal (friend request, room invite).
/// Mutated exactly once, pending -> accepted or pending -> rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Undirected friendship, keyed by the canonical sorted pair so the edge is
/// unique regardless of which side initiated it. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendEdge {
    pub pair_id: String,
    pub uids: [UserId; 2],
    pub created_at: TimestampMs,
}

impl FriendEdge {
    pub fn new(a: UserId, b: UserId, created_at: TimestampMs) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self {
            pair_id: Self::pair_id(&lo, &hi),
            uids: [lo, hi],
            created_at,
        }
    }

    pub fn pair_id(a: &UserId, b: &UserId) -> String {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        format!("{lo}_{hi}")
    }
}

/// Directional friend proposal with denormalized short IDs so lists render
/// without extra lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: ProposalId,
    pub from: UserId,
    pub to: UserId,
    pub from_short_id: Option<ShortId>,
    pub to_short_id: Option<ShortId>,
    pub status: ProposalStatus,
    pub created_at: TimestampMs,
}
