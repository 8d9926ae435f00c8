use crate::model::friend::ProposalStatus;
use crate::model::room::RoomId;
use crate::model::user::{ProposalId, UserId};
use crate::model::TimestampMs;
use serde::{Deserialize, Serialize};

/// Invitation into a room. Room name and sender name are denormalized for
/// rendering without extra lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInvite {
    pub id: ProposalId,
    pub room_id: RoomId,
    pub room_name: String,
    pub from: UserId,
    pub from_name: String,
    pub to: UserId,
    pub status: ProposalStatus,
    pub created_at: TimestampMs,
}
