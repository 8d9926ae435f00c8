use crate::model::signaling::SessionDescription;
use crate::model::user::UserId;
use crate::model::{ShortId, TimestampMs};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq)]
pub struct RoomId(pub Uuid);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One negotiation context. At most one offer and one answer are live at a
/// time; a new negotiation overwrites both rather than appending. The room
/// and everything under it is destroyed when membership reaches zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// Hidden numeric code, allocated alongside the room.
    pub code: ShortId,
    pub created_by: UserId,
    pub created_at: TimestampMs,
    pub member_uids: Vec<UserId>,
    /// Derived from the live member records; denormalized for cheap reads.
    pub member_count: u32,
    pub offer: Option<SessionDescription>,
    pub answer: Option<SessionDescription>,
}

impl Room {
    pub fn new(
        name: impl Into<String>,
        code: ShortId,
        created_by: UserId,
        created_at: TimestampMs,
    ) -> Self {
        Self {
            id: RoomId::new(),
            name: name.into(),
            code,
            member_uids: vec![created_by.clone()],
            member_count: 1,
            created_by,
            created_at,
            offer: None,
            answer: None,
        }
    }

    pub fn is_member(&self, uid: &UserId) -> bool {
        self.member_uids.iter().any(|m| m == uid)
    }

    /// The counterpart identity, once exactly two members are present.
    pub fn other_member(&self, local: &UserId) -> Option<&UserId> {
        if self.member_uids.len() != 2 {
            return None;
        }
        self.member_uids.iter().find(|m| *m != local)
    }
}
