use crate::model::user::UserId;
use crate::model::{ShortId, TimestampMs};
use serde::{Deserialize, Serialize};

/// Per-(room, user) participant record. Created when the user enters the
/// room and deleted when they leave; the room's member list is kept
/// consistent with the union of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub uid: UserId,
    pub display_name: String,
    pub short_id: Option<ShortId>,
    pub online: bool,
    pub joined_at: TimestampMs,
    /// Last heartbeat touch. No expiry is enforced on it yet.
    pub last_seen_at: TimestampMs,
}

impl Member {
    pub fn new(
        uid: UserId,
        display_name: impl Into<String>,
        short_id: Option<ShortId>,
        joined_at: TimestampMs,
    ) -> Self {
        Self {
            uid,
            display_name: display_name.into(),
            short_id,
            online: true,
            joined_at,
            last_seen_at: joined_at,
        }
    }
}
