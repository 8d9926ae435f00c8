use async_trait::async_trait;
use talkie_core::{
    IceCandidate, Member, Role, Room, RoomId, ServiceError, SessionDescription, TimestampMs,
    UserId,
};
use tokio::sync::mpsc;

/// Stream of full room snapshots. Every write to the room record is
/// delivered to every subscriber, including the writer itself, at least
/// once. Consumers must be idempotent against redundant delivery.
pub type RoomWatch = mpsc::UnboundedReceiver<Room>;

/// Stream of candidate-queue entries in append order. Each entry is
/// delivered exactly once per live subscription, but a resubscribe replays
/// entries already seen; consumers must tolerate re-application.
pub type CandidateWatch = mpsc::UnboundedReceiver<IceCandidate>;

/// The document-backed mailbox the handshake rides on: one shared record per
/// room holding exactly one offer and one answer, plus two append-only
/// candidate queues partitioned by emitting role.
///
/// All writes are merge upserts; untouched fields of the room record are
/// preserved. Publishing an offer starts a fresh handshake and clears any
/// stale answer left by a previous negotiation.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    async fn room(&self, room: &RoomId) -> Result<Room, ServiceError>;

    async fn publish_offer(
        &self,
        room: &RoomId,
        description: SessionDescription,
    ) -> Result<(), ServiceError>;

    async fn publish_answer(
        &self,
        room: &RoomId,
        description: SessionDescription,
    ) -> Result<(), ServiceError>;

    async fn append_candidate(
        &self,
        room: &RoomId,
        role: Role,
        candidate: IceCandidate,
    ) -> Result<(), ServiceError>;

    async fn watch_room(&self, room: &RoomId) -> Result<RoomWatch, ServiceError>;

    async fn watch_candidates(
        &self,
        room: &RoomId,
        role: Role,
    ) -> Result<CandidateWatch, ServiceError>;

    /// Create or refresh the local participant record.
    async fn upsert_member(&self, room: &RoomId, member: Member) -> Result<(), ServiceError>;

    /// Heartbeat touch of the participant record.
    async fn touch_member(
        &self,
        room: &RoomId,
        uid: &UserId,
        at: TimestampMs,
    ) -> Result<(), ServiceError>;

    async fn mark_member_offline(&self, room: &RoomId, uid: &UserId)
        -> Result<(), ServiceError>;

    async fn remove_member(&self, room: &RoomId, uid: &UserId) -> Result<(), ServiceError>;
}
