use crate::allocator::AllocatorState;
use async_trait::async_trait;
use talkie_core::{
    FriendEdge, FriendRequest, Member, ProposalId, ProposalStatus, Room, RoomId, RoomInvite,
    ServiceError, ShortId, UserId, UserProfile,
};
use tokio::sync::mpsc;

/// Storage the allocator needs: a width-state record per scope and atomic
/// claims on candidate values.
#[async_trait]
pub trait AllocatorStore: Send + Sync {
    /// Load the scope's width state, initializing it at `initial_width` if
    /// this is the first call.
    async fn allocator_state(
        &self,
        scope: &str,
        initial_width: u32,
    ) -> Result<AllocatorState, ServiceError>;

    /// Atomically replace the scope's state, but only if it still equals
    /// `expected`. `Ok(false)` means a concurrent writer got there first;
    /// reload and retry.
    async fn compare_and_swap_state(
        &self,
        scope: &str,
        expected: AllocatorState,
        next: AllocatorState,
    ) -> Result<bool, ServiceError>;

    /// Atomically claim `candidate` within `scope` for `owner`.
    /// `Ok(false)` means another owner holds it.
    async fn try_claim(
        &self,
        scope: &str,
        candidate: &ShortId,
        owner: &str,
    ) -> Result<bool, ServiceError>;
}

/// The durable document store as the directory services see it: typed point
/// reads, merge writes and the handful of equality queries the services
/// need.
#[async_trait]
pub trait DirectoryStore: AllocatorStore {
    // Profiles.
    async fn profile(&self, uid: &UserId) -> Result<Option<UserProfile>, ServiceError>;
    async fn upsert_profile(&self, profile: UserProfile) -> Result<(), ServiceError>;
    async fn set_profile_online(&self, uid: &UserId, online: bool) -> Result<(), ServiceError>;
    /// Writes the short ID onto the profile and into the reverse index.
    async fn set_profile_short_id(
        &self,
        uid: &UserId,
        short_id: &ShortId,
    ) -> Result<(), ServiceError>;
    async fn lookup_short_id(&self, short_id: &ShortId) -> Result<Option<UserId>, ServiceError>;

    // Friend edges and requests.
    async fn friend_edge_exists(&self, pair_id: &str) -> Result<bool, ServiceError>;
    async fn insert_friend_edge(&self, edge: FriendEdge) -> Result<(), ServiceError>;
    async fn pending_request_between(
        &self,
        from: &UserId,
        to: &UserId,
    ) -> Result<bool, ServiceError>;
    async fn insert_friend_request(&self, request: FriendRequest) -> Result<(), ServiceError>;
    async fn friend_request(
        &self,
        id: &ProposalId,
    ) -> Result<Option<FriendRequest>, ServiceError>;
    /// Pending requests addressed to `to`, for the recipient's inbox.
    async fn pending_requests_for(&self, to: &UserId)
        -> Result<Vec<FriendRequest>, ServiceError>;
    async fn set_friend_request_status(
        &self,
        id: &ProposalId,
        status: ProposalStatus,
    ) -> Result<(), ServiceError>;

    // Rooms, members, invites.
    async fn insert_room(&self, room: Room) -> Result<(), ServiceError>;
    async fn room(&self, id: &RoomId) -> Result<Option<Room>, ServiceError>;
    async fn set_room_members(
        &self,
        id: &RoomId,
        member_uids: Vec<UserId>,
        member_count: u32,
    ) -> Result<(), ServiceError>;
    async fn upsert_member(&self, room: &RoomId, member: Member) -> Result<(), ServiceError>;
    async fn members(&self, room: &RoomId) -> Result<Vec<Member>, ServiceError>;
    /// Remove the room record and everything under it: members, candidate
    /// queues, invites.
    async fn delete_room_recursive(&self, room: &RoomId) -> Result<(), ServiceError>;
    async fn insert_invite(&self, invite: RoomInvite) -> Result<(), ServiceError>;
    async fn invite(&self, id: &ProposalId) -> Result<Option<RoomInvite>, ServiceError>;
    /// Pending invites addressed to `to`, for the recipient's inbox.
    async fn pending_invites_for(&self, to: &UserId) -> Result<Vec<RoomInvite>, ServiceError>;
    async fn set_invite_status(
        &self,
        id: &ProposalId,
        status: ProposalStatus,
    ) -> Result<(), ServiceError>;

    // Change feeds for the denormalizing watchers.
    /// Emits the room ID on every member-record write or removal.
    async fn watch_member_writes(&self) -> mpsc::UnboundedReceiver<RoomId>;
    /// Emits every liveness flip as (identity, online).
    async fn watch_liveness(&self) -> mpsc::UnboundedReceiver<(UserId, bool)>;
}
