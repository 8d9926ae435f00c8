use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Mutex;
use talkie_core::{
    FriendEdge, FriendRequest, IceCandidate, Member, ProposalId, ProposalStatus, Role, Room,
    RoomId, RoomInvite, ServiceError, SessionDescription, ShortId, TimestampMs, UserId,
    UserProfile,
};
use talkie_directory::{AllocatorState, AllocatorStore, DirectoryStore};
use talkie_session::{LivenessStore, SignalingChannel};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

type RoomSubscribers = Vec<mpsc::UnboundedSender<Room>>;
type CandidateSubscribers = Vec<mpsc::UnboundedSender<IceCandidate>>;

/// In-process document store. One instance plays all three backend parts:
/// the signaling mailbox, the directory collections and the ephemeral
/// liveness store.
///
/// Notification semantics match what the consumers are written against:
/// room snapshots go to every subscriber including the writer, candidate
/// queues replay from the start on every (re)subscribe, and member-record
/// writes feed a change stream for the denormalizing watchers. Room
/// destruction itself does not feed that stream, so a recount can never
/// chase a room it just deleted.
pub struct MemoryStore {
    profiles: DashMap<UserId, UserProfile>,
    short_ids: DashMap<ShortId, UserId>,
    allocator_states: DashMap<String, AllocatorState>,
    claims: DashMap<(String, String), String>,

    friend_edges: DashMap<String, FriendEdge>,
    friend_requests: DashMap<ProposalId, FriendRequest>,
    invites: DashMap<ProposalId, RoomInvite>,

    rooms: DashMap<RoomId, Room>,
    members: DashMap<RoomId, BTreeMap<UserId, Member>>,
    candidates: DashMap<(RoomId, Role), Vec<IceCandidate>>,

    room_subscribers: DashMap<RoomId, RoomSubscribers>,
    candidate_subscribers: DashMap<(RoomId, Role), CandidateSubscribers>,
    member_write_subscribers: Mutex<Vec<mpsc::UnboundedSender<RoomId>>>,

    liveness: DashMap<UserId, bool>,
    liveness_subscribers: Mutex<Vec<mpsc::UnboundedSender<(UserId, bool)>>>,
    disconnect_hooks: Mutex<Vec<UserId>>,
    connected_tx: watch::Sender<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (connected_tx, _) = watch::channel(true);
        Self {
            profiles: DashMap::new(),
            short_ids: DashMap::new(),
            allocator_states: DashMap::new(),
            claims: DashMap::new(),
            friend_edges: DashMap::new(),
            friend_requests: DashMap::new(),
            invites: DashMap::new(),
            rooms: DashMap::new(),
            members: DashMap::new(),
            candidates: DashMap::new(),
            room_subscribers: DashMap::new(),
            candidate_subscribers: DashMap::new(),
            member_write_subscribers: Mutex::new(Vec::new()),
            liveness: DashMap::new(),
            liveness_subscribers: Mutex::new(Vec::new()),
            disconnect_hooks: Mutex::new(Vec::new()),
            connected_tx,
        }
    }

    /// Simulate losing the backend connection: flips the connectivity
    /// signal and fires every queued disconnect hook, exactly as the real
    /// store would server-side.
    pub fn simulate_disconnect(&self) {
        let _ = self.connected_tx.send(false);
        let hooks: Vec<UserId> = self
            .disconnect_hooks
            .lock()
            .expect("disconnect hooks poisoned")
            .drain(..)
            .collect();
        for uid in hooks {
            debug!(%uid, "disconnect hook firing");
            self.write_liveness(&uid, false);
        }
    }

    /// Simulate the backend connection coming back.
    pub fn simulate_reconnect(&self) {
        let _ = self.connected_tx.send(true);
    }

    /// Point-in-time room read on the concrete type, bypassing the trait
    /// methods of the same name.
    pub fn snapshot(&self, id: &RoomId) -> Option<Room> {
        self.rooms.get(id).map(|r| r.clone())
    }

    fn write_liveness(&self, uid: &UserId, online: bool) {
        self.liveness.insert(uid.clone(), online);
        self.liveness_subscribers
            .lock()
            .expect("liveness subscribers poisoned")
            .retain(|tx| tx.send((uid.clone(), online)).is_ok());
    }

    /// Deliver the room's current snapshot to every subscriber, the writer
    /// included.
    fn notify_room(&self, id: &RoomId) {
        let Some(room) = self.rooms.get(id).map(|r| r.clone()) else {
            return;
        };
        if let Some(mut subscribers) = self.room_subscribers.get_mut(id) {
            subscribers.retain(|tx| tx.send(room.clone()).is_ok());
        }
    }

    fn notify_member_write(&self, id: &RoomId) {
        self.member_write_subscribers
            .lock()
            .expect("member write subscribers poisoned")
            .retain(|tx| tx.send(id.clone()).is_ok());
    }

    fn update_room<F>(&self, id: &RoomId, apply: F) -> Result<(), ServiceError>
    where
        F: FnOnce(&mut Room),
    {
        {
            let mut room = self
                .rooms
                .get_mut(id)
                .ok_or_else(|| ServiceError::NotFound("room not found".to_owned()))?;
            apply(&mut room);
        }
        self.notify_room(id);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalingChannel for MemoryStore {
    async fn room(&self, room: &RoomId) -> Result<Room, ServiceError> {
        self.rooms
            .get(room)
            .map(|r| r.clone())
            .ok_or_else(|| ServiceError::NotFound("room not found".to_owned()))
    }

    /// Starts a fresh handshake: the previous answer, if any, is cleared in
    /// the same write.
    async fn publish_offer(
        &self,
        room: &RoomId,
        description: SessionDescription,
    ) -> Result<(), ServiceError> {
        debug!(%room, "offer published");
        self.update_room(room, |r| {
            r.offer = Some(description);
            r.answer = None;
        })
    }

    async fn publish_answer(
        &self,
        room: &RoomId,
        description: SessionDescription,
    ) -> Result<(), ServiceError> {
        debug!(%room, "answer published");
        self.update_room(room, |r| r.answer = Some(description))
    }

    async fn append_candidate(
        &self,
        room: &RoomId,
        role: Role,
        candidate: IceCandidate,
    ) -> Result<(), ServiceError> {
        if !self.rooms.contains_key(room) {
            return Err(ServiceError::NotFound("room not found".to_owned()));
        }
        let key = (room.clone(), role);
        self.candidates
            .entry(key.clone())
            .or_default()
            .push(candidate.clone());
        trace!(%room, %role, "candidate appended");
        if let Some(mut subscribers) = self.candidate_subscribers.get_mut(&key) {
            subscribers.retain(|tx| tx.send(candidate.clone()).is_ok());
        }
        Ok(())
    }

    async fn watch_room(
        &self,
        room: &RoomId,
    ) -> Result<mpsc::UnboundedReceiver<Room>, ServiceError> {
        let snapshot = self
            .rooms
            .get(room)
            .map(|r| r.clone())
            .ok_or_else(|| ServiceError::NotFound("room not found".to_owned()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        // Initial delivery of the current state, like any snapshot listener.
        let _ = tx.send(snapshot);
        self.room_subscribers
            .entry(room.clone())
            .or_default()
            .push(tx);
        Ok(rx)
    }

    async fn watch_candidates(
        &self,
        room: &RoomId,
        role: Role,
    ) -> Result<mpsc::UnboundedReceiver<IceCandidate>, ServiceError> {
        if !self.rooms.contains_key(room) {
            return Err(ServiceError::NotFound("room not found".to_owned()));
        }
        let key = (room.clone(), role);
        let (tx, rx) = mpsc::unbounded_channel();
        // Replay the whole queue in append order before going live.
        if let Some(existing) = self.candidates.get(&key) {
            for candidate in existing.iter() {
                let _ = tx.send(candidate.clone());
            }
        }
        self.candidate_subscribers.entry(key).or_default().push(tx);
        Ok(rx)
    }

    async fn upsert_member(&self, room: &RoomId, member: Member) -> Result<(), ServiceError> {
        if !self.rooms.contains_key(room) {
            return Err(ServiceError::NotFound("room not found".to_owned()));
        }
        self.members
            .entry(room.clone())
            .or_default()
            .insert(member.uid.clone(), member);
        self.notify_member_write(room);
        Ok(())
    }

    async fn touch_member(
        &self,
        room: &RoomId,
        uid: &UserId,
        at: TimestampMs,
    ) -> Result<(), ServiceError> {
        if let Some(mut members) = self.members.get_mut(room) {
            if let Some(member) = members.get_mut(uid) {
                member.last_seen_at = at;
            }
        }
        Ok(())
    }

    async fn mark_member_offline(
        &self,
        room: &RoomId,
        uid: &UserId,
    ) -> Result<(), ServiceError> {
        if let Some(mut members) = self.members.get_mut(room) {
            if let Some(member) = members.get_mut(uid) {
                member.online = false;
            }
        }
        self.notify_member_write(room);
        Ok(())
    }

    async fn remove_member(&self, room: &RoomId, uid: &UserId) -> Result<(), ServiceError> {
        let removed = self
            .members
            .get_mut(room)
            .map(|mut members| members.remove(uid).is_some())
            .unwrap_or(false);
        if removed {
            debug!(%room, %uid, "member removed");
            self.notify_member_write(room);
        }
        Ok(())
    }
}

#[async_trait]
impl LivenessStore for MemoryStore {
    async fn watch_connected(&self) -> watch::Receiver<bool> {
        self.connected_tx.subscribe()
    }

    async fn on_disconnect_set_offline(&self, uid: &UserId) -> Result<(), ServiceError> {
        let mut hooks = self
            .disconnect_hooks
            .lock()
            .expect("disconnect hooks poisoned");
        if !hooks.contains(uid) {
            hooks.push(uid.clone());
        }
        Ok(())
    }

    async fn set_online(&self, uid: &UserId) -> Result<(), ServiceError> {
        self.write_liveness(uid, true);
        Ok(())
    }

    async fn set_offline(&self, uid: &UserId) -> Result<(), ServiceError> {
        self.write_liveness(uid, false);
        Ok(())
    }
}

#[async_trait]
impl AllocatorStore for MemoryStore {
    async fn allocator_state(
        &self,
        scope: &str,
        initial_width: u32,
    ) -> Result<AllocatorState, ServiceError> {
        Ok(*self
            .allocator_states
            .entry(scope.to_owned())
            .or_insert_with(|| AllocatorState::new(initial_width)))
    }

    async fn compare_and_swap_state(
        &self,
        scope: &str,
        expected: AllocatorState,
        next: AllocatorState,
    ) -> Result<bool, ServiceError> {
        // The entry guard holds the shard lock, making the swap atomic.
        match self.allocator_states.entry(scope.to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(mut slot) if *slot.get() == expected => {
                slot.insert(next);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn try_claim(
        &self,
        scope: &str,
        candidate: &ShortId,
        owner: &str,
    ) -> Result<bool, ServiceError> {
        let key = (scope.to_owned(), candidate.as_str().to_owned());
        match self.claims.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(owner.to_owned());
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn profile(&self, uid: &UserId) -> Result<Option<UserProfile>, ServiceError> {
        Ok(self.profiles.get(uid).map(|p| p.clone()))
    }

    async fn upsert_profile(&self, profile: UserProfile) -> Result<(), ServiceError> {
        self.profiles.insert(profile.uid.clone(), profile);
        Ok(())
    }

    async fn set_profile_online(&self, uid: &UserId, online: bool) -> Result<(), ServiceError> {
        if let Some(mut profile) = self.profiles.get_mut(uid) {
            profile.online = online;
        }
        Ok(())
    }

    async fn set_profile_short_id(
        &self,
        uid: &UserId,
        short_id: &ShortId,
    ) -> Result<(), ServiceError> {
        let mut profile = self
            .profiles
            .get_mut(uid)
            .ok_or_else(|| ServiceError::NotFound("profile not found".to_owned()))?;
        match &profile.short_id {
            Some(existing) if existing != short_id => {
                return Err(ServiceError::FailedPrecondition(
                    "short ID already assigned".to_owned(),
                ));
            }
            _ => {}
        }
        profile.short_id = Some(short_id.clone());
        self.short_ids.insert(short_id.clone(), uid.clone());
        Ok(())
    }

    async fn lookup_short_id(&self, short_id: &ShortId) -> Result<Option<UserId>, ServiceError> {
        Ok(self.short_ids.get(short_id).map(|uid| uid.clone()))
    }

    async fn friend_edge_exists(&self, pair_id: &str) -> Result<bool, ServiceError> {
        Ok(self.friend_edges.contains_key(pair_id))
    }

    async fn insert_friend_edge(&self, edge: FriendEdge) -> Result<(), ServiceError> {
        self.friend_edges.insert(edge.pair_id.clone(), edge);
        Ok(())
    }

    async fn pending_request_between(
        &self,
        from: &UserId,
        to: &UserId,
    ) -> Result<bool, ServiceError> {
        Ok(self.friend_requests.iter().any(|r| {
            r.status == ProposalStatus::Pending && r.from == *from && r.to == *to
        }))
    }

    async fn insert_friend_request(&self, request: FriendRequest) -> Result<(), ServiceError> {
        self.friend_requests.insert(request.id.clone(), request);
        Ok(())
    }

    async fn friend_request(
        &self,
        id: &ProposalId,
    ) -> Result<Option<FriendRequest>, ServiceError> {
        Ok(self.friend_requests.get(id).map(|r| r.clone()))
    }

    async fn pending_requests_for(
        &self,
        to: &UserId,
    ) -> Result<Vec<FriendRequest>, ServiceError> {
        Ok(self
            .friend_requests
            .iter()
            .filter(|r| r.status == ProposalStatus::Pending && r.to == *to)
            .map(|r| r.clone())
            .collect())
    }

    async fn set_friend_request_status(
        &self,
        id: &ProposalId,
        status: ProposalStatus,
    ) -> Result<(), ServiceError> {
        let mut request = self
            .friend_requests
            .get_mut(id)
            .ok_or_else(|| ServiceError::NotFound("friend request not found".to_owned()))?;
        request.status = status;
        Ok(())
    }

    async fn insert_room(&self, room: Room) -> Result<(), ServiceError> {
        debug!(id = %room.id, name = %room.name, "room inserted");
        self.rooms.insert(room.id.clone(), room);
        Ok(())
    }

    async fn room(&self, id: &RoomId) -> Result<Option<Room>, ServiceError> {
        Ok(self.rooms.get(id).map(|r| r.clone()))
    }

    async fn set_room_members(
        &self,
        id: &RoomId,
        member_uids: Vec<UserId>,
        member_count: u32,
    ) -> Result<(), ServiceError> {
        self.update_room(id, |room| {
            room.member_uids = member_uids;
            room.member_count = member_count;
        })
    }

    async fn upsert_member(&self, room: &RoomId, member: Member) -> Result<(), ServiceError> {
        SignalingChannel::upsert_member(self, room, member).await
    }

    async fn members(&self, room: &RoomId) -> Result<Vec<Member>, ServiceError> {
        Ok(self
            .members
            .get(room)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default())
    }

    /// Drops the room record and everything keyed under it. Deliberately
    /// does not emit a member-write event.
    async fn delete_room_recursive(&self, room: &RoomId) -> Result<(), ServiceError> {
        debug!(%room, "room destroyed");
        self.rooms.remove(room);
        self.members.remove(room);
        self.room_subscribers.remove(room);
        for role in [Role::Caller, Role::Callee] {
            self.candidates.remove(&(room.clone(), role));
            self.candidate_subscribers.remove(&(room.clone(), role));
        }
        self.invites.retain(|_, invite| invite.room_id != *room);
        Ok(())
    }

    async fn insert_invite(&self, invite: RoomInvite) -> Result<(), ServiceError> {
        self.invites.insert(invite.id.clone(), invite);
        Ok(())
    }

    async fn invite(&self, id: &ProposalId) -> Result<Option<RoomInvite>, ServiceError> {
        Ok(self.invites.get(id).map(|i| i.clone()))
    }

    async fn pending_invites_for(&self, to: &UserId) -> Result<Vec<RoomInvite>, ServiceError> {
        Ok(self
            .invites
            .iter()
            .filter(|i| i.status == ProposalStatus::Pending && i.to == *to)
            .map(|i| i.clone())
            .collect())
    }

    async fn set_invite_status(
        &self,
        id: &ProposalId,
        status: ProposalStatus,
    ) -> Result<(), ServiceError> {
        let mut invite = self
            .invites
            .get_mut(id)
            .ok_or_else(|| ServiceError::NotFound("invite not found".to_owned()))?;
        invite.status = status;
        Ok(())
    }

    async fn watch_member_writes(&self) -> mpsc::UnboundedReceiver<RoomId> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.member_write_subscribers
            .lock()
            .expect("member write subscribers poisoned")
            .push(tx);
        rx
    }

    async fn watch_liveness(&self) -> mpsc::UnboundedReceiver<(UserId, bool)> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.liveness_subscribers
            .lock()
            .expect("liveness subscribers poisoned")
            .push(tx);
        rx
    }
}
