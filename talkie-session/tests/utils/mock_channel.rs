use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use talkie_core::{
    IceCandidate, Member, Role, Room, RoomId, ServiceError, SessionDescription, TimestampMs,
    UserId,
};
use talkie_session::SignalingChannel;
use tokio::sync::mpsc;

/// Scripted signaling backend for a single room. The test plays the remote
/// peer and the store at once: it can mutate the room record, fan out
/// redundant snapshots, and inspect every member write the session makes.
pub struct MockChannel {
    room: Mutex<Room>,
    room_subscribers: Mutex<Vec<mpsc::UnboundedSender<Room>>>,
    queues: Mutex<HashMap<Role, Vec<IceCandidate>>>,
    candidate_subscribers: Mutex<HashMap<Role, Vec<mpsc::UnboundedSender<IceCandidate>>>>,
    pub offers_published: AtomicUsize,
    pub answers_published: AtomicUsize,
    /// Member writes in order, e.g. "upsert:uid-a", "offline:uid-a".
    pub member_log: Mutex<Vec<String>>,
}

impl MockChannel {
    pub fn new(room: Room) -> Arc<Self> {
        Arc::new(Self {
            room: Mutex::new(room),
            room_subscribers: Mutex::new(Vec::new()),
            queues: Mutex::new(HashMap::new()),
            candidate_subscribers: Mutex::new(HashMap::new()),
            offers_published: AtomicUsize::new(0),
            answers_published: AtomicUsize::new(0),
            member_log: Mutex::new(Vec::new()),
        })
    }

    pub fn snapshot(&self) -> Room {
        self.room.lock().unwrap().clone()
    }

    /// Fan the current snapshot out again, simulating a redundant
    /// at-least-once delivery.
    pub fn renotify(&self) {
        let room = self.snapshot();
        self.room_subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(room.clone()).is_ok());
    }

    /// The remote peer (or a server-side watcher) writing the room record.
    pub fn mutate_room(&self, apply: impl FnOnce(&mut Room)) {
        apply(&mut self.room.lock().unwrap());
        self.renotify();
    }

    /// The remote peer appending to its own candidate queue.
    pub fn remote_candidate(&self, role: Role, candidate: IceCandidate) {
        self.queues
            .lock()
            .unwrap()
            .entry(role)
            .or_default()
            .push(candidate.clone());
        if let Some(subscribers) = self.candidate_subscribers.lock().unwrap().get_mut(&role) {
            subscribers.retain(|tx| tx.send(candidate.clone()).is_ok());
        }
    }

    /// Contents of one role's candidate queue.
    pub fn queue(&self, role: Role) -> Vec<IceCandidate> {
        self.queues
            .lock()
            .unwrap()
            .get(&role)
            .cloned()
            .unwrap_or_default()
    }

    pub fn member_log(&self) -> Vec<String> {
        self.member_log.lock().unwrap().clone()
    }

    fn log(&self, entry: String) {
        self.member_log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl SignalingChannel for MockChannel {
    async fn room(&self, _room: &RoomId) -> Result<Room, ServiceError> {
        Ok(self.snapshot())
    }

    async fn publish_offer(
        &self,
        _room: &RoomId,
        description: SessionDescription,
    ) -> Result<(), ServiceError> {
        self.offers_published.fetch_add(1, Ordering::SeqCst);
        self.mutate_room(|r| {
            r.offer = Some(description);
            r.answer = None;
        });
        Ok(())
    }

    async fn publish_answer(
        &self,
        _room: &RoomId,
        description: SessionDescription,
    ) -> Result<(), ServiceError> {
        self.answers_published.fetch_add(1, Ordering::SeqCst);
        self.mutate_room(|r| r.answer = Some(description));
        Ok(())
    }

    async fn append_candidate(
        &self,
        _room: &RoomId,
        role: Role,
        candidate: IceCandidate,
    ) -> Result<(), ServiceError> {
        self.remote_candidate(role, candidate);
        Ok(())
    }

    async fn watch_room(
        &self,
        _room: &RoomId,
    ) -> Result<mpsc::UnboundedReceiver<Room>, ServiceError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(self.snapshot());
        self.room_subscribers.lock().unwrap().push(tx);
        Ok(rx)
    }

    async fn watch_candidates(
        &self,
        _room: &RoomId,
        role: Role,
    ) -> Result<mpsc::UnboundedReceiver<IceCandidate>, ServiceError> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(existing) = self.queues.lock().unwrap().get(&role) {
            for candidate in existing {
                let _ = tx.send(candidate.clone());
            }
        }
        self.candidate_subscribers
            .lock()
            .unwrap()
            .entry(role)
            .or_default()
            .push(tx);
        Ok(rx)
    }

    async fn upsert_member(&self, _room: &RoomId, member: Member) -> Result<(), ServiceError> {
        self.log(format!("upsert:{}", member.uid));
        Ok(())
    }

    async fn touch_member(
        &self,
        _room: &RoomId,
        uid: &UserId,
        _at: TimestampMs,
    ) -> Result<(), ServiceError> {
        self.log(format!("touch:{uid}"));
        Ok(())
    }

    async fn mark_member_offline(
        &self,
        _room: &RoomId,
        uid: &UserId,
    ) -> Result<(), ServiceError> {
        self.log(format!("offline:{uid}"));
        Ok(())
    }

    async fn remove_member(&self, _room: &RoomId, uid: &UserId) -> Result<(), ServiceError> {
        self.log(format!("remove:{uid}"));
        Ok(())
    }
}
