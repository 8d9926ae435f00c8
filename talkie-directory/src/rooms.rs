use crate::allocator::{AllocatorPolicy, IdAllocator};
use crate::store::DirectoryStore;
use crate::ROOM_CODE_SCOPE;
use std::sync::Arc;
use talkie_core::{
    now_ms, Member, ProposalId, ProposalStatus, Room, RoomId, RoomInvite, ServiceError, UserId,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

const MAX_ROOM_NAME_LEN: usize = 64;

/// Room creation and the invite flow.
pub struct RoomService {
    store: Arc<dyn DirectoryStore>,
    codes: IdAllocator,
}

impl RoomService {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        let codes = IdAllocator::new(
            store.clone(),
            ROOM_CODE_SCOPE,
            AllocatorPolicy::room_codes(),
        );
        Self { store, codes }
    }

    /// Create a room with a hidden numeric code and the creator as sole
    /// member.
    pub async fn create_room(&self, creator: &UserId, name: &str) -> Result<Room, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "room name required".to_owned(),
            ));
        }
        let name: String = name.chars().take(MAX_ROOM_NAME_LEN).collect();

        let profile = self
            .store
            .profile(creator)
            .await?
            .ok_or_else(|| ServiceError::NotFound("no profile for this identity".to_owned()))?;

        let code = self.codes.allocate(creator.as_str()).await?;
        let room = Room::new(name, code, creator.clone(), now_ms());
        self.store.insert_room(room.clone()).await?;

        let member = Member::new(
            creator.clone(),
            profile.display_name,
            profile.short_id,
            now_ms(),
        );
        self.store.upsert_member(&room.id, member).await?;

        info!(room = %room.id, %creator, "room created");
        Ok(room)
    }

    /// Invite another identity. Only members may invite.
    pub async fn send_invite(
        &self,
        from: &UserId,
        room_id: &RoomId,
        to: &UserId,
    ) -> Result<RoomInvite, ServiceError> {
        let room = self
            .store
            .room(room_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("room not found".to_owned()))?;
        if !room.is_member(from) {
            return Err(ServiceError::PermissionDenied(
                "only members can invite".to_owned(),
            ));
        }

        let from_name = self
            .store
            .profile(from)
            .await?
            .map(|p| p.display_name)
            .unwrap_or_else(|| "User".to_owned());

        let invite = RoomInvite {
            id: ProposalId::new(),
            room_id: room_id.clone(),
            room_name: room.name,
            from: from.clone(),
            from_name,
            to: to.clone(),
            status: ProposalStatus::Pending,
            created_at: now_ms(),
        };
        self.store.insert_invite(invite.clone()).await?;
        info!(room = %room_id, %from, %to, "room invite sent");
        Ok(invite)
    }

    /// The recipient's inbox of pending invites.
    pub async fn incoming_invites(
        &self,
        to: &UserId,
    ) -> Result<Vec<RoomInvite>, ServiceError> {
        self.store.pending_invites_for(to).await
    }

    /// Accept or reject an invite. Accepting adds the recipient to the
    /// member set and count together, then flips the invite status; a
    /// non-pending invite is a no-op success.
    pub async fn respond_invite(
        &self,
        actor: &UserId,
        id: &ProposalId,
        accept: bool,
    ) -> Result<(), ServiceError> {
        let invite = self
            .store
            .invite(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("invite not found".to_owned()))?;
        if &invite.to != actor {
            return Err(ServiceError::PermissionDenied("not your invite".to_owned()));
        }
        if invite.status != ProposalStatus::Pending {
            return Ok(());
        }

        if !accept {
            return self
                .store
                .set_invite_status(id, ProposalStatus::Rejected)
                .await;
        }

        let room = self
            .store
            .room(&invite.room_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("room not found".to_owned()))?;

        if !room.is_member(actor) {
            let mut member_uids = room.member_uids;
            member_uids.push(actor.clone());
            let count = member_uids.len() as u32;
            self.store
                .set_room_members(&invite.room_id, member_uids, count)
                .await?;

            let profile = self.store.profile(actor).await?;
            let member = Member::new(
                actor.clone(),
                profile
                    .as_ref()
                    .map(|p| p.display_name.clone())
                    .unwrap_or_else(|| "User".to_owned()),
                profile.and_then(|p| p.short_id),
                now_ms(),
            );
            self.store.upsert_member(&invite.room_id, member).await?;
        }

        self.store
            .set_invite_status(id, ProposalStatus::Accepted)
            .await?;
        info!(room = %invite.room_id, %actor, "invite accepted");
        Ok(())
    }
}

/// Keeps `member_uids`/`member_count` consistent with the live member
/// records and destroys the room once the last member leaves.
pub fn run_membership_watcher(store: Arc<dyn DirectoryStore>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut writes = store.watch_member_writes().await;
        while let Some(room_id) = writes.recv().await {
            let members = match store.members(&room_id).await {
                Ok(members) => members,
                Err(err) => {
                    warn!(room = %room_id, %err, "member recount failed");
                    continue;
                }
            };

            if members.is_empty() {
                info!(room = %room_id, "last member left, destroying room");
                if let Err(err) = store.delete_room_recursive(&room_id).await {
                    warn!(room = %room_id, %err, "room cleanup failed");
                }
                continue;
            }

            let uids: Vec<UserId> = members.iter().map(|m| m.uid.clone()).collect();
            let count = uids.len() as u32;
            if let Err(err) = store.set_room_members(&room_id, uids, count).await {
                warn!(room = %room_id, %err, "member recount write failed");
            }
        }
    })
}
