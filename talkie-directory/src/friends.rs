use crate::store::DirectoryStore;
use std::sync::Arc;
use talkie_core::{
    now_ms, FriendEdge, FriendRequest, ProposalId, ProposalStatus, ServiceError, ShortId, UserId,
};
use tracing::info;

/// Friend request flow. Preconditions that are part of normal use (already
/// friends, request already pending) come back as friendly messages, not
/// errors.
pub struct FriendService {
    store: Arc<dyn DirectoryStore>,
}

impl FriendService {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// Send a request addressed by the recipient's numeric short ID.
    /// Returns the message to show the sender.
    pub async fn send_friend_request(
        &self,
        from: &UserId,
        short_id_digits: &str,
    ) -> Result<String, ServiceError> {
        let short_id = ShortId::parse(short_id_digits)?;
        let to = self
            .store
            .lookup_short_id(&short_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("no user with that ID".to_owned()))?;

        if &to == from {
            return Err(ServiceError::FailedPrecondition(
                "you can't add yourself".to_owned(),
            ));
        }

        let pair_id = FriendEdge::pair_id(from, &to);
        if self.store.friend_edge_exists(&pair_id).await? {
            return Ok("you are already friends".to_owned());
        }
        if self.store.pending_request_between(from, &to).await? {
            return Ok("request already pending".to_owned());
        }

        let from_profile = self.store.profile(from).await?;
        let to_profile = self.store.profile(&to).await?;
        let request = FriendRequest {
            id: ProposalId::new(),
            from: from.clone(),
            to: to.clone(),
            from_short_id: from_profile.and_then(|p| p.short_id),
            to_short_id: to_profile.and_then(|p| p.short_id),
            status: ProposalStatus::Pending,
            created_at: now_ms(),
        };
        self.store.insert_friend_request(request).await?;
        info!(%from, %to, "friend request sent");
        Ok("friend request sent".to_owned())
    }

    /// The recipient's inbox of pending requests.
    pub async fn incoming_requests(
        &self,
        to: &UserId,
    ) -> Result<Vec<FriendRequest>, ServiceError> {
        self.store.pending_requests_for(to).await
    }

    /// Accept or reject. Only the recipient may respond; responding to a
    /// request that is no longer pending is a no-op.
    pub async fn respond_friend_request(
        &self,
        actor: &UserId,
        id: &ProposalId,
        accept: bool,
    ) -> Result<(), ServiceError> {
        let request = self
            .store
            .friend_request(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("request not found".to_owned()))?;

        if &request.to != actor {
            return Err(ServiceError::PermissionDenied(
                "not your request".to_owned(),
            ));
        }
        if request.status != ProposalStatus::Pending {
            return Ok(());
        }

        if accept {
            let edge = FriendEdge::new(request.from.clone(), request.to.clone(), now_ms());
            self.store.insert_friend_edge(edge).await?;
            self.store
                .set_friend_request_status(id, ProposalStatus::Accepted)
                .await?;
            info!(from = %request.from, to = %request.to, "friend request accepted");
        } else {
            self.store
                .set_friend_request_status(id, ProposalStatus::Rejected)
                .await?;
        }
        Ok(())
    }
}
