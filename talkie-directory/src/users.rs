use crate::allocator::{AllocatorPolicy, IdAllocator};
use crate::store::DirectoryStore;
use crate::USER_ID_SCOPE;
use std::sync::Arc;
use talkie_core::{now_ms, ServiceError, ShortId, UserId, UserProfile};
use tracing::info;

/// Profile bootstrap and short-ID assignment, the signup path of the
/// callable layer.
pub struct UserService {
    store: Arc<dyn DirectoryStore>,
    allocator: IdAllocator,
}

impl UserService {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        let allocator = IdAllocator::new(
            store.clone(),
            USER_ID_SCOPE,
            AllocatorPolicy::user_ids(),
        );
        Self { store, allocator }
    }

    /// Create the profile document if this identity has none yet.
    pub async fn ensure_profile(
        &self,
        uid: &UserId,
        display_name: &str,
    ) -> Result<UserProfile, ServiceError> {
        if let Some(profile) = self.store.profile(uid).await? {
            return Ok(profile);
        }
        let name = display_name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "please choose a username".to_owned(),
            ));
        }
        let profile = UserProfile::new(uid.clone(), name, now_ms());
        self.store.upsert_profile(profile.clone()).await?;
        info!(%uid, "profile created");
        Ok(profile)
    }

    /// Assign a short ID if the identity has none. The mapping is injective
    /// and immutable once written.
    pub async fn ensure_short_id(&self, uid: &UserId) -> Result<ShortId, ServiceError> {
        let profile = self
            .store
            .profile(uid)
            .await?
            .ok_or_else(|| ServiceError::NotFound("no profile for this identity".to_owned()))?;
        if let Some(existing) = profile.short_id {
            return Ok(existing);
        }
        let short_id = self.allocator.allocate(uid.as_str()).await?;
        self.store.set_profile_short_id(uid, &short_id).await?;
        info!(%uid, %short_id, "short ID assigned");
        Ok(short_id)
    }
}
