pub mod negotiation_tests;

use crate::utils::{MockMediaSource, MockTransportFactory};
use std::sync::Arc;
use talkie_core::{RoomId, UserId};
use talkie_directory::{
    run_membership_watcher, run_presence_mirror, DirectoryStore, FriendService, RoomService,
    UserService,
};
use talkie_session::{LocalIdentity, Session, SessionConfig, SessionHandle};
use talkie_store::MemoryStore;
use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// One store with the denormalizing watchers running, as deployed.
pub struct TestBackend {
    pub store: Arc<MemoryStore>,
    pub users: UserService,
    pub friends: FriendService,
    pub rooms: RoomService,
}

pub fn create_test_backend() -> TestBackend {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    run_membership_watcher(store.clone());
    run_presence_mirror(store.clone());
    TestBackend {
        users: UserService::new(store.clone()),
        friends: FriendService::new(store.clone()),
        rooms: RoomService::new(store.clone()),
        store,
    }
}

/// Sign up an identity: profile plus short ID, retrying through the
/// allocator's retryable exhaustion like a real caller.
pub async fn signup(backend: &TestBackend, uid: &str, name: &str) -> UserId {
    let uid = UserId::from(uid);
    backend
        .users
        .ensure_profile(&uid, name)
        .await
        .expect("profile creation failed");
    for _ in 0..100 {
        match backend.users.ensure_short_id(&uid).await {
            Ok(_) => return uid,
            Err(err) if err.is_retryable() => continue,
            Err(err) => panic!("short ID assignment failed: {err}"),
        }
    }
    panic!("short ID assignment never succeeded");
}

/// Spawn a full session for `uid` against the shared store, with its own
/// scripted transport and capture source.
pub async fn spawn_session(
    backend: &TestBackend,
    uid: &UserId,
    room_id: &RoomId,
    tag: &str,
) -> (
    SessionHandle,
    Arc<MockTransportFactory>,
    Arc<MockMediaSource>,
) {
    let profile = backend
        .store
        .profile(uid)
        .await
        .expect("profile read failed")
        .expect("profile missing");
    let identity = LocalIdentity {
        uid: uid.clone(),
        display_name: profile.display_name,
        short_id: profile.short_id,
    };
    let transports = MockTransportFactory::new(tag);
    let media = MockMediaSource::granting();
    let (session, handle) = Session::new(
        identity,
        room_id.clone(),
        backend.store.clone(),
        media.clone(),
        transports.clone(),
        SessionConfig::default(),
    );
    tokio::spawn(session.run());
    (handle, transports, media)
}
