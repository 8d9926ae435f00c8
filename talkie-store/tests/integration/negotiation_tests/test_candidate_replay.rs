use crate::integration::init_tracing;
use talkie_core::{IceCandidate, Role, Room, ShortId, UserId};
use talkie_session::SignalingChannel;
use talkie_store::MemoryStore;

async fn store_with_room() -> (MemoryStore, talkie_core::RoomId) {
    init_tracing();
    let store = MemoryStore::new();
    let room = Room::new(
        "Net",
        ShortId::from_value(123456, 6),
        UserId::from("uid-a"),
        0,
    );
    let id = room.id.clone();
    talkie_directory::DirectoryStore::insert_room(&store, room)
        .await
        .expect("insert failed");
    (store, id)
}

#[tokio::test]
async fn candidate_queue_replays_on_resubscribe() {
    let (store, id) = store_with_room().await;

    for seq in 1..=2 {
        store
            .append_candidate(&id, Role::Caller, IceCandidate::new(format!("candidate:a-{seq}")))
            .await
            .expect("append failed");
    }

    let mut first = store
        .watch_candidates(&id, Role::Caller)
        .await
        .expect("subscribe failed");
    assert_eq!(first.recv().await.unwrap().candidate, "candidate:a-1");
    assert_eq!(first.recv().await.unwrap().candidate, "candidate:a-2");

    // A live append reaches the open subscription.
    store
        .append_candidate(&id, Role::Caller, IceCandidate::new("candidate:a-3"))
        .await
        .expect("append failed");
    assert_eq!(first.recv().await.unwrap().candidate, "candidate:a-3");

    // A later subscription replays the whole queue in append order.
    let mut second = store
        .watch_candidates(&id, Role::Caller)
        .await
        .expect("resubscribe failed");
    for expected in ["candidate:a-1", "candidate:a-2", "candidate:a-3"] {
        assert_eq!(second.recv().await.unwrap().candidate, expected);
    }
}

#[tokio::test]
async fn candidate_queues_are_partitioned_by_role() {
    let (store, id) = store_with_room().await;

    store
        .append_candidate(&id, Role::Caller, IceCandidate::new("candidate:a-1"))
        .await
        .expect("append failed");

    let mut callee = store
        .watch_candidates(&id, Role::Callee)
        .await
        .expect("subscribe failed");
    assert!(
        callee.try_recv().is_err(),
        "caller candidates leaked into the callee queue"
    );
}
