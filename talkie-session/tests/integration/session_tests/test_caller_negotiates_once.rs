use crate::integration::{
    connect_as_caller, start_session, LOCAL_CALLEE_UID, LOCAL_CALLER_UID,
};
use crate::utils::{wait_until, MockMediaSource};
use std::sync::atomic::Ordering;
use std::time::Duration;
use talkie_core::{IceCandidate, Role, SdpKind};
use talkie_session::SessionConfig;

#[tokio::test]
async fn caller_publishes_one_offer_despite_duplicate_snapshots() {
    let session = start_session(
        LOCAL_CALLER_UID,
        LOCAL_CALLEE_UID,
        MockMediaSource::granting(),
        SessionConfig::default(),
    );

    // The remote peer's queue has history before we ever subscribe; the
    // replay must be absorbed exactly once.
    session
        .channel
        .remote_candidate(Role::Callee, IceCandidate::new("candidate:remote-1"));

    connect_as_caller(&session).await.expect("no connection");

    // Redundant snapshot deliveries change nothing.
    session.channel.renotify();
    session.channel.renotify();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(session.channel.offers_published.load(Ordering::SeqCst), 1);
    let probe = session.transports.probe(0);
    assert_eq!(probe.offers_created.load(Ordering::SeqCst), 1);
    assert_eq!(probe.answers_created.load(Ordering::SeqCst), 0);

    let remote = probe.remote_descriptions();
    assert_eq!(remote.len(), 1, "remote answer applied more than once");
    assert_eq!(remote[0].kind, SdpKind::Answer);

    // Local candidates land in the caller's queue.
    wait_until("local candidate to be appended", || {
        let channel = session.channel.clone();
        async move {
            channel
                .queue(Role::Caller)
                .iter()
                .any(|c| c.candidate == "candidate:local-1")
        }
    })
    .await
    .expect("local candidate never appended");

    // A duplicate of an already-ingested remote candidate is dropped.
    session
        .channel
        .remote_candidate(Role::Callee, IceCandidate::new("candidate:remote-1"));
    session
        .channel
        .remote_candidate(Role::Callee, IceCandidate::new("candidate:remote-2"));
    wait_until("fresh remote candidate to be ingested", || {
        let probe = probe.clone();
        async move {
            probe
                .ingested_candidates()
                .iter()
                .any(|c| c.candidate == "candidate:remote-2")
        }
    })
    .await
    .expect("fresh candidate never ingested");

    let ingested = probe.ingested_candidates();
    let replays = ingested
        .iter()
        .filter(|c| c.candidate == "candidate:remote-1")
        .count();
    assert_eq!(replays, 1, "replayed candidate ingested more than once");
}
