use crate::integration::{connect_as_caller, start_session, LOCAL_CALLEE_UID, LOCAL_CALLER_UID};
use crate::utils::{wait_for_state, wait_for_talking, MockMediaSource};
use std::sync::atomic::Ordering;
use talkie_session::{AudioTrack, NegotiationState, PressSource, SessionConfig};

#[tokio::test]
async fn leaving_releases_everything_and_cleans_the_member_record() {
    let session = start_session(
        LOCAL_CALLER_UID,
        LOCAL_CALLEE_UID,
        MockMediaSource::granting(),
        SessionConfig::default(),
    );
    connect_as_caller(&session).await.expect("no connection");

    // Leave mid-press: transmission must not outlive the session.
    session.handle.begin_talk(PressSource::Pointer).await;
    wait_for_talking(&session.handle, true)
        .await
        .expect("talk never started");

    session.handle.leave().await;
    wait_for_state(&session.handle, NegotiationState::Ended)
        .await
        .expect("session never ended");

    let probe = session.transports.probe(0);
    assert!(probe.closed.load(Ordering::SeqCst), "transport left open");
    let track = session.media.track(0);
    assert!(!track.enabled());
    assert!(track.stopped.load(Ordering::SeqCst), "capture left running");

    let log = session.channel.member_log();
    let join = log
        .iter()
        .position(|e| e == &format!("upsert:{LOCAL_CALLER_UID}"))
        .expect("member record never created");
    let offline = log
        .iter()
        .position(|e| e == &format!("offline:{LOCAL_CALLER_UID}"))
        .expect("member never marked offline");
    let removed = log
        .iter()
        .position(|e| e == &format!("remove:{LOCAL_CALLER_UID}"))
        .expect("member record never removed");
    assert!(join < offline && offline < removed);

    // Commands after the end are ignored, not errors.
    session.handle.leave().await;
    session.handle.begin_talk(PressSource::Pointer).await;
}
