use crate::integration::{connect_as_caller, start_session, LOCAL_CALLEE_UID, LOCAL_CALLER_UID};
use crate::utils::{wait_for_talking, wait_until, MockMediaSource};
use std::time::Duration;
use talkie_session::{AudioTrack, PressSource, SessionConfig};

#[tokio::test]
async fn talk_transmits_only_while_pressed() {
    let session = start_session(
        LOCAL_CALLER_UID,
        LOCAL_CALLEE_UID,
        MockMediaSource::granting(),
        SessionConfig::default(),
    );
    connect_as_caller(&session).await.expect("no connection");

    let track = session.media.track(0);
    assert!(!track.enabled(), "track must start transmit-disabled");

    session.handle.begin_talk(PressSource::Pointer).await;
    wait_for_talking(&session.handle, true)
        .await
        .expect("press never started transmission");
    assert!(track.enabled());

    // A release from a different source does not end the pointer press.
    session.handle.end_talk(PressSource::Key).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.handle.status().borrow().talking);
    assert!(track.enabled());

    session.handle.end_talk(PressSource::Pointer).await;
    wait_for_talking(&session.handle, false)
        .await
        .expect("release never stopped transmission");
    assert!(!track.enabled());
}

#[tokio::test]
async fn space_presses_carry_the_focus_context() {
    let session = start_session(
        LOCAL_CALLER_UID,
        LOCAL_CALLEE_UID,
        MockMediaSource::granting(),
        SessionConfig::default(),
    );
    connect_as_caller(&session).await.expect("no connection");

    // Space while typing in a text input never keys the mic.
    session.handle.key_down(true).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!session.handle.status().borrow().talking);
    assert!(!session.media.track(0).enabled());

    session.handle.key_down(false).await;
    wait_for_talking(&session.handle, true)
        .await
        .expect("space never keyed the mic");
    assert!(session.media.track(0).enabled());

    session.handle.key_up(false).await;
    wait_for_talking(&session.handle, false)
        .await
        .expect("release never stopped transmission");
    assert!(!session.media.track(0).enabled());
}

#[tokio::test]
async fn presses_before_connection_are_ignored() {
    let session = start_session(
        LOCAL_CALLER_UID,
        LOCAL_CALLEE_UID,
        MockMediaSource::granting(),
        SessionConfig::default(),
    );

    // Offer out, no answer yet: the gate stays disarmed.
    let channel = session.channel.clone();
    wait_until("offer to be published", || {
        let channel = channel.clone();
        async move { channel.offers_published.load(std::sync::atomic::Ordering::SeqCst) >= 1 }
    })
    .await
    .expect("offer never published");

    session.handle.begin_talk(PressSource::Pointer).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!session.handle.status().borrow().talking);
    assert!(!session.media.track(0).enabled());
}
