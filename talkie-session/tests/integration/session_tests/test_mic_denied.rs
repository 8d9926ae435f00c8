use crate::integration::{start_session, LOCAL_CALLEE_UID, LOCAL_CALLER_UID};
use crate::utils::{wait_for_state, MockMediaSource};
use talkie_session::{NegotiationState, SessionConfig};

#[tokio::test]
async fn mic_denial_fails_the_attempt_with_the_verbatim_reason() {
    let session = start_session(
        LOCAL_CALLER_UID,
        LOCAL_CALLEE_UID,
        MockMediaSource::denying("Permission denied by user"),
        SessionConfig::default(),
    );

    wait_for_state(&session.handle, NegotiationState::Failed)
        .await
        .expect("attempt did not fail");

    let status = session.handle.status().borrow().clone();
    assert_eq!(status.message.as_deref(), Some("Permission denied by user"));
    assert!(!status.talking);

    // Nothing was negotiated, but the participant record was still cleaned
    // up on the way out.
    assert_eq!(session.transports.probes.lock().unwrap().len(), 0);
    let log = session.channel.member_log();
    assert!(log.iter().any(|e| e == &format!("offline:{LOCAL_CALLER_UID}")));
    assert!(log.iter().any(|e| e == &format!("remove:{LOCAL_CALLER_UID}")));
}
