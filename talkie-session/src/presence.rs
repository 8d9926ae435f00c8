use async_trait::async_trait;
use std::sync::Arc;
use talkie_core::{ServiceError, UserId};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Fast ephemeral liveness store with its own disconnect detection.
#[async_trait]
pub trait LivenessStore: Send + Sync {
    /// The store's own connectivity signal.
    async fn watch_connected(&self) -> watch::Receiver<bool>;

    /// Queue an offline write that the store fires by itself when the
    /// connection drops.
    async fn on_disconnect_set_offline(&self, uid: &UserId) -> Result<(), ServiceError>;

    async fn set_online(&self, uid: &UserId) -> Result<(), ServiceError>;

    async fn set_offline(&self, uid: &UserId) -> Result<(), ServiceError>;
}

/// Keeps the liveness record in step with sign-in state and store
/// connectivity. The disconnect-triggered offline write is registered
/// before the online write, so a crash between the two still resolves to
/// offline.
///
/// `identity` is the auth provider's registration event: `Some(uid)` on
/// sign-in, `None` on sign-out.
pub fn wire_presence(
    store: Arc<dyn LivenessStore>,
    mut identity: watch::Receiver<Option<UserId>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut connected = store.watch_connected().await;
        loop {
            let uid = identity.borrow().clone();
            if let Some(uid) = &uid {
                if *connected.borrow() {
                    if let Err(err) = store.on_disconnect_set_offline(uid).await {
                        warn!(%uid, %err, "failed to register disconnect hook");
                    } else if let Err(err) = store.set_online(uid).await {
                        warn!(%uid, %err, "failed to go online");
                    } else {
                        debug!(%uid, "presence online");
                    }
                }
            }

            tokio::select! {
                changed = connected.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = identity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let signed_out = identity.borrow().is_none();
                    if signed_out {
                        if let Some(prev) = &uid {
                            // Best-effort; the disconnect hook is the backstop.
                            let _ = store.set_offline(prev).await;
                            debug!(%prev, "presence offline on sign-out");
                        }
                    }
                }
            }
        }
    })
}
