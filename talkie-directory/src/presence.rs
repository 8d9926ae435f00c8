use crate::store::DirectoryStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Mirrors every liveness flip from the ephemeral store onto the durable
/// profile record, so rosters render online dots without touching the
/// liveness store.
pub fn run_presence_mirror(store: Arc<dyn DirectoryStore>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut liveness = store.watch_liveness().await;
        while let Some((uid, online)) = liveness.recv().await {
            debug!(%uid, online, "mirroring presence");
            if let Err(err) = store.set_profile_online(&uid, online).await {
                warn!(%uid, %err, "presence mirror write failed");
            }
        }
    })
}
