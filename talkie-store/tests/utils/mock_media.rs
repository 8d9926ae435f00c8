use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use talkie_session::{AudioTrack, MediaError, MediaSource};

#[derive(Default)]
pub struct MockAudioTrack {
    enabled: AtomicBool,
    pub stopped: AtomicBool,
}

impl AudioTrack for MockAudioTrack {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Capture source that either grants a track or refuses like a user
/// declining the mic prompt.
pub struct MockMediaSource {
    denial: Option<String>,
    pub tracks: Mutex<Vec<Arc<MockAudioTrack>>>,
}

impl MockMediaSource {
    pub fn granting() -> Arc<Self> {
        Arc::new(Self {
            denial: None,
            tracks: Mutex::new(Vec::new()),
        })
    }

    pub fn denying(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            denial: Some(message.into()),
            tracks: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MediaSource for MockMediaSource {
    async fn acquire_audio(&self) -> Result<Arc<dyn AudioTrack>, MediaError> {
        if let Some(message) = &self.denial {
            return Err(MediaError::PermissionDenied(message.clone()));
        }
        let track = Arc::new(MockAudioTrack::default());
        self.tracks.lock().unwrap().push(track.clone());
        Ok(track)
    }
}
