use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use talkie_session::{AudioTrack, MediaError, MediaSource};
use tracing::debug;
use webrtc::api::media_engine::MIME_TYPE_OPUS;
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// The one local opus track of an attempt. Created transmit-disabled;
/// samples written while disabled are dropped, which is what the talk gate
/// counts on.
pub struct RtcAudioTrack {
    track: Arc<TrackLocalStaticSample>,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

impl RtcAudioTrack {
    fn new() -> Self {
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                ..Default::default()
            },
            "audio".to_owned(),
            "talkie".to_owned(),
        ));
        Self {
            track,
            enabled: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// The underlying track, for attaching to a peer connection.
    pub fn local(&self) -> Arc<TrackLocalStaticSample> {
        self.track.clone()
    }

    /// Feed one encoded sample. Silently dropped while transmission is
    /// disabled or the track is stopped.
    pub async fn write_sample(&self, sample: &Sample) -> Result<(), MediaError> {
        if self.stopped.load(Ordering::SeqCst) || !self.enabled.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.track
            .write_sample(sample)
            .await
            .map_err(|e| MediaError::Unavailable(e.to_string()))
    }
}

impl AudioTrack for RtcAudioTrack {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!("audio track stopped");
        }
        self.enabled.store(false, Ordering::SeqCst);
    }
}

/// Source of local opus tracks. The embedder keeps the concrete
/// [`RtcAudioTrack`] (via [`RtcMedia::created_tracks`]) to feed encoded
/// samples from its capture pipeline.
#[derive(Default)]
pub struct RtcMedia {
    tracks: Mutex<Vec<Arc<RtcAudioTrack>>>,
}

impl RtcMedia {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created_tracks(&self) -> Vec<Arc<RtcAudioTrack>> {
        self.tracks.lock().expect("track list poisoned").clone()
    }
}

#[async_trait]
impl MediaSource for RtcMedia {
    async fn acquire_audio(&self) -> Result<Arc<dyn AudioTrack>, MediaError> {
        let track = Arc::new(RtcAudioTrack::new());
        self.tracks
            .lock()
            .expect("track list poisoned")
            .push(track.clone());
        Ok(track)
    }
}
