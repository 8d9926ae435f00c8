use crate::transport::AudioTrack;
use std::sync::Arc;
use tracing::debug;

/// Physical control that initiated a press. A press and its release must
/// come from the same source to count as one logical press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressSource {
    Pointer,
    Touch,
    Key,
}

/// The push-to-talk gate. One authoritative `talking` boolean guards the
/// transmit track: begin/end are strictly symmetric, double-entry is
/// impossible, and a release that was never preceded by a matching press is
/// a no-op.
pub struct MediaGate {
    armed: bool,
    talking: bool,
    active_press: Option<PressSource>,
    track: Option<Arc<dyn AudioTrack>>,
}

impl MediaGate {
    pub fn new() -> Self {
        Self {
            armed: false,
            talking: false,
            active_press: None,
            track: None,
        }
    }

    /// Attach the attempt's audio track, transmit-disabled.
    pub fn set_track(&mut self, track: Arc<dyn AudioTrack>) {
        track.set_enabled(false);
        self.track = Some(track);
    }

    /// Enable the gate once the transport reports connected.
    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Disable the gate; ends any press in flight.
    pub fn disarm(&mut self) {
        if self.talking {
            self.talking = false;
            self.active_press = None;
            if let Some(track) = &self.track {
                track.set_enabled(false);
            }
        }
        self.armed = false;
    }

    /// Release the track entirely. Used during teardown.
    pub fn release(&mut self) {
        self.disarm();
        if let Some(track) = self.track.take() {
            track.stop();
        }
    }

    pub fn is_talking(&self) -> bool {
        self.talking
    }

    /// Returns true if the press took effect.
    pub fn begin_talk(&mut self, source: PressSource) -> bool {
        if !self.armed || self.talking || self.track.is_none() {
            return false;
        }
        self.talking = true;
        self.active_press = Some(source);
        if let Some(track) = &self.track {
            track.set_enabled(true);
        }
        debug!(?source, "talk begin");
        true
    }

    /// Returns true if this release ended the press that began it.
    pub fn end_talk(&mut self, source: PressSource) -> bool {
        if !self.talking || self.active_press != Some(source) {
            return false;
        }
        self.talking = false;
        self.active_press = None;
        if let Some(track) = &self.track {
            track.set_enabled(false);
        }
        debug!(?source, "talk end");
        true
    }

    /// Space-bar press. Ignored while focus is inside a text input so
    /// typing never keys the mic.
    pub fn key_down(&mut self, focus_in_text_input: bool) -> bool {
        if focus_in_text_input {
            return false;
        }
        self.begin_talk(PressSource::Key)
    }

    pub fn key_up(&mut self, focus_in_text_input: bool) -> bool {
        if focus_in_text_input {
            return false;
        }
        self.end_talk(PressSource::Key)
    }
}

impl Default for MediaGate {
    fn default() -> Self {
        Self::new()
    }
}
