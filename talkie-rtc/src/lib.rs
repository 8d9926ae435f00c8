//! WebRTC-backed implementations of the session's transport and media
//! seams: a real peer connection behind [`talkie_session::PeerTransport`]
//! and an opus track behind [`talkie_session::AudioTrack`].

mod media;
mod transport;

pub use media::{RtcAudioTrack, RtcMedia};
pub use transport::{RtcTransport, RtcTransportFactory};
