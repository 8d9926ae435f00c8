pub mod error;
pub mod media_gate;
pub mod negotiation;
pub mod presence;
pub mod role;
pub mod session;
pub mod signaling;
pub mod transport;

pub use error::SessionError;
pub use media_gate::{MediaGate, PressSource};
pub use negotiation::{Negotiation, NegotiationAction, NegotiationEvent, NegotiationState};
pub use presence::{wire_presence, LivenessStore};
pub use role::resolve_role;
pub use session::{
    LocalIdentity, Session, SessionCommand, SessionConfig, SessionHandle, SessionStatus,
};
pub use signaling::{CandidateWatch, RoomWatch, SignalingChannel};
pub use transport::{
    AudioTrack, ConnectivityState, MediaError, MediaSource, PeerTransport, TransportConfig,
    TransportError, TransportEvent, TransportFactory,
};
