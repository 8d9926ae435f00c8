use async_trait::async_trait;
use std::sync::Arc;
use talkie_core::{IceCandidate, IceServerConfig, SessionDescription};
use thiserror::Error;
use tokio::sync::mpsc;

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

/// ICE server set handed to each transport. Defaults to public STUN;
/// user-supplied TURN entries go in front of it.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                IceServerConfig::stun(DEFAULT_STUN_ADDR),
                IceServerConfig::stun(DEFAULT_STUN_ADDR_2),
            ],
        }
    }
}

/// Connectivity as reported by the transport itself. The negotiation
/// machine only reflects this signal; it never declares connectedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Events the transport pushes into the session event loop.
#[derive(Debug)]
pub enum TransportEvent {
    /// A locally discovered network path, to be appended to this role's
    /// outbound queue.
    LocalCandidate(IceCandidate),
    Connectivity(ConnectivityState),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open peer connection: {0}")]
    Open(String),

    #[error("session description error: {0}")]
    Description(String),

    #[error("candidate rejected: {0}")]
    Candidate(String),

    #[error("transport closed")]
    Closed,
}

/// One peer connection, exclusively owned by a single negotiation attempt.
/// `create_offer`/`create_answer` also set the local description, matching
/// how every handshake in this system uses them.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

/// Opens transports for negotiation attempts. `events` is the channel the
/// transport will push candidates and connectivity changes into.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn open(
        &self,
        config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>, TransportError>;
}

#[derive(Debug, Error)]
pub enum MediaError {
    /// Mic access refused. Terminal for the attempt.
    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Unavailable(String),
}

/// The one local audio track of an attempt. Created transmit-disabled;
/// only the media gate flips it.
pub trait AudioTrack: Send + Sync {
    fn set_enabled(&self, enabled: bool);

    fn enabled(&self) -> bool;

    /// Release the capture device. Safe to call more than once.
    fn stop(&self);
}

/// Local audio capture capability.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire_audio(&self) -> Result<Arc<dyn AudioTrack>, MediaError>;
}
