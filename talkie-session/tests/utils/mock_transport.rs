use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use talkie_core::{IceCandidate, SdpKind, SessionDescription};
use talkie_session::{
    ConnectivityState, PeerTransport, TransportConfig, TransportError, TransportEvent,
    TransportFactory,
};
use tokio::sync::mpsc;

/// Observable side of one mock transport, shared with the test.
#[derive(Default)]
pub struct TransportProbe {
    pub offers_created: AtomicUsize,
    pub answers_created: AtomicUsize,
    pub remote_descriptions: Mutex<Vec<SessionDescription>>,
    pub ingested_candidates: Mutex<Vec<IceCandidate>>,
    pub closed: AtomicBool,
}

impl TransportProbe {
    pub fn remote_descriptions(&self) -> Vec<SessionDescription> {
        self.remote_descriptions.lock().unwrap().clone()
    }

    pub fn ingested_candidates(&self) -> Vec<IceCandidate> {
        self.ingested_candidates.lock().unwrap().clone()
    }
}

/// Scripted peer transport. Each created description yields one local
/// candidate, and connectivity goes `Connected` once the handshake
/// completes on this side. The test can push further connectivity changes
/// through the factory's retained event sender.
pub struct MockTransport {
    probe: Arc<TransportProbe>,
    events: mpsc::Sender<TransportEvent>,
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        let n = self.probe.offers_created.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self
            .events
            .send(TransportEvent::LocalCandidate(IceCandidate::new(format!(
                "candidate:local-{n}"
            ))))
            .await;
        Ok(SessionDescription::offer("sdp-offer-local"))
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        self.probe.answers_created.fetch_add(1, Ordering::SeqCst);
        let _ = self
            .events
            .send(TransportEvent::LocalCandidate(IceCandidate::new(
                "candidate:local-1",
            )))
            .await;
        let _ = self
            .events
            .send(TransportEvent::Connectivity(ConnectivityState::Connected))
            .await;
        Ok(SessionDescription::answer("sdp-answer-local"))
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        let is_answer = description.kind == SdpKind::Answer;
        self.probe
            .remote_descriptions
            .lock()
            .unwrap()
            .push(description);
        if is_answer {
            let _ = self
                .events
                .send(TransportEvent::Connectivity(ConnectivityState::Connected))
                .await;
        }
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        self.probe
            .ingested_candidates
            .lock()
            .unwrap()
            .push(candidate);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.probe.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory that retains each opened transport's probe and event sender so
/// the test can inspect the transport and inject connectivity changes.
#[derive(Default)]
pub struct MockTransportFactory {
    pub probes: Mutex<Vec<Arc<TransportProbe>>>,
    pub event_senders: Mutex<Vec<mpsc::Sender<TransportEvent>>>,
}

impl MockTransportFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn probe(&self, index: usize) -> Arc<TransportProbe> {
        self.probes.lock().unwrap()[index].clone()
    }

    /// Push a connectivity change as if the transport reported it.
    pub async fn report_connectivity(&self, index: usize, state: ConnectivityState) {
        let sender = self.event_senders.lock().unwrap()[index].clone();
        let _ = sender.send(TransportEvent::Connectivity(state)).await;
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn open(
        &self,
        _config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>, TransportError> {
        let probe = Arc::new(TransportProbe::default());
        self.probes.lock().unwrap().push(probe.clone());
        self.event_senders.lock().unwrap().push(events.clone());
        Ok(Box::new(MockTransport { probe, events }))
    }
}
