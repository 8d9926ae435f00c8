//! The per-attempt session driver: one event loop that owns the transport,
//! the media gate and every subscription, and feeds everything it hears
//! into the negotiation machine as messages. No negotiation decisions are
//! made here; the driver only executes the actions the machine returns.

use crate::media_gate::{MediaGate, PressSource};
use crate::negotiation::{Negotiation, NegotiationAction, NegotiationEvent, NegotiationState};
use crate::signaling::SignalingChannel;
use crate::transport::{
    MediaSource, PeerTransport, TransportConfig, TransportEvent, TransportFactory,
};
use std::sync::Arc;
use std::time::Duration;
use talkie_core::{now_ms, Member, Role, RoomId, ShortId, UserId};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// The signed-in identity as the session needs it.
#[derive(Debug, Clone)]
pub struct LocalIdentity {
    pub uid: UserId,
    pub display_name: String,
    pub short_id: Option<ShortId>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a failed/disconnected transport may stay down before the
    /// attempt is declared failed and the relay hint is surfaced.
    pub grace_window: Duration,
    /// Member-record liveness touch period.
    pub heartbeat_interval: Duration,
    pub transport: TransportConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_window: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(20),
            transport: TransportConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum SessionCommand {
    BeginTalk(PressSource),
    EndTalk(PressSource),
    /// Space-bar press with the UI's focus context; ignored while focus is
    /// inside a text input so typing never keys the mic.
    KeyDown { focus_in_text_input: bool },
    KeyUp { focus_in_text_input: bool },
    Leave,
}

/// Everything the UI layer needs to render: current state plus the last
/// surfaced error or hint.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub state: NegotiationState,
    pub message: Option<String>,
    pub talking: bool,
}

/// Cheap clonable handle held by the caller while the session runs.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    pub async fn begin_talk(&self, source: PressSource) {
        let _ = self.commands.send(SessionCommand::BeginTalk(source)).await;
    }

    pub async fn end_talk(&self, source: PressSource) {
        let _ = self.commands.send(SessionCommand::EndTalk(source)).await;
    }

    pub async fn key_down(&self, focus_in_text_input: bool) {
        let _ = self
            .commands
            .send(SessionCommand::KeyDown {
                focus_in_text_input,
            })
            .await;
    }

    pub async fn key_up(&self, focus_in_text_input: bool) {
        let _ = self
            .commands
            .send(SessionCommand::KeyUp {
                focus_in_text_input,
            })
            .await;
    }

    pub async fn leave(&self) {
        let _ = self.commands.send(SessionCommand::Leave).await;
    }

    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }
}

pub struct Session {
    identity: LocalIdentity,
    room_id: RoomId,
    channel: Arc<dyn SignalingChannel>,
    media: Arc<dyn MediaSource>,
    transports: Arc<dyn TransportFactory>,
    config: SessionConfig,

    machine: Negotiation,
    gate: MediaGate,
    transport: Option<Box<dyn PeerTransport>>,

    command_rx: mpsc::Receiver<SessionCommand>,
    event_tx: mpsc::Sender<NegotiationEvent>,
    event_rx: mpsc::Receiver<NegotiationEvent>,
    status_tx: watch::Sender<SessionStatus>,
    /// Subscription forwarders and timers, aborted on teardown.
    tasks: Vec<JoinHandle<()>>,
    torn_down: bool,
}

impl Session {
    pub fn new(
        identity: LocalIdentity,
        room_id: RoomId,
        channel: Arc<dyn SignalingChannel>,
        media: Arc<dyn MediaSource>,
        transports: Arc<dyn TransportFactory>,
        config: SessionConfig,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(256);
        let (status_tx, status_rx) = watch::channel(SessionStatus {
            state: NegotiationState::Idle,
            message: None,
            talking: false,
        });

        let machine = Negotiation::new(identity.uid.clone());
        let session = Self {
            identity,
            room_id,
            channel,
            media,
            transports,
            config,
            machine,
            gate: MediaGate::new(),
            transport: None,
            command_rx,
            event_tx,
            event_rx,
            status_tx,
            tasks: Vec::new(),
            torn_down: false,
        };
        let handle = SessionHandle {
            commands: command_tx,
            status: status_rx,
        };
        (session, handle)
    }

    pub async fn run(mut self) {
        info!(room = %self.room_id, uid = %self.identity.uid, "session started");

        if let Err(err) = self.join_room().await {
            error!(%err, "failed to join room");
            self.surface(err.to_string());
            self.dispatch(NegotiationEvent::TeardownRequested).await;
            return;
        }

        if self.dispatch(NegotiationEvent::Start).await {
            return;
        }

        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        heartbeat.tick().await; // first tick fires immediately; join was the first touch

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if self.handle_command(cmd).await {
                                break;
                            }
                        }
                        None => {
                            debug!("command channel closed, tearing down");
                            self.teardown().await;
                            break;
                        }
                    }
                }
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => {
                            if self.dispatch(event).await {
                                break;
                            }
                        }
                        None => {
                            warn!("event channel closed unexpectedly");
                            self.teardown().await;
                            break;
                        }
                    }
                }
                _ = heartbeat.tick() => {
                    let _ = self
                        .channel
                        .touch_member(&self.room_id, &self.identity.uid, now_ms())
                        .await;
                }
            }
        }

        info!(room = %self.room_id, "session finished");
    }

    async fn join_room(&mut self) -> Result<(), talkie_core::ServiceError> {
        self.channel.room(&self.room_id).await?;
        let member = Member::new(
            self.identity.uid.clone(),
            self.identity.display_name.clone(),
            self.identity.short_id.clone(),
            now_ms(),
        );
        self.channel.upsert_member(&self.room_id, member).await
    }

    /// Returns true once the session is over and the loop should exit.
    async fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::BeginTalk(source) => {
                self.gate.begin_talk(source);
                self.publish_talking();
                false
            }
            SessionCommand::EndTalk(source) => {
                self.gate.end_talk(source);
                self.publish_talking();
                false
            }
            SessionCommand::KeyDown {
                focus_in_text_input,
            } => {
                self.gate.key_down(focus_in_text_input);
                self.publish_talking();
                false
            }
            SessionCommand::KeyUp {
                focus_in_text_input,
            } => {
                self.gate.key_up(focus_in_text_input);
                self.publish_talking();
                false
            }
            SessionCommand::Leave => self.dispatch(NegotiationEvent::TeardownRequested).await,
        }
    }

    /// Feed one event through the machine and execute the resulting
    /// actions. Returns true once the session is over.
    async fn dispatch(&mut self, event: NegotiationEvent) -> bool {
        let actions = self.machine.handle(event);
        let mut ended = false;
        for action in actions {
            if self.execute(action).await {
                ended = true;
            }
        }
        self.publish_state();
        ended
    }

    async fn execute(&mut self, action: NegotiationAction) -> bool {
        match action {
            NegotiationAction::AcquireMedia => self.acquire_media_and_transport().await,

            NegotiationAction::CreateAndPublishOffer => {
                let result = async {
                    let offer = self.transport()?.create_offer().await?;
                    self.channel
                        .publish_offer(&self.room_id, offer)
                        .await
                        .map_err(crate::SessionError::from)
                }
                .await;
                if let Err(err) = result {
                    self.fail(err.to_string()).await;
                }
            }

            NegotiationAction::ApplyRemoteOffer(offer) => {
                let result = async {
                    let transport = self.transport()?;
                    transport.set_remote_description(offer).await?;
                    let answer = transport.create_answer().await?;
                    self.channel
                        .publish_answer(&self.room_id, answer)
                        .await
                        .map_err(crate::SessionError::from)
                }
                .await;
                if let Err(err) = result {
                    self.fail(err.to_string()).await;
                }
            }

            NegotiationAction::ApplyRemoteAnswer(answer) => {
                let result = async {
                    self.transport()?.set_remote_description(answer).await?;
                    Ok::<_, crate::SessionError>(())
                }
                .await;
                if let Err(err) = result {
                    self.fail(err.to_string()).await;
                }
            }

            NegotiationAction::SubscribeCandidates(role) => {
                self.subscribe_candidates(role).await;
            }

            NegotiationAction::IngestRemoteCandidate(candidate) => {
                match self.transport() {
                    Ok(transport) => {
                        if let Err(err) = transport.add_ice_candidate(candidate).await {
                            warn!(%err, "failed to ingest remote candidate");
                        }
                    }
                    Err(_) => warn!("remote candidate before transport, dropping"),
                }
            }

            NegotiationAction::PublishLocalCandidate(candidate) => {
                // Fire-and-forget: ordering among our own candidates does
                // not matter, but they must not be silently lost.
                let Some(role) = self.machine.role() else {
                    warn!("local candidate before role, dropping");
                    return false;
                };
                if let Err(err) = self
                    .channel
                    .append_candidate(&self.room_id, role, candidate)
                    .await
                {
                    warn!(%err, "failed to append local candidate");
                }
            }

            NegotiationAction::ArmTalkGate => {
                self.gate.arm();
                self.status_tx.send_modify(|s| s.message = None);
            }

            NegotiationAction::DisarmTalkGate => {
                self.gate.disarm();
                self.publish_talking();
            }

            NegotiationAction::StartGraceTimer(generation) => {
                let event_tx = self.event_tx.clone();
                let grace = self.config.grace_window;
                self.tasks.push(tokio::spawn(async move {
                    tokio::time::sleep(grace).await;
                    let _ = event_tx
                        .send(NegotiationEvent::GraceElapsed(generation))
                        .await;
                }));
            }

            NegotiationAction::SurfaceError(msg) | NegotiationAction::SurfaceHint(msg) => {
                self.surface(msg);
            }

            NegotiationAction::Teardown => {
                self.teardown().await;
                return true;
            }
        }
        false
    }

    /// Acquire the one local audio track, open the transport, and attach
    /// the room watch. Follow-up events go through the queue so a
    /// notification arriving mid-setup cannot interleave with it.
    async fn acquire_media_and_transport(&mut self) {
        let track = match self.media.acquire_audio().await {
            Ok(track) => track,
            Err(err) => {
                let _ = self
                    .event_tx
                    .send(NegotiationEvent::MediaDenied(err.to_string()))
                    .await;
                return;
            }
        };
        self.gate.set_track(track);

        let (transport_tx, transport_rx) = mpsc::channel::<TransportEvent>(256);
        match self.transports.open(&self.config.transport, transport_tx).await {
            Ok(transport) => self.transport = Some(transport),
            Err(err) => {
                error!(%err, "failed to open transport");
                self.surface(err.to_string());
                let _ = self.event_tx.send(NegotiationEvent::TeardownRequested).await;
                return;
            }
        }
        self.forward_transport_events(transport_rx);

        let _ = self.event_tx.send(NegotiationEvent::MediaReady).await;

        match self.channel.watch_room(&self.room_id).await {
            Ok(mut room_rx) => {
                let event_tx = self.event_tx.clone();
                self.tasks.push(tokio::spawn(async move {
                    while let Some(room) = room_rx.recv().await {
                        if event_tx
                            .send(NegotiationEvent::RoomChanged(room))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }));
            }
            Err(err) => {
                error!(%err, "failed to watch room");
                self.surface(err.to_string());
                let _ = self.event_tx.send(NegotiationEvent::TeardownRequested).await;
            }
        }
    }

    fn forward_transport_events(&mut self, mut transport_rx: mpsc::Receiver<TransportEvent>) {
        let event_tx = self.event_tx.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = transport_rx.recv().await {
                let mapped = match event {
                    TransportEvent::LocalCandidate(c) => {
                        NegotiationEvent::LocalCandidateDiscovered(c)
                    }
                    TransportEvent::Connectivity(s) => NegotiationEvent::ConnectivityChanged(s),
                };
                if event_tx.send(mapped).await.is_err() {
                    break;
                }
            }
        }));
    }

    /// Start consuming the counterpart's queue, then mark the channel
    /// ready so buffered local candidates flush.
    async fn subscribe_candidates(&mut self, role: Role) {
        match self.channel.watch_candidates(&self.room_id, role).await {
            Ok(mut candidate_rx) => {
                let event_tx = self.event_tx.clone();
                self.tasks.push(tokio::spawn(async move {
                    while let Some(candidate) = candidate_rx.recv().await {
                        if event_tx
                            .send(NegotiationEvent::RemoteCandidateAdded(candidate))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }));
                let _ = self.event_tx.send(NegotiationEvent::ChannelReady).await;
            }
            Err(err) => {
                error!(%err, "failed to watch candidate queue");
                self.surface(err.to_string());
                let _ = self.event_tx.send(NegotiationEvent::TeardownRequested).await;
            }
        }
    }

    fn transport(&self) -> Result<&dyn PeerTransport, crate::SessionError> {
        self.transport
            .as_deref()
            .ok_or(crate::SessionError::Transport(
                crate::transport::TransportError::Closed,
            ))
    }

    async fn fail(&mut self, message: String) {
        error!(%message, "negotiation step failed");
        self.surface(message);
        let _ = self.event_tx.send(NegotiationEvent::TeardownRequested).await;
    }

    fn surface(&self, message: String) {
        self.status_tx.send_modify(|s| s.message = Some(message));
    }

    fn publish_state(&self) {
        let state = self.machine.state();
        self.status_tx.send_if_modified(|s| {
            if s.state != state {
                s.state = state;
                true
            } else {
                false
            }
        });
    }

    fn publish_talking(&self) {
        let talking = self.gate.is_talking();
        self.status_tx.send_if_modified(|s| {
            if s.talking != talking {
                s.talking = talking;
                true
            } else {
                false
            }
        });
    }

    /// Full release of the attempt's resources. Safe to call repeatedly and
    /// runs even if negotiation never completed. Watches stop before media
    /// is released; the member-record cleanup is best-effort.
    async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        debug!(room = %self.room_id, "tearing down");

        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.gate.release();
        self.publish_talking();
        if let Some(transport) = self.transport.take() {
            let _ = transport.close().await;
        }
        let _ = self
            .channel
            .mark_member_offline(&self.room_id, &self.identity.uid)
            .await;
        let _ = self
            .channel
            .remove_member(&self.room_id, &self.identity.uid)
            .await;
    }
}
