//! The negotiation state machine, written as an explicit state+transition
//! table. `Negotiation::handle` is pure: it takes one event, mutates only
//! its own bookkeeping, and returns the actions the session driver must
//! execute. All idempotence gates live here, where they can be audited and
//! tested without a network or a transport.
//!
//! The gates substitute for causal ordering: room-change and candidate-add
//! notifications arrive on independent subscriptions with no relative order
//! guarantee, and any notification may be delivered more than once.

use crate::role::resolve_role;
use crate::transport::ConnectivityState;
use std::collections::HashSet;
use talkie_core::{IceCandidate, Role, Room, SessionDescription, UserId};
use tracing::{debug, warn};

/// Hint surfaced when connectivity stays down past the grace window.
pub const RELAY_HINT: &str = "No audio? Your networks may need a TURN relay server.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    AcquiringMedia,
    Negotiating,
    Connected,
    Failed,
    Ended,
}

/// Everything that can happen to one negotiation attempt. The session
/// driver translates subscription callbacks, transport events and user
/// actions into these.
#[derive(Debug)]
pub enum NegotiationEvent {
    /// Begin the attempt.
    Start,
    MediaReady,
    /// Mic access refused; message is surfaced verbatim.
    MediaDenied(String),
    /// Full room snapshot, possibly redundant, possibly our own write.
    RoomChanged(Room),
    /// Entry from the counterpart's candidate queue; may be a replay.
    RemoteCandidateAdded(IceCandidate),
    /// Candidate discovered by the local transport.
    LocalCandidateDiscovered(IceCandidate),
    /// Watches are attached and the role's outbound queue is writable.
    ChannelReady,
    ConnectivityChanged(ConnectivityState),
    /// The grace window started by a connectivity drop has elapsed. Carries
    /// the drop's generation so a timer superseded by a recovery and a
    /// fresh drop is ignored.
    GraceElapsed(u64),
    TeardownRequested,
}

/// Side effects for the driver to execute, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationAction {
    AcquireMedia,
    /// Caller only, emitted exactly once per attempt.
    CreateAndPublishOffer,
    /// Callee only: apply the offer, then create, set and publish exactly
    /// one answer.
    ApplyRemoteOffer(SessionDescription),
    /// Caller only, emitted at most once per attempt.
    ApplyRemoteAnswer(SessionDescription),
    /// Start consuming the given role's candidate queue.
    SubscribeCandidates(Role),
    IngestRemoteCandidate(IceCandidate),
    PublishLocalCandidate(IceCandidate),
    ArmTalkGate,
    DisarmTalkGate,
    /// Start a grace timer for this drop generation.
    StartGraceTimer(u64),
    SurfaceError(String),
    SurfaceHint(String),
    Teardown,
}

pub struct Negotiation {
    local: UserId,
    state: NegotiationState,
    role: Option<Role>,
    /// The idempotence gate: set the moment a remote description is handed
    /// to the transport, so redundant snapshot deliveries apply nothing.
    remote_description_applied: bool,
    channel_ready: bool,
    /// Locally discovered candidates held back until the channel is ready.
    pending_local: Vec<IceCandidate>,
    /// Remote entries already ingested; replays after a resubscribe land here.
    seen_remote: HashSet<IceCandidate>,
    grace_armed: bool,
    /// Bumped on every drop that arms a grace timer; an elapse from an
    /// earlier generation is stale.
    grace_generation: u64,
    connectivity: ConnectivityState,
}

impl Negotiation {
    pub fn new(local: UserId) -> Self {
        Self {
            local,
            state: NegotiationState::Idle,
            role: None,
            remote_description_applied: false,
            channel_ready: false,
            pending_local: Vec::new(),
            seen_remote: HashSet::new(),
            grace_armed: false,
            grace_generation: 0,
            connectivity: ConnectivityState::New,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// The transition table. One event in, zero or more actions out.
    pub fn handle(&mut self, event: NegotiationEvent) -> Vec<NegotiationAction> {
        use NegotiationEvent as E;
        use NegotiationState as S;

        match (self.state, event) {
            (S::Ended, E::TeardownRequested) => vec![],
            (_, E::TeardownRequested) => {
                self.state = S::Ended;
                vec![NegotiationAction::DisarmTalkGate, NegotiationAction::Teardown]
            }
            (S::Ended | S::Failed, event) => {
                debug!(?event, "event after attempt ended, ignoring");
                vec![]
            }

            (S::Idle, E::Start) => {
                self.state = S::AcquiringMedia;
                vec![NegotiationAction::AcquireMedia]
            }

            (S::AcquiringMedia, E::MediaReady) => {
                self.state = S::Negotiating;
                vec![]
            }
            (S::AcquiringMedia, E::MediaDenied(msg)) => {
                self.state = S::Failed;
                vec![
                    NegotiationAction::SurfaceError(msg),
                    NegotiationAction::Teardown,
                ]
            }

            (S::Negotiating | S::Connected, E::RoomChanged(room)) => self.on_room_changed(room),

            (_, E::RemoteCandidateAdded(candidate)) => {
                if self.seen_remote.insert(candidate.clone()) {
                    vec![NegotiationAction::IngestRemoteCandidate(candidate)]
                } else {
                    debug!("replayed candidate, already ingested");
                    vec![]
                }
            }

            (_, E::LocalCandidateDiscovered(candidate)) => {
                if self.channel_ready {
                    vec![NegotiationAction::PublishLocalCandidate(candidate)]
                } else {
                    // Buffered, never dropped; flushed on ChannelReady.
                    self.pending_local.push(candidate);
                    vec![]
                }
            }

            (_, E::ChannelReady) => {
                self.channel_ready = true;
                self.pending_local
                    .drain(..)
                    .map(NegotiationAction::PublishLocalCandidate)
                    .collect()
            }

            (S::Negotiating | S::Connected, E::ConnectivityChanged(conn)) => {
                self.on_connectivity(conn)
            }

            (S::Negotiating | S::Connected, E::GraceElapsed(generation)) => {
                if self.grace_armed
                    && generation == self.grace_generation
                    && matches!(
                        self.connectivity,
                        ConnectivityState::Failed | ConnectivityState::Disconnected
                    )
                {
                    self.state = S::Failed;
                    vec![
                        NegotiationAction::DisarmTalkGate,
                        NegotiationAction::SurfaceHint(RELAY_HINT.to_owned()),
                    ]
                } else {
                    vec![]
                }
            }

            (state, event) => {
                warn!(?state, ?event, "unexpected event for state, ignoring");
                vec![]
            }
        }
    }

    fn on_room_changed(&mut self, room: Room) -> Vec<NegotiationAction> {
        let mut actions = Vec::new();

        if self.role.is_none() {
            match resolve_role(&self.local, &room) {
                Some(role) => {
                    debug!(%role, "role resolved");
                    self.role = Some(role);
                    actions.push(NegotiationAction::SubscribeCandidates(role.counterpart()));
                    if role == Role::Caller {
                        actions.push(NegotiationAction::CreateAndPublishOffer);
                    }
                }
                // Counterpart not present yet; wait for the next snapshot.
                None => return actions,
            }
        }

        // Same gate for both roles: apply a remote description only while
        // none has been applied, no matter how often the snapshot arrives.
        if self.remote_description_applied {
            return actions;
        }

        match self.role {
            Some(Role::Caller) => {
                if let Some(answer) = room.answer {
                    self.remote_description_applied = true;
                    actions.push(NegotiationAction::ApplyRemoteAnswer(answer));
                }
            }
            Some(Role::Callee) => {
                if let Some(offer) = room.offer {
                    self.remote_description_applied = true;
                    actions.push(NegotiationAction::ApplyRemoteOffer(offer));
                }
            }
            None => unreachable!("role checked above"),
        }

        actions
    }

    fn on_connectivity(&mut self, conn: ConnectivityState) -> Vec<NegotiationAction> {
        self.connectivity = conn;
        match conn {
            ConnectivityState::Connected => {
                self.grace_armed = false;
                self.state = NegotiationState::Connected;
                vec![NegotiationAction::ArmTalkGate]
            }
            ConnectivityState::Failed | ConnectivityState::Disconnected => {
                let mut actions = vec![NegotiationAction::DisarmTalkGate];
                if !self.grace_armed {
                    self.grace_armed = true;
                    self.grace_generation += 1;
                    actions.push(NegotiationAction::StartGraceTimer(self.grace_generation));
                }
                actions
            }
            _ => vec![],
        }
    }
}
