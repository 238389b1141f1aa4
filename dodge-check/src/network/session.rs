//! Session Coordination
//!
//! Drives the request → configure → start handshake for one participant
//! runtime and owns the simulation engines started on it.
//!
//! The coordinator performs no I/O: messages to publish are queued and
//! collected with [`SessionCoordinator::take_outgoing`], and every host
//! service is reached through the injected [`Host`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::rng::derive_session_seed;
use crate::game::difficulty::{derive, InvalidConfig};
use crate::game::score::{resolve, OutcomeRecord};
use crate::game::state::{PlayfieldGeometry, SessionConfig, SubjectRef};
use crate::game::tick::SimulationEngine;
use crate::host::announce::FALLBACK_SUBJECT_NAME;
use crate::host::Host;
use crate::network::protocol::{HandshakeMessage, Participant, ParticipantId};

/// Local identifier of one handshake. Never sent over the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandshakeId(pub Uuid);

impl HandshakeId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for HandshakeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandshakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Created, nothing sent yet.
    Idle,
    /// Request sent (dodger) or received (arbiter).
    AwaitingConfig,
    /// Arbiter's editor is open.
    Configuring,
    /// Config sent to the requester. Final on the arbiter's runtime.
    Dispatched,
    /// Simulation running on this runtime.
    SessionActive,
    /// Outcome produced and announced.
    Complete,
    /// Dismissed, failed, or window closed early.
    Abandoned,
}

impl HandshakeState {
    /// Nothing further happens to the handshake on this runtime.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            HandshakeState::Dispatched | HandshakeState::Complete | HandshakeState::Abandoned
        )
    }
}

/// One handshake as seen by this runtime.
#[derive(Debug, Clone)]
pub struct Handshake {
    /// Local id
    pub id: HandshakeId,
    /// Creation order within this runtime
    pub seq: u64,
    /// Character being checked
    pub subject_ref: SubjectRef,
    /// Participant that asked for the check
    pub requester: ParticipantId,
    /// Current state
    pub state: HandshakeState,
    /// Committed config, once known
    pub config: Option<SessionConfig>,
    /// Outcome, once complete
    pub outcome: Option<OutcomeRecord>,
}

impl Handshake {
    fn new(seq: u64, subject_ref: SubjectRef, requester: ParticipantId) -> Self {
        Self {
            id: HandshakeId::new(),
            seq,
            subject_ref,
            requester,
            state: HandshakeState::Idle,
            config: None,
            outcome: None,
        }
    }

    fn transition(&mut self, to: HandshakeState) {
        debug!(handshake = %self.id, from = ?self.state, to = ?to, "handshake transition");
        self.state = to;
    }
}

/// Session errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// Config rejected before the session could start.
    #[error("Invalid config: {0}")]
    InvalidConfig(#[from] InvalidConfig),

    /// A non-arbiter tried to author a config.
    #[error("Participant {participant} is not allowed to author a session config")]
    UnauthorizedConfigAttempt {
        /// Who tried
        participant: ParticipantId,
    },

    /// Message not meant for this runtime.
    #[error("Misaddressed {kind} message")]
    MisaddressedMessage {
        /// Message kind
        kind: &'static str,
    },

    /// Subject reference could not be resolved.
    #[error("Subject not found: {0}")]
    MissingSubject(SubjectRef),

    /// No handshake (or no open window) with this id.
    #[error("Unknown handshake: {0}")]
    UnknownHandshake(HandshakeId),

    /// Command not valid in the handshake's current state.
    #[error("Handshake {handshake} is in state {state:?}")]
    InvalidState {
        /// Handshake
        handshake: HandshakeId,
        /// Its current state
        state: HandshakeState,
    },

    /// Committed config names a different subject than the request.
    #[error("Config is for {got}, handshake is for {expected}")]
    SubjectMismatch {
        /// Subject of the handshake
        expected: SubjectRef,
        /// Subject in the committed config
        got: SubjectRef,
    },
}

impl SessionError {
    /// Errors that are dropped silently rather than surfaced to a user.
    pub fn is_silent(&self) -> bool {
        matches!(self, SessionError::MisaddressedMessage { .. })
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

/// Handshake coordinator for one participant runtime.
pub struct SessionCoordinator {
    me: Participant,
    playfield: PlayfieldGeometry,
    host: Host,
    handshakes: BTreeMap<HandshakeId, Handshake>,
    engines: BTreeMap<HandshakeId, SimulationEngine>,
    outgoing: Vec<HandshakeMessage>,
    next_seq: u64,
}

impl SessionCoordinator {
    /// Create a coordinator for `me`.
    pub fn new(me: Participant, playfield: PlayfieldGeometry, host: Host) -> Self {
        Self {
            me,
            playfield,
            host,
            handshakes: BTreeMap::new(),
            engines: BTreeMap::new(),
            outgoing: Vec::new(),
            next_seq: 0,
        }
    }

    /// The participant this runtime belongs to.
    pub fn me(&self) -> &Participant {
        &self.me
    }

    /// Local request for a check (the sheet button).
    ///
    /// An arbiter opens the editor directly; anyone else publishes a
    /// `RequestConfig` and waits.
    pub fn request_check(&mut self, subject_ref: SubjectRef) -> Result<HandshakeId, SessionError> {
        let id = self.insert_handshake(subject_ref.clone(), self.me.id, HandshakeState::AwaitingConfig);

        if self.me.is_arbiter() {
            self.open_editor(id)?;
        } else {
            info!(handshake = %id, subject = %subject_ref, "requesting config from arbiter");
            self.outgoing.push(HandshakeMessage::request_config(subject_ref, self.me.id));
            self.host.notifier.info("Waiting for the arbiter to configure the check...");
        }

        Ok(id)
    }

    /// Handle a message from the shared channel.
    ///
    /// Returns the handshake it advanced. Messages for other runtimes yield
    /// [`SessionError::MisaddressedMessage`] and change nothing.
    pub fn handle_message(&mut self, message: HandshakeMessage) -> Result<HandshakeId, SessionError> {
        match message {
            HandshakeMessage::RequestConfig { subject_ref, requester_ref } => {
                if !self.me.is_arbiter() {
                    return Err(SessionError::MisaddressedMessage { kind: "request_config" });
                }

                let id = self.insert_handshake(
                    subject_ref.clone(),
                    requester_ref,
                    HandshakeState::AwaitingConfig,
                );
                info!(
                    handshake = %id,
                    subject = %subject_ref,
                    requester = %requester_ref.short(),
                    "config requested"
                );
                self.open_editor(id)?;
                Ok(id)
            }
            HandshakeMessage::StartSession { target_ref, config } => {
                if target_ref != self.me.id {
                    return Err(SessionError::MisaddressedMessage { kind: "start_session" });
                }

                let id = match self.oldest_awaiting(&config.subject_ref) {
                    Some(id) => id,
                    None => self.insert_handshake(
                        config.subject_ref.clone(),
                        self.me.id,
                        HandshakeState::Dispatched,
                    ),
                };
                self.begin_session(id, config)?;
                Ok(id)
            }
        }
    }

    /// Arbiter commits the edited config.
    ///
    /// Rejected without any state change unless both `author` and this
    /// runtime hold the arbiter role.
    pub fn commit_config(
        &mut self,
        author: &Participant,
        id: HandshakeId,
        config: SessionConfig,
    ) -> Result<(), SessionError> {
        if !author.is_arbiter() || !self.me.is_arbiter() {
            warn!(participant = %author.id.short(), handshake = %id, "unauthorized config attempt");
            self.host.notifier.error("Only the arbiter can configure a dodge check.");
            return Err(SessionError::UnauthorizedConfigAttempt { participant: author.id });
        }

        let handshake = self.handshakes.get(&id).ok_or(SessionError::UnknownHandshake(id))?;
        if handshake.state != HandshakeState::Configuring {
            return Err(SessionError::InvalidState { handshake: id, state: handshake.state });
        }
        if config.subject_ref != handshake.subject_ref {
            return Err(SessionError::SubjectMismatch {
                expected: handshake.subject_ref.clone(),
                got: config.subject_ref,
            });
        }
        derive(&config, &self.playfield)?;

        let requester = handshake.requester;
        if requester == self.me.id {
            return self.begin_session(id, config);
        }

        let name = self.subject_name(&config.subject_ref);
        self.outgoing.push(HandshakeMessage::start_session(requester, config.clone()));
        if let Some(handshake) = self.handshakes.get_mut(&id) {
            handshake.config = Some(config);
            handshake.transition(HandshakeState::Dispatched);
        }
        info!(handshake = %id, target = %requester.short(), "session dispatched");
        self.host.notifier.info(&format!("Game started for {name}."));
        Ok(())
    }

    /// Arbiter closed the editor without committing.
    pub fn dismiss_config(&mut self, id: HandshakeId) -> Result<(), SessionError> {
        let handshake = self.handshakes.get_mut(&id).ok_or(SessionError::UnknownHandshake(id))?;
        if handshake.state != HandshakeState::Configuring {
            return Err(SessionError::InvalidState { handshake: id, state: handshake.state });
        }
        handshake.transition(HandshakeState::Abandoned);
        Ok(())
    }

    /// Dodger clicked into the game window.
    ///
    /// Returns `false` if the game was already running or over.
    pub fn start_game(&mut self, id: HandshakeId) -> Result<bool, SessionError> {
        let engine = self.engines.get_mut(&id).ok_or(SessionError::UnknownHandshake(id))?;
        Ok(engine.start())
    }

    /// Pointer moved inside a game window.
    pub fn pointer_move(&mut self, id: HandshakeId, fractional_x: f64) -> Result<(), SessionError> {
        let engine = self.engines.get_mut(&id).ok_or(SessionError::UnknownHandshake(id))?;
        engine.on_pointer_move(fractional_x);
        Ok(())
    }

    /// Any engine wants another frame.
    pub fn wants_frame(&self) -> bool {
        self.engines.values().any(|e| e.state().is_running())
    }

    /// Deliver one animation frame to every running engine.
    ///
    /// Returns the handshakes that completed on this frame.
    pub fn on_frame(&mut self, now: f64) -> Vec<HandshakeId> {
        let mut completed = Vec::new();

        for (id, engine) in self.engines.iter_mut() {
            if !engine.state().is_running() {
                continue;
            }

            let result = engine.tick(now);
            self.host.renderer.render(*id, &result.state, &result.events);

            if engine.is_finished() {
                completed.push(*id);
            }
        }

        for id in &completed {
            self.complete(*id);
        }

        completed
    }

    /// The game window was closed. Destroys the simulation.
    pub fn close_window(&mut self, id: HandshakeId) -> Result<(), SessionError> {
        let mut engine = self.engines.remove(&id).ok_or(SessionError::UnknownHandshake(id))?;
        engine.close();

        if let Some(handshake) = self.handshakes.get_mut(&id) {
            if handshake.state == HandshakeState::SessionActive {
                handshake.transition(HandshakeState::Abandoned);
            }
        }

        self.host.renderer.window_closed(id);
        Ok(())
    }

    /// Drop finished handshakes that have no open window.
    ///
    /// Dispatched handshakes go too: the session lives on the requester's
    /// runtime from then on.
    pub fn prune_finished(&mut self) {
        let engines = &self.engines;
        self.handshakes
            .retain(|id, h| !h.state.is_finished() || engines.contains_key(id));
    }

    /// Take queued outgoing messages (consumes them).
    pub fn take_outgoing(&mut self) -> Vec<HandshakeMessage> {
        std::mem::take(&mut self.outgoing)
    }

    /// Look up a handshake.
    pub fn handshake(&self, id: &HandshakeId) -> Option<&Handshake> {
        self.handshakes.get(id)
    }

    /// All handshakes for a (subject, requester) pair, oldest first.
    pub fn handshakes_for(&self, subject: &SubjectRef, requester: &ParticipantId) -> Vec<&Handshake> {
        let mut found: Vec<&Handshake> = self
            .handshakes
            .values()
            .filter(|h| &h.subject_ref == subject && &h.requester == requester)
            .collect();
        found.sort_by_key(|h| h.seq);
        found
    }

    /// Number of handshakes tracked.
    pub fn handshake_count(&self) -> usize {
        self.handshakes.len()
    }

    /// The engine behind an open window.
    pub fn engine(&self, id: &HandshakeId) -> Option<&SimulationEngine> {
        self.engines.get(id)
    }

    /// Number of open game windows.
    pub fn open_windows(&self) -> usize {
        self.engines.len()
    }

    fn insert_handshake(
        &mut self,
        subject_ref: SubjectRef,
        requester: ParticipantId,
        state: HandshakeState,
    ) -> HandshakeId {
        let mut handshake = Handshake::new(self.next_seq, subject_ref, requester);
        self.next_seq += 1;
        handshake.transition(state);

        let id = handshake.id;
        self.handshakes.insert(id, handshake);
        id
    }

    /// Our own oldest request for `subject` still waiting on the arbiter.
    fn oldest_awaiting(&self, subject: &SubjectRef) -> Option<HandshakeId> {
        self.handshakes
            .values()
            .filter(|h| {
                h.state == HandshakeState::AwaitingConfig
                    && &h.subject_ref == subject
                    && h.requester == self.me.id
            })
            .min_by_key(|h| h.seq)
            .map(|h| h.id)
    }

    fn open_editor(&mut self, id: HandshakeId) -> Result<(), SessionError> {
        let handshake = self.handshakes.get_mut(&id).ok_or(SessionError::UnknownHandshake(id))?;
        let subject = handshake.subject_ref.clone();

        let Some(profile) = self.host.registry.profile(&subject) else {
            handshake.transition(HandshakeState::Abandoned);
            warn!(handshake = %id, subject = %subject, "subject not found");
            self.host.notifier.error(&format!("Subject {subject} could not be found."));
            return Err(SessionError::MissingSubject(subject));
        };

        let draft = profile.draft_config();
        handshake.transition(HandshakeState::Configuring);
        self.host.editor.present(id, &profile, &draft);
        Ok(())
    }

    fn begin_session(&mut self, id: HandshakeId, config: SessionConfig) -> Result<(), SessionError> {
        let seed = derive_session_seed(id.as_bytes(), config.subject_ref.as_str(), self.me.id.as_bytes());
        let handshake = self.handshakes.get_mut(&id).ok_or(SessionError::UnknownHandshake(id))?;

        let engine = match SimulationEngine::new(config.clone(), self.playfield, seed) {
            Ok(engine) => engine,
            Err(e) => {
                handshake.transition(HandshakeState::Abandoned);
                warn!(handshake = %id, error = %e, "session could not start");
                self.host.notifier.error(&format!("The dodge check could not start: {e}"));
                return Err(e.into());
            }
        };

        handshake.config = Some(config.clone());
        handshake.transition(HandshakeState::SessionActive);

        info!(
            handshake = %id,
            subject = %config.subject_ref,
            dc = config.difficulty_class,
            bonus = config.skill_bonus,
            seed = %hex::encode(seed.to_be_bytes()),
            "session active"
        );
        self.host.renderer.window_opened(id, &config);
        self.engines.insert(id, engine);
        Ok(())
    }

    fn complete(&mut self, id: HandshakeId) {
        let Some(engine) = self.engines.get(&id) else {
            return;
        };
        let outcome = resolve(engine.state(), engine.config());
        let name = self.subject_name(&outcome.subject_ref);

        let Some(handshake) = self.handshakes.get_mut(&id) else {
            return;
        };
        if handshake.state != HandshakeState::SessionActive {
            return;
        }
        handshake.outcome = Some(outcome.clone());
        handshake.transition(HandshakeState::Complete);

        info!(
            handshake = %id,
            subject = %outcome.subject_ref,
            survived = outcome.survived_seconds,
            result = outcome.result_score,
            dc = outcome.difficulty_class,
            success = outcome.success,
            "session complete"
        );
        self.host.renderer.game_over(id, &outcome);
        self.host.announcer.announce(&outcome, &name);
    }

    fn subject_name(&self, subject: &SubjectRef) -> String {
        self.host
            .registry
            .profile(subject)
            .map(|p| p.name)
            .unwrap_or_else(|| FALLBACK_SUBJECT_NAME.to_string())
    }
}
