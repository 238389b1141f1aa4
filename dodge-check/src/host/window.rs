//! Window Collaborators
//!
//! Queue-backed editor and renderer for headless hosts, plus a renderer that
//! draws nothing.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::game::events::{SimEvent, SimEventData};
use crate::game::score::OutcomeRecord;
use crate::game::state::{SessionConfig, SimulationState};
use crate::host::{ConfigEditor, FrameRenderer, SubjectProfile};
use crate::network::session::HandshakeId;

/// A config draft waiting for the arbiter.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigPrompt {
    /// Handshake the draft belongs to
    pub handshake: HandshakeId,
    /// Character name shown in the dialog
    pub subject_name: String,
    /// Prefilled config
    pub draft: SessionConfig,
}

/// Editor that queues prompts for whoever drives the arbiter.
#[derive(Debug, Clone)]
pub struct ChannelEditor {
    tx: mpsc::UnboundedSender<ConfigPrompt>,
}

impl ChannelEditor {
    /// Create an editor and the receiving end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConfigPrompt>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ConfigEditor for ChannelEditor {
    fn present(&mut self, handshake: HandshakeId, subject: &SubjectProfile, draft: &SessionConfig) {
        let prompt = ConfigPrompt {
            handshake,
            subject_name: subject.name.clone(),
            draft: draft.clone(),
        };
        if self.tx.send(prompt).is_err() {
            warn!(%handshake, "config prompt receiver dropped");
        }
    }
}

/// Editor that only logs the draft. For runtimes that never configure.
#[derive(Debug, Default)]
pub struct LogEditor;

impl ConfigEditor for LogEditor {
    fn present(&mut self, handshake: HandshakeId, subject: &SubjectProfile, draft: &SessionConfig) {
        info!(
            %handshake,
            subject = %subject.name,
            dc = draft.difficulty_class,
            bonus = draft.skill_bonus,
            "config draft ready"
        );
    }
}

/// Window lifecycle notifications.
#[derive(Clone, Debug, PartialEq)]
pub enum WindowEvent {
    /// Game window opened
    Opened {
        /// Handshake the window belongs to
        handshake: HandshakeId,
        /// Config it runs
        config: SessionConfig,
    },
    /// Avatar lost a life
    Hit {
        /// Handshake the window belongs to
        handshake: HandshakeId,
        /// Lives left after the hit
        lives_remaining: u8,
    },
    /// Out of lives
    GameOver {
        /// Handshake the window belongs to
        handshake: HandshakeId,
        /// Resolved outcome
        outcome: OutcomeRecord,
    },
    /// Window closed
    Closed {
        /// Handshake the window belongs to
        handshake: HandshakeId,
    },
}

/// Renderer that reports window lifecycle to a queue.
///
/// Per-frame snapshots are dropped; only hits are forwarded.
#[derive(Debug, Clone)]
pub struct ChannelRenderer {
    tx: mpsc::UnboundedSender<WindowEvent>,
}

impl ChannelRenderer {
    /// Create a renderer and the receiving end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WindowEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: WindowEvent) {
        let _ = self.tx.send(event);
    }
}

impl FrameRenderer for ChannelRenderer {
    fn window_opened(&mut self, handshake: HandshakeId, config: &SessionConfig) {
        self.send(WindowEvent::Opened { handshake, config: config.clone() });
    }

    fn render(&mut self, handshake: HandshakeId, _state: &SimulationState, events: &[SimEvent]) {
        for event in events {
            if let SimEventData::AvatarHit { lives_remaining, .. } = event.data {
                self.send(WindowEvent::Hit { handshake, lives_remaining });
            }
        }
    }

    fn game_over(&mut self, handshake: HandshakeId, outcome: &OutcomeRecord) {
        self.send(WindowEvent::GameOver { handshake, outcome: outcome.clone() });
    }

    fn window_closed(&mut self, handshake: HandshakeId) {
        self.send(WindowEvent::Closed { handshake });
    }
}

/// Renderer that draws nothing.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl FrameRenderer for NullRenderer {
    fn window_opened(&mut self, _handshake: HandshakeId, _config: &SessionConfig) {}
    fn render(&mut self, _handshake: HandshakeId, _state: &SimulationState, _events: &[SimEvent]) {}
    fn game_over(&mut self, _handshake: HandshakeId, _outcome: &OutcomeRecord) {}
    fn window_closed(&mut self, _handshake: HandshakeId) {}
}
