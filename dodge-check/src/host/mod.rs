//! Host Collaborators
//!
//! Services provided by the surrounding application: the subject registry,
//! the arbiter's config editor, notifications, the game window and the
//! result announcement. They are injected into the coordinator at
//! construction and never reached as globals.

pub mod subject;
pub mod announce;
pub mod window;

pub use subject::{SubjectProfile, Equipment, ItemKind, InMemoryRegistry};
pub use announce::{ChatCard, LogAnnouncer, ChannelAnnouncer};
pub use window::{ConfigPrompt, ChannelEditor, LogEditor, WindowEvent, ChannelRenderer, NullRenderer};

use crate::game::events::SimEvent;
use crate::game::score::OutcomeRecord;
use crate::game::state::{SessionConfig, SimulationState, SubjectRef};
use crate::network::session::HandshakeId;

/// Resolves subject references to character data.
pub trait SubjectRegistry: Send {
    /// Look up a subject. `None` if it cannot be resolved.
    fn profile(&self, subject: &SubjectRef) -> Option<SubjectProfile>;
}

/// Interactive editing surface for the arbiter.
///
/// The arbiter later commits (or dismisses) through the coordinator.
pub trait ConfigEditor: Send {
    /// Show a prefilled draft for a handshake.
    fn present(&mut self, handshake: HandshakeId, subject: &SubjectProfile, draft: &SessionConfig);
}

/// Short user-facing notices (toasts).
pub trait Notifier: Send {
    /// Informational notice.
    fn info(&mut self, message: &str);
    /// Something the user tried was rejected.
    fn error(&mut self, message: &str);
}

/// Turns simulation snapshots into pixels.
pub trait FrameRenderer: Send {
    /// A game window opened for a committed config.
    fn window_opened(&mut self, handshake: HandshakeId, config: &SessionConfig);
    /// A frame was simulated.
    fn render(&mut self, handshake: HandshakeId, state: &SimulationState, events: &[SimEvent]);
    /// The simulation ended by losing every life.
    fn game_over(&mut self, handshake: HandshakeId, outcome: &OutcomeRecord);
    /// The window went away.
    fn window_closed(&mut self, handshake: HandshakeId);
}

/// Publishes the check result.
pub trait Announcer: Send {
    /// Announce one outcome. Called exactly once per completed session.
    fn announce(&mut self, outcome: &OutcomeRecord, subject_name: &str);
}

/// Notifier that writes to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn info(&mut self, message: &str) {
        tracing::info!(notice = message, "notification");
    }

    fn error(&mut self, message: &str) {
        tracing::warn!(notice = message, "notification");
    }
}

/// All collaborators a coordinator needs.
pub struct Host {
    /// Subject lookup
    pub registry: Box<dyn SubjectRegistry>,
    /// Arbiter's config editor
    pub editor: Box<dyn ConfigEditor>,
    /// Toasts
    pub notifier: Box<dyn Notifier>,
    /// Game window
    pub renderer: Box<dyn FrameRenderer>,
    /// Result announcement
    pub announcer: Box<dyn Announcer>,
}

impl Host {
    /// Bundle collaborators.
    pub fn new(
        registry: impl SubjectRegistry + 'static,
        editor: impl ConfigEditor + 'static,
        notifier: impl Notifier + 'static,
        renderer: impl FrameRenderer + 'static,
        announcer: impl Announcer + 'static,
    ) -> Self {
        Self {
            registry: Box::new(registry),
            editor: Box::new(editor),
            notifier: Box::new(notifier),
            renderer: Box::new(renderer),
            announcer: Box::new(announcer),
        }
    }
}
