//! Participant Runtime
//!
//! One tokio task per participant multiplexes the shared channel, local
//! commands and the frame clock. The coordinator and its engines are owned
//! by that task and never shared.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::game::state::{PlayfieldGeometry, SessionConfig, SubjectRef};
use crate::host::Host;
use crate::network::channel::{BroadcastChannel, ChannelError, DEFAULT_CHANNEL_CAPACITY};
use crate::network::protocol::{HandshakeMessage, Participant};
use crate::network::session::{HandshakeId, SessionCoordinator, SessionError};

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Animation frames per second.
    pub frame_rate: u32,
    /// Playfield size used for obstacle sizing.
    pub playfield: PlayfieldGeometry,
    /// How long a finished game window stays open.
    pub close_delay: Duration,
    /// Buffered messages per channel subscriber.
    pub channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frame_rate: crate::FRAME_RATE,
            playfield: PlayfieldGeometry::default(),
            close_delay: Duration::from_millis(3000),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RuntimeConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            frame_rate: env_or("DODGE_FRAME_RATE", defaults.frame_rate),
            playfield: PlayfieldGeometry::new(
                env_or("DODGE_PLAYFIELD_WIDTH", defaults.playfield.width_px),
                env_or("DODGE_PLAYFIELD_HEIGHT", defaults.playfield.height_px),
            ),
            close_delay: Duration::from_millis(env_or(
                "DODGE_CLOSE_DELAY_MS",
                defaults.close_delay.as_millis() as u64,
            )),
            channel_capacity: env_or("DODGE_CHANNEL_CAPACITY", defaults.channel_capacity),
        }
    }

    /// Interval between frames.
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Publishing failed.
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Coordinator rejected a command.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// The runtime task is gone.
    #[error("Runtime stopped")]
    Stopped,
}

/// Local commands from the host UI.
#[derive(Debug)]
pub enum RuntimeCommand {
    /// Sheet button pressed.
    RequestCheck {
        /// Character to check
        subject: SubjectRef,
        /// Receives the new handshake id
        reply: oneshot::Sender<Result<HandshakeId, SessionError>>,
    },
    /// Arbiter committed the editor. Authored by this runtime's participant.
    CommitConfig {
        /// Handshake being configured
        handshake: HandshakeId,
        /// Edited config
        config: SessionConfig,
    },
    /// Arbiter dismissed the editor.
    DismissConfig {
        /// Handshake being configured
        handshake: HandshakeId,
    },
    /// Click inside the game window.
    StartGame {
        /// Window's handshake
        handshake: HandshakeId,
    },
    /// Pointer moved inside the game window.
    PointerMove {
        /// Window's handshake
        handshake: HandshakeId,
        /// Playfield-relative x in [0, 1]
        fractional_x: f64,
    },
    /// Window closed by the user.
    CloseWindow {
        /// Window's handshake
        handshake: HandshakeId,
    },
    /// Stop the runtime.
    Shutdown,
}

/// Cloneable handle for sending commands to a runtime.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    participant: Participant,
    tx: mpsc::UnboundedSender<RuntimeCommand>,
}

impl RuntimeHandle {
    /// Participant the runtime belongs to.
    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    /// Request a check and wait for the handshake id.
    pub async fn request_check(&self, subject: SubjectRef) -> Result<HandshakeId, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.send(RuntimeCommand::RequestCheck { subject, reply })?;
        let result = rx.await.map_err(|_| RuntimeError::Stopped)?;
        Ok(result?)
    }

    /// Commit a config as this runtime's participant.
    pub fn commit_config(&self, handshake: HandshakeId, config: SessionConfig) -> Result<(), RuntimeError> {
        self.send(RuntimeCommand::CommitConfig { handshake, config })
    }

    /// Dismiss the editor.
    pub fn dismiss_config(&self, handshake: HandshakeId) -> Result<(), RuntimeError> {
        self.send(RuntimeCommand::DismissConfig { handshake })
    }

    /// Start the game in a window.
    pub fn start_game(&self, handshake: HandshakeId) -> Result<(), RuntimeError> {
        self.send(RuntimeCommand::StartGame { handshake })
    }

    /// Forward a pointer move.
    pub fn pointer_move(&self, handshake: HandshakeId, fractional_x: f64) -> Result<(), RuntimeError> {
        self.send(RuntimeCommand::PointerMove { handshake, fractional_x })
    }

    /// Close a game window.
    pub fn close_window(&self, handshake: HandshakeId) -> Result<(), RuntimeError> {
        self.send(RuntimeCommand::CloseWindow { handshake })
    }

    /// Stop the runtime. No-op if it already stopped.
    pub fn shutdown(&self) {
        let _ = self.tx.send(RuntimeCommand::Shutdown);
    }

    fn send(&self, command: RuntimeCommand) -> Result<(), RuntimeError> {
        self.tx.send(command).map_err(|_| RuntimeError::Stopped)
    }
}

// =============================================================================
// RUNTIME
// =============================================================================

/// Async driver for one participant.
pub struct ParticipantRuntime {
    coordinator: SessionCoordinator,
    channel: BroadcastChannel,
    inbox: broadcast::Receiver<String>,
    commands: mpsc::UnboundedReceiver<RuntimeCommand>,
    config: RuntimeConfig,
    pending_closes: Vec<(Instant, HandshakeId)>,
}

impl ParticipantRuntime {
    /// Create a runtime subscribed to `channel`.
    ///
    /// The subscription is taken here, so messages published before
    /// [`run`](Self::run) is polled are still delivered.
    pub fn new(
        me: Participant,
        host: Host,
        channel: &BroadcastChannel,
        config: &RuntimeConfig,
    ) -> (Self, RuntimeHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        let runtime = Self {
            coordinator: SessionCoordinator::new(me, config.playfield, host),
            channel: channel.clone(),
            inbox: channel.subscribe(),
            commands,
            config: config.clone(),
            pending_closes: Vec::new(),
        };
        (runtime, RuntimeHandle { participant: me, tx })
    }

    /// Run until shutdown or until every handle is dropped.
    #[instrument(skip(self), fields(participant = %self.coordinator.me().id.short(), role = ?self.coordinator.me().role))]
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        let mut frames = interval(self.config.frame_period());
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let clock = Instant::now();

        info!(frame_rate = self.config.frame_rate, "runtime started");

        loop {
            let animating = self.coordinator.wants_frame() || !self.pending_closes.is_empty();

            tokio::select! {
                received = self.inbox.recv() => match received {
                    Ok(payload) => self.on_payload(&payload),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "handshake channel lagged");
                    }
                    Err(RecvError::Closed) => {
                        info!("handshake channel closed");
                        break;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(RuntimeCommand::Shutdown) | None => break,
                    Some(command) => self.on_command(command),
                },
                _ = frames.tick(), if animating => {
                    self.on_frame(clock.elapsed().as_secs_f64());
                }
            }

            for message in self.coordinator.take_outgoing() {
                self.channel.publish(&message)?;
            }
        }

        info!("runtime stopped");
        Ok(())
    }

    fn on_payload(&mut self, payload: &str) {
        let message = match HandshakeMessage::from_json(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "undecodable handshake message");
                return;
            }
        };

        let kind = message.kind();
        match self.coordinator.handle_message(message) {
            Ok(handshake) => debug!(%handshake, kind, "message handled"),
            Err(e) if e.is_silent() => debug!(kind, "message not for us"),
            Err(e) => warn!(error = %e, kind, "message rejected"),
        }
        self.coordinator.prune_finished();
    }

    fn on_command(&mut self, command: RuntimeCommand) {
        let me = *self.coordinator.me();
        let result = match command {
            RuntimeCommand::RequestCheck { subject, reply } => {
                let _ = reply.send(self.coordinator.request_check(subject));
                Ok(())
            }
            RuntimeCommand::CommitConfig { handshake, config } => {
                self.coordinator.commit_config(&me, handshake, config)
            }
            RuntimeCommand::DismissConfig { handshake } => self.coordinator.dismiss_config(handshake),
            RuntimeCommand::StartGame { handshake } => self.coordinator.start_game(handshake).map(|started| {
                if !started {
                    debug!(%handshake, "game already started");
                }
            }),
            RuntimeCommand::PointerMove { handshake, fractional_x } => {
                self.coordinator.pointer_move(handshake, fractional_x)
            }
            RuntimeCommand::CloseWindow { handshake } => {
                self.pending_closes.retain(|(_, id)| *id != handshake);
                self.coordinator.close_window(handshake)
            }
            RuntimeCommand::Shutdown => Ok(()),
        };

        if let Err(e) = result {
            warn!(error = %e, "command rejected");
        }
        self.coordinator.prune_finished();
    }

    fn on_frame(&mut self, now: f64) {
        let close_at = Instant::now() + self.config.close_delay;
        for handshake in self.coordinator.on_frame(now) {
            self.pending_closes.push((close_at, handshake));
        }

        let due = Instant::now();
        let (ready, waiting): (Vec<_>, Vec<_>) =
            self.pending_closes.drain(..).partition(|(at, _)| *at <= due);
        self.pending_closes = waiting;

        for (_, handshake) in ready {
            if self.coordinator.close_window(handshake).is_ok() {
                debug!(%handshake, "finished window closed");
            }
        }
        self.coordinator.prune_finished();
    }
}
