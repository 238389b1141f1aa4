//! Network Layer
//!
//! The arbiter/dodger handshake over a shared pub/sub channel.
//! This layer is **non-deterministic** - all simulation runs through `game/`.

pub mod protocol;
pub mod session;
pub mod channel;
pub mod runtime;

pub use protocol::{HandshakeMessage, Participant, ParticipantId, Role};
pub use session::{Handshake, HandshakeId, HandshakeState, SessionCoordinator, SessionError};
pub use channel::{BroadcastChannel, ChannelError};
pub use runtime::{ParticipantRuntime, RuntimeCommand, RuntimeConfig, RuntimeError, RuntimeHandle};
