//! Protocol Messages
//!
//! Wire format for the shared handshake topic. Exactly two message shapes
//! travel over it, serialized as JSON with a `type` tag.

use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::game::state::{SessionConfig, SubjectRef};

// =============================================================================
// PARTICIPANTS
// =============================================================================

/// Identity of a participant runtime (a connected user).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Fresh random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// First four bytes as hex, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.as_bytes()[..4])
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Role of a participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Authorized to author session configs (the game master).
    Arbiter,
    /// A player whose checks are resolved through the mini-game.
    Dodger,
}

/// A participant and its role. Immutable for the session lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Identity
    pub id: ParticipantId,
    /// Role
    pub role: Role,
}

impl Participant {
    /// Create an arbiter.
    pub fn arbiter(id: ParticipantId) -> Self {
        Self { id, role: Role::Arbiter }
    }

    /// Create a dodger.
    pub fn dodger(id: ParticipantId) -> Self {
        Self { id, role: Role::Dodger }
    }

    /// Check if this participant may author configs.
    pub fn is_arbiter(&self) -> bool {
        self.role == Role::Arbiter
    }
}

// =============================================================================
// HANDSHAKE MESSAGES
// =============================================================================

/// Messages on the shared handshake topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandshakeMessage {
    /// A dodger asks the arbiter to configure a check.
    RequestConfig {
        /// Character to check
        subject_ref: SubjectRef,
        /// Who asked
        requester_ref: ParticipantId,
    },

    /// The arbiter hands a committed config to one participant.
    StartSession {
        /// The only runtime allowed to act on this message
        target_ref: ParticipantId,
        /// Committed config
        config: SessionConfig,
    },
}

impl HandshakeMessage {
    /// Build a config request.
    pub fn request_config(subject_ref: SubjectRef, requester_ref: ParticipantId) -> Self {
        Self::RequestConfig { subject_ref, requester_ref }
    }

    /// Build a session start.
    pub fn start_session(target_ref: ParticipantId, config: SessionConfig) -> Self {
        Self::StartSession { target_ref, config }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RequestConfig { .. } => "request_config",
            Self::StartSession { .. } => "start_session",
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
