//! Simulation Events
//!
//! Events generated during a tick, consumed by the renderer (hit flash,
//! screen shake, game-over banner) and by logging.

use serde::{Serialize, Deserialize};

/// Event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEventData {
    /// An obstacle entered the playfield
    ObstacleSpawned {
        obstacle_id: u32,
        x: f64,
    },

    /// An obstacle hit the avatar
    AvatarHit {
        obstacle_id: u32,
        lives_remaining: u8,
    },

    /// An obstacle fell off the bottom
    ObstacleCulled {
        obstacle_id: u32,
    },

    /// Last life lost
    SessionEnded {
        elapsed_seconds: f64,
    },
}

/// An event with the frame it happened on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    /// Frame counter since start (first frame = 1)
    pub frame: u32,

    /// Event data
    pub data: SimEventData,
}

impl SimEvent {
    /// Create a new event.
    pub fn new(frame: u32, data: SimEventData) -> Self {
        Self { frame, data }
    }

    /// Create obstacle spawned event.
    pub fn obstacle_spawned(frame: u32, obstacle_id: u32, x: f64) -> Self {
        Self::new(frame, SimEventData::ObstacleSpawned { obstacle_id, x })
    }

    /// Create avatar hit event.
    pub fn avatar_hit(frame: u32, obstacle_id: u32, lives_remaining: u8) -> Self {
        Self::new(frame, SimEventData::AvatarHit { obstacle_id, lives_remaining })
    }

    /// Create obstacle culled event.
    pub fn obstacle_culled(frame: u32, obstacle_id: u32) -> Self {
        Self::new(frame, SimEventData::ObstacleCulled { obstacle_id })
    }

    /// Create session ended event.
    pub fn session_ended(frame: u32, elapsed_seconds: f64) -> Self {
        Self::new(frame, SimEventData::SessionEnded { elapsed_seconds })
    }

    /// Whether this event is a hit on the avatar.
    pub fn is_hit(&self) -> bool {
        matches!(self.data, SimEventData::AvatarHit { .. })
    }
}
