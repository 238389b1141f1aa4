//! Game State Definitions
//!
//! All state types for one dodge session. Positions are percentages of the
//! playfield: horizontal `0..100` left to right, vertical `0..100` top to
//! bottom, with obstacles allowed slightly outside the visible band.

use serde::{Serialize, Deserialize};

use crate::core::hash::{StateHash, StateHasher};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Lives at session start.
pub const MAX_LIVES: u8 = 3;

/// Leftmost avatar position (percent).
pub const AVATAR_MIN_X: f64 = 2.0;

/// Rightmost avatar position (percent).
pub const AVATAR_MAX_X: f64 = 98.0;

/// Avatar position before any pointer input.
pub const AVATAR_START_X: f64 = 50.0;

/// Half the avatar width (the avatar is 5% wide).
pub const AVATAR_HALF_WIDTH: f64 = 2.5;

/// Extra horizontal slack added to the hit test.
pub const HIT_MARGIN: f64 = 2.0;

/// Upper edge of the collision band (inclusive).
pub const HIT_BAND_TOP: f64 = 85.0;

/// Lower edge of the collision band (exclusive).
pub const HIT_BAND_BOTTOM: f64 = 95.0;

/// Obstacles below this line are culled.
pub const CULL_LINE: f64 = 105.0;

/// Vertical position of freshly spawned obstacles, just above the top edge.
pub const SPAWN_Y: f64 = -5.0;

/// Horizontal spawn range (percent).
pub const SPAWN_X_MIN: f64 = 5.0;
/// Horizontal spawn range (percent).
pub const SPAWN_X_MAX: f64 = 95.0;

// =============================================================================
// SUBJECT & CONFIG
// =============================================================================

/// Reference to the character a check is performed against.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectRef(pub String);

impl SubjectRef {
    /// Create from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Challenge configuration authored by the arbiter.
///
/// Immutable once committed; travels by value inside `StartSession`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Character being checked
    pub subject_ref: SubjectRef,
    /// Target number (DC), must be positive
    pub difficulty_class: i32,
    /// Skill bonus added to the survived seconds
    pub skill_bonus: i32,
    /// Faster spawns (e.g. armor with stealth disadvantage)
    pub has_disadvantage: bool,
    /// Slower spawns; overrides disadvantage
    pub has_advantage: bool,
    /// Smaller obstacles and a floor of 10 on the result
    pub has_reliable_talent: bool,
}

impl SessionConfig {
    /// Plain config with no flags set.
    pub fn new(subject_ref: SubjectRef, difficulty_class: i32, skill_bonus: i32) -> Self {
        Self {
            subject_ref,
            difficulty_class,
            skill_bonus,
            has_disadvantage: false,
            has_advantage: false,
            has_reliable_talent: false,
        }
    }
}

// =============================================================================
// PLAYFIELD
// =============================================================================

/// Pixel geometry of the playfield.
///
/// Read-only for the lifetime of a session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayfieldGeometry {
    /// Width in pixels
    pub width_px: f64,
    /// Height in pixels
    pub height_px: f64,
}

impl Default for PlayfieldGeometry {
    fn default() -> Self {
        Self {
            width_px: 450.0,
            height_px: 600.0,
        }
    }
}

impl PlayfieldGeometry {
    /// Create a geometry.
    pub fn new(width_px: f64, height_px: f64) -> Self {
        Self { width_px, height_px }
    }

    /// Both dimensions are finite and positive.
    pub fn is_valid(&self) -> bool {
        self.width_px.is_finite()
            && self.height_px.is_finite()
            && self.width_px > 0.0
            && self.height_px > 0.0
    }

    /// Convert a horizontal pixel length to percent of playfield width.
    #[inline]
    pub fn width_percent(&self, px: f64) -> f64 {
        px / self.width_px * 100.0
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// A falling obstacle (a guard).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Monotonic id within the session
    pub id: u32,
    /// Horizontal center (percent)
    pub x: f64,
    /// Vertical position (percent, grows downward)
    pub y: f64,
    /// Fall speed (percent of playfield height per second)
    pub speed: f64,
    /// Rendered width (percent of playfield width)
    pub width_percent: f64,
}

impl Obstacle {
    /// Inside the vertical collision band.
    #[inline]
    pub fn in_hit_band(&self) -> bool {
        self.y >= HIT_BAND_TOP && self.y < HIT_BAND_BOTTOM
    }

    /// Fallen off the bottom of the playfield.
    #[inline]
    pub fn is_off_screen(&self) -> bool {
        self.y > CULL_LINE
    }
}

/// The dodging avatar.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AvatarState {
    /// Horizontal center (percent), always within `[2, 98]`
    pub x: f64,
}

impl Default for AvatarState {
    fn default() -> Self {
        Self { x: AVATAR_START_X }
    }
}

impl AvatarState {
    /// Move to a horizontal position, clamped to the avatar band.
    pub fn move_to(&mut self, x: f64) {
        self.x = x.clamp(AVATAR_MIN_X, AVATAR_MAX_X);
    }
}

// =============================================================================
// SIMULATION STATE
// =============================================================================

/// Phase of the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Default)]
pub enum SimPhase {
    /// Window open, waiting for the start click
    #[default]
    Idle,
    /// Frames are being processed
    Running,
    /// Out of lives (or window closed); terminal
    Ended,
}

/// Complete state of one dodge session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Current phase
    pub phase: SimPhase,

    /// Seconds since the first frame after start
    pub elapsed_seconds: f64,

    /// Remaining lives (0..=3)
    pub lives: u8,

    /// The avatar
    pub avatar: AvatarState,

    /// Live obstacles, in spawn order
    pub obstacles: Vec<Obstacle>,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationState {
    /// Fresh idle state.
    pub fn new() -> Self {
        Self {
            phase: SimPhase::Idle,
            elapsed_seconds: 0.0,
            lives: MAX_LIVES,
            avatar: AvatarState::default(),
            obstacles: Vec::new(),
        }
    }

    /// Check if the session has ended.
    pub fn is_ended(&self) -> bool {
        self.phase == SimPhase::Ended
    }

    /// Check if frames are being processed.
    pub fn is_running(&self) -> bool {
        self.phase == SimPhase::Running
    }

    /// Compute a deterministic hash of the snapshot.
    pub fn compute_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_simulation_state();
        hasher.update_u8(self.phase as u8);
        hasher.update_f64(self.elapsed_seconds);
        hasher.update_u8(self.lives);
        hasher.update_f64(self.avatar.x);
        hasher.update_u32(self.obstacles.len() as u32);
        for obstacle in &self.obstacles {
            hasher.update_u32(obstacle.id);
            hasher.update_f64(obstacle.x);
            hasher.update_f64(obstacle.y);
            hasher.update_f64(obstacle.speed);
            hasher.update_f64(obstacle.width_percent);
        }
        hasher.finalize()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn obstacle_at(y: f64) -> Obstacle {
        Obstacle { id: 0, x: 50.0, y, speed: 50.0, width_percent: 7.0 }
    }

    #[test]
    fn test_new_state() {
        let state = SimulationState::new();
        assert_eq!(state.phase, SimPhase::Idle);
        assert_eq!(state.lives, MAX_LIVES);
        assert_eq!(state.avatar.x, AVATAR_START_X);
        assert!(state.obstacles.is_empty());
    }

    #[test]
    fn test_avatar_clamp() {
        let mut avatar = AvatarState::default();
        avatar.move_to(-10.0);
        assert_eq!(avatar.x, AVATAR_MIN_X);
        avatar.move_to(150.0);
        assert_eq!(avatar.x, AVATAR_MAX_X);
        avatar.move_to(33.0);
        assert_eq!(avatar.x, 33.0);
    }

    #[test]
    fn test_hit_band_edges() {
        assert!(!obstacle_at(84.9).in_hit_band());
        assert!(obstacle_at(85.0).in_hit_band());
        assert!(obstacle_at(94.9).in_hit_band());
        assert!(!obstacle_at(95.0).in_hit_band());
    }

    #[test]
    fn test_off_screen() {
        assert!(!obstacle_at(105.0).is_off_screen());
        assert!(obstacle_at(106.0).is_off_screen());
    }

    #[test]
    fn test_playfield_validity() {
        assert!(PlayfieldGeometry::default().is_valid());
        assert!(!PlayfieldGeometry::new(0.0, 600.0).is_valid());
        assert!(!PlayfieldGeometry::new(f64::NAN, 600.0).is_valid());
        assert!(!PlayfieldGeometry::new(450.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_hash_tracks_changes() {
        let a = SimulationState::new();
        let mut b = SimulationState::new();
        assert_eq!(a.compute_hash(), b.compute_hash());

        b.avatar.move_to(60.0);
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_config_json_shape() {
        let config = SessionConfig::new(SubjectRef::new("actor-1"), 15, 2);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["subject_ref"], "actor-1");
        assert_eq!(json["difficulty_class"], 15);
    }
}
