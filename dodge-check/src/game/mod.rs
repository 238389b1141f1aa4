//! Game Logic Module
//!
//! The dodge simulation and its pure helpers. Nothing here performs I/O.
//!
//! ## Module Structure
//!
//! - `state`: Session config, obstacles, avatar, simulation state
//! - `difficulty`: Config to tuning
//! - `input`: Pointer normalization
//! - `collision`: Avatar hit test
//! - `tick`: Frame-driven simulation engine
//! - `score`: Outcome resolution
//! - `events`: Events emitted per frame

pub mod state;
pub mod difficulty;
pub mod input;
pub mod collision;
pub mod tick;
pub mod score;
pub mod events;

// Re-export key types
pub use state::{
    SessionConfig, SubjectRef, SimulationState, SimPhase, Obstacle, AvatarState,
    PlayfieldGeometry,
};
pub use difficulty::{InvalidConfig, Tuning};
pub use input::PointerInput;
pub use tick::{SimulationEngine, TickResult};
pub use score::OutcomeRecord;
pub use events::{SimEvent, SimEventData};
