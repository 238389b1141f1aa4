//! # Dodge Check
//!
//! Stealth checks resolved by a short dodge mini-game instead of a die roll.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        DODGE CHECK                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Deterministic primitives                 │
//! │  ├── rng.rs       - Seeded Xorshift128+ PRNG                 │
//! │  └── hash.rs      - State hashing                            │
//! │                                                              │
//! │  game/            - Simulation (deterministic)               │
//! │  ├── state.rs     - Config, obstacles, avatar                │
//! │  ├── difficulty.rs- Config to spawn/speed/size tuning        │
//! │  ├── input.rs     - Pointer normalization                    │
//! │  ├── collision.rs - Avatar hit test                          │
//! │  ├── tick.rs      - Frame-driven simulation engine           │
//! │  └── score.rs     - Outcome resolution                       │
//! │                                                              │
//! │  network/         - Handshake (non-deterministic)            │
//! │  ├── protocol.rs  - Wire messages                            │
//! │  ├── session.rs   - Handshake coordinator                    │
//! │  ├── channel.rs   - Shared broadcast channel                 │
//! │  └── runtime.rs   - Per-participant async driver             │
//! │                                                              │
//! │  host/            - Injected host services                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Given the same config, seed, frame timestamps and pointer positions, the
//! engine produces the same states and the same snapshot hashes. The seed is
//! derived from the handshake, the subject and the dodger's identity.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod host;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use game::state::{SessionConfig, SubjectRef, SimulationState, PlayfieldGeometry};
pub use game::tick::SimulationEngine;
pub use game::score::OutcomeRecord;
pub use network::{BroadcastChannel, HandshakeMessage, Participant, ParticipantId, ParticipantRuntime};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default animation frame rate (Hz)
pub const FRAME_RATE: u32 = 60;
