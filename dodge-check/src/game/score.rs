//! Score Resolution
//!
//! Turns a finished simulation into the check result.

use serde::{Serialize, Deserialize};

use crate::game::state::{SessionConfig, SimulationState, SubjectRef};

/// Minimum result with reliable talent.
pub const RELIABLE_TALENT_FLOOR: i32 = 10;

/// Final result of one session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Character that was checked
    pub subject_ref: SubjectRef,
    /// Seconds survived
    pub survived_seconds: f64,
    /// Skill bonus added to the survived seconds
    pub applied_bonus: i32,
    /// Check result
    pub result_score: i32,
    /// Target number
    pub difficulty_class: i32,
    /// `result_score >= difficulty_class`
    pub success: bool,
}

/// Resolve a finished session.
///
/// Whole survived seconds plus the skill bonus, floored at 10 with
/// reliable talent, compared against the DC.
pub fn resolve(state: &SimulationState, config: &SessionConfig) -> OutcomeRecord {
    let survived_seconds = state.elapsed_seconds.max(0.0);
    let mut result_score = (survived_seconds.floor() as i32).saturating_add(config.skill_bonus);

    if config.has_reliable_talent && result_score < RELIABLE_TALENT_FLOOR {
        result_score = RELIABLE_TALENT_FLOOR;
    }

    OutcomeRecord {
        subject_ref: config.subject_ref.clone(),
        survived_seconds,
        applied_bonus: config.skill_bonus,
        result_score,
        difficulty_class: config.difficulty_class,
        success: result_score >= config.difficulty_class,
    }
}
