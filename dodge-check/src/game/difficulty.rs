//! Difficulty Model
//!
//! Maps a session configuration to simulation tuning. Pure and stateless.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::game::state::{PlayfieldGeometry, SessionConfig};

/// Seconds between spawns with no flags set.
pub const BASE_SPAWN_INTERVAL: f64 = 0.8;

/// Spawn interval under disadvantage.
pub const DISADVANTAGE_SPAWN_INTERVAL: f64 = 0.4;

/// Spawn interval under advantage (wins over disadvantage).
pub const ADVANTAGE_SPAWN_INTERVAL: f64 = 1.2;

/// Extra seconds between spawns per point of skill bonus.
pub const SPAWN_INTERVAL_PER_BONUS: f64 = 0.02;

/// Spawn interval never drops below this.
pub const MIN_SPAWN_INTERVAL: f64 = 0.05;

/// Fall speed at DC 0 (percent of height per second).
pub const BASE_OBSTACLE_SPEED: f64 = 25.0;

/// Fall speed added per point of DC.
pub const SPEED_PER_DC: f64 = 2.5;

/// Obstacle size in pixels.
pub const OBSTACLE_SIZE_PX: f64 = 35.0;

/// Obstacle size in pixels with reliable talent.
pub const RELIABLE_OBSTACLE_SIZE_PX: f64 = 20.0;

/// Configuration rejected before a session can start.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidConfig {
    /// DC must be a positive integer.
    #[error("difficulty class must be positive, got {0}")]
    NonPositiveDifficulty(i32),

    /// Playfield dimensions must be finite and positive.
    #[error("playfield geometry must be finite and positive, got {width}x{height}")]
    BadPlayfield {
        /// Offending width
        width: f64,
        /// Offending height
        height: f64,
    },
}

/// Tuning parameters for one session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    /// Seconds between spawns
    pub spawn_interval: f64,
    /// Fall speed (percent of playfield height per second)
    pub obstacle_speed: f64,
    /// Obstacle size in pixels
    pub obstacle_size_px: f64,
    /// Obstacle size as percent of playfield width
    pub obstacle_size_percent: f64,
}

/// Derive tuning from a config and the session's playfield.
///
/// # Errors
///
/// Returns [`InvalidConfig`] for a non-positive DC or a malformed playfield.
pub fn derive(config: &SessionConfig, playfield: &PlayfieldGeometry) -> Result<Tuning, InvalidConfig> {
    if config.difficulty_class <= 0 {
        return Err(InvalidConfig::NonPositiveDifficulty(config.difficulty_class));
    }
    if !playfield.is_valid() {
        return Err(InvalidConfig::BadPlayfield {
            width: playfield.width_px,
            height: playfield.height_px,
        });
    }

    let obstacle_size_px = if config.has_reliable_talent {
        RELIABLE_OBSTACLE_SIZE_PX
    } else {
        OBSTACLE_SIZE_PX
    };

    Ok(Tuning {
        spawn_interval: spawn_interval(config),
        obstacle_speed: BASE_OBSTACLE_SPEED + config.difficulty_class as f64 * SPEED_PER_DC,
        obstacle_size_px,
        obstacle_size_percent: playfield.width_percent(obstacle_size_px),
    })
}

/// Seconds between spawns.
///
/// Advantage is checked after disadvantage, so it wins when both are set.
fn spawn_interval(config: &SessionConfig) -> f64 {
    let mut interval = BASE_SPAWN_INTERVAL;
    if config.has_disadvantage {
        interval = DISADVANTAGE_SPAWN_INTERVAL;
    }
    if config.has_advantage {
        interval = ADVANTAGE_SPAWN_INTERVAL;
    }

    interval += config.skill_bonus as f64 * SPAWN_INTERVAL_PER_BONUS;
    interval.max(MIN_SPAWN_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::SubjectRef;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn config(dc: i32, bonus: i32) -> SessionConfig {
        SessionConfig::new(SubjectRef::new("actor-1"), dc, bonus)
    }

    #[test]
    fn test_reference_example() {
        let tuning = derive(&config(15, 2), &PlayfieldGeometry::default()).unwrap();

        assert!((tuning.obstacle_speed - 62.5).abs() < EPS);
        assert!((tuning.spawn_interval - 0.84).abs() < EPS);
        assert_eq!(tuning.obstacle_size_px, 35.0);
        assert!((tuning.obstacle_size_percent - 35.0 / 450.0 * 100.0).abs() < EPS);
    }

    #[test]
    fn test_disadvantage() {
        let mut c = config(10, 0);
        c.has_disadvantage = true;
        let tuning = derive(&c, &PlayfieldGeometry::default()).unwrap();
        assert!((tuning.spawn_interval - 0.4).abs() < EPS);
    }

    #[test]
    fn test_advantage_wins_over_disadvantage() {
        // Both flags set: advantage is applied last and wins.
        let mut c = config(10, 3);
        c.has_disadvantage = true;
        c.has_advantage = true;
        let tuning = derive(&c, &PlayfieldGeometry::default()).unwrap();
        assert!((tuning.spawn_interval - (1.2 + 3.0 * 0.02)).abs() < EPS);
    }

    #[test]
    fn test_reliable_talent_shrinks_obstacles() {
        let mut c = config(10, 0);
        c.has_reliable_talent = true;
        let playfield = PlayfieldGeometry::new(400.0, 600.0);
        let tuning = derive(&c, &playfield).unwrap();
        assert_eq!(tuning.obstacle_size_px, 20.0);
        assert!((tuning.obstacle_size_percent - 5.0).abs() < EPS);
    }

    #[test]
    fn test_large_negative_bonus_is_floored() {
        let tuning = derive(&config(10, -100), &PlayfieldGeometry::default()).unwrap();
        assert_eq!(tuning.spawn_interval, MIN_SPAWN_INTERVAL);
    }

    #[test]
    fn test_rejects_non_positive_dc() {
        assert_eq!(
            derive(&config(0, 0), &PlayfieldGeometry::default()),
            Err(InvalidConfig::NonPositiveDifficulty(0))
        );
        assert!(derive(&config(-5, 0), &PlayfieldGeometry::default()).is_err());
    }

    #[test]
    fn test_rejects_non_finite_playfield() {
        let result = derive(&config(10, 0), &PlayfieldGeometry::new(f64::NAN, 600.0));
        assert!(matches!(result, Err(InvalidConfig::BadPlayfield { .. })));
    }

    fn any_config() -> impl Strategy<Value = SessionConfig> {
        (1i32..=40, -15i32..=20, any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(dc, bonus, dis, adv, reliable)| SessionConfig {
                subject_ref: SubjectRef::new("actor-1"),
                difficulty_class: dc,
                skill_bonus: bonus,
                has_disadvantage: dis,
                has_advantage: adv,
                has_reliable_talent: reliable,
            },
        )
    }

    proptest! {
        #[test]
        fn prop_total_and_positive(c in any_config(), width in 50.0f64..2000.0) {
            let playfield = PlayfieldGeometry::new(width, 600.0);
            let a = derive(&c, &playfield).unwrap();
            let b = derive(&c, &playfield).unwrap();
            prop_assert_eq!(a, b);
            prop_assert!(a.spawn_interval > 0.0);
            prop_assert!(a.obstacle_speed > 0.0);
            prop_assert!(a.obstacle_size_percent > 0.0);
        }

        #[test]
        fn prop_speed_increases_with_dc(c in any_config()) {
            let mut harder = c.clone();
            harder.difficulty_class += 1;
            let playfield = PlayfieldGeometry::default();
            let base = derive(&c, &playfield).unwrap();
            let next = derive(&harder, &playfield).unwrap();
            prop_assert!(next.obstacle_speed > base.obstacle_speed);
        }

        #[test]
        fn prop_interval_increases_with_bonus(c in any_config()) {
            let mut better = c.clone();
            better.skill_bonus += 1;
            let playfield = PlayfieldGeometry::default();
            let base = derive(&c, &playfield).unwrap();
            let next = derive(&better, &playfield).unwrap();
            prop_assert!(next.spawn_interval > base.spawn_interval);
        }
    }
}
