//! Collision Detection
//!
//! One-dimensional hit test between the avatar and falling obstacles.

use crate::game::state::{AvatarState, Obstacle, AVATAR_HALF_WIDTH, HIT_MARGIN};

/// Horizontal distance under which an in-band obstacle hits the avatar.
pub const HIT_DISTANCE: f64 = AVATAR_HALF_WIDTH + HIT_MARGIN;

/// Check if an obstacle hits the avatar.
///
/// Only obstacles inside the vertical collision band can hit.
#[inline]
pub fn obstacle_hits_avatar(obstacle: &Obstacle, avatar: &AvatarState) -> bool {
    obstacle.in_hit_band() && (obstacle.x - avatar.x).abs() < HIT_DISTANCE
}

/// Indices of obstacles hitting the avatar, in spawn order.
pub fn check_obstacle_hits(obstacles: &[Obstacle], avatar: &AvatarState) -> Vec<usize> {
    obstacles
        .iter()
        .enumerate()
        .filter(|(_, o)| obstacle_hits_avatar(o, avatar))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obstacle(x: f64, y: f64) -> Obstacle {
        Obstacle { id: 1, x, y, speed: 60.0, width_percent: 7.7 }
    }

    #[test]
    fn test_close_obstacle_hits() {
        let avatar = AvatarState { x: 51.0 };
        assert!(obstacle_hits_avatar(&obstacle(50.0, 90.0), &avatar));
    }

    #[test]
    fn test_far_obstacle_misses() {
        let avatar = AvatarState { x: 51.0 };
        assert!(!obstacle_hits_avatar(&obstacle(60.0, 90.0), &avatar));
    }

    #[test]
    fn test_hit_distance_is_exclusive() {
        let avatar = AvatarState { x: 50.0 };
        assert!(!obstacle_hits_avatar(&obstacle(54.5, 90.0), &avatar));
        assert!(obstacle_hits_avatar(&obstacle(54.4, 90.0), &avatar));
    }

    #[test]
    fn test_outside_band_misses() {
        let avatar = AvatarState { x: 50.0 };
        assert!(!obstacle_hits_avatar(&obstacle(50.0, 80.0), &avatar));
        assert!(!obstacle_hits_avatar(&obstacle(50.0, 95.0), &avatar));
        assert!(!obstacle_hits_avatar(&obstacle(50.0, 106.0), &avatar));
    }

    #[test]
    fn test_check_obstacle_hits_order() {
        let avatar = AvatarState { x: 50.0 };
        let obstacles = vec![
            obstacle(50.0, 90.0),
            obstacle(10.0, 90.0),
            obstacle(52.0, 86.0),
        ];
        assert_eq!(check_obstacle_hits(&obstacles, &avatar), vec![0, 2]);
    }
}
