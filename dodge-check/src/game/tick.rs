//! Simulation Engine
//!
//! Frame-driven dodge simulation. An external scheduler calls [`SimulationEngine::tick`]
//! once per animation frame with that frame's timestamp; the engine mutates its
//! state synchronously and reports whether it wants another frame.

use tracing::debug;

use crate::core::hash::StateHash;
use crate::core::rng::DeterministicRng;
use crate::game::collision::check_obstacle_hits;
use crate::game::difficulty::{derive, InvalidConfig, Tuning};
use crate::game::events::SimEvent;
use crate::game::input::PointerInput;
use crate::game::state::{
    Obstacle, PlayfieldGeometry, SessionConfig, SimPhase, SimulationState,
    SPAWN_X_MAX, SPAWN_X_MIN, SPAWN_Y,
};

/// Result of a tick.
#[derive(Debug)]
pub struct TickResult {
    /// Snapshot of the state after this tick
    pub state: SimulationState,
    /// Events generated this tick
    pub events: Vec<SimEvent>,
    /// Whether the scheduler should deliver another frame
    pub request_next_frame: bool,
}

/// The dodge simulation for one session.
pub struct SimulationEngine {
    config: SessionConfig,
    tuning: Tuning,
    playfield: PlayfieldGeometry,
    state: SimulationState,
    rng: DeterministicRng,
    rng_seed: u64,
    /// Timestamp of the first frame after start
    started_at: Option<f64>,
    last_frame: Option<f64>,
    spawn_timer: f64,
    frame: u32,
    next_obstacle_id: u32,
    closed: bool,
}

impl SimulationEngine {
    /// Create an idle engine.
    ///
    /// # Errors
    ///
    /// Fails fast with [`InvalidConfig`] if the config or playfield is malformed.
    pub fn new(
        config: SessionConfig,
        playfield: PlayfieldGeometry,
        rng_seed: u64,
    ) -> Result<Self, InvalidConfig> {
        let tuning = derive(&config, &playfield)?;

        Ok(Self {
            config,
            tuning,
            playfield,
            state: SimulationState::new(),
            rng: DeterministicRng::new(rng_seed),
            rng_seed,
            started_at: None,
            last_frame: None,
            spawn_timer: 0.0,
            frame: 0,
            next_obstacle_id: 0,
            closed: false,
        })
    }

    /// Start the session (the "click to start").
    ///
    /// Returns `false` if the engine was not idle.
    pub fn start(&mut self) -> bool {
        if self.state.phase != SimPhase::Idle {
            return false;
        }

        self.state.phase = SimPhase::Running;
        debug!(
            subject = %self.config.subject_ref,
            seed = %hex::encode(self.rng_seed.to_be_bytes()),
            spawn_interval = self.tuning.spawn_interval,
            obstacle_speed = self.tuning.obstacle_speed,
            "simulation started"
        );
        true
    }

    /// Move the avatar. Ignored unless running.
    pub fn on_pointer_move(&mut self, fractional_x: f64) {
        if !self.state.is_running() {
            return;
        }
        if let Some(x) = PointerInput::new(fractional_x).avatar_x() {
            self.state.avatar.move_to(x);
        }
    }

    /// Run one frame.
    ///
    /// `now` is the frame timestamp in seconds. Frames delivered while idle or
    /// ended leave the state untouched and request nothing further.
    pub fn tick(&mut self, now: f64) -> TickResult {
        let mut events = Vec::new();

        if !self.state.is_running() || !now.is_finite() {
            return self.result(events);
        }

        let started_at = *self.started_at.get_or_insert(now);
        let dt = match self.last_frame {
            Some(last) => (now - last).max(0.0),
            None => 0.0,
        };
        self.last_frame = Some(now);
        self.frame += 1;

        // 1. Elapsed time from the wall clock, robust to dropped frames
        self.state.elapsed_seconds = (now - started_at).max(0.0);

        // 2. Spawn
        self.spawn_timer += dt;
        if self.spawn_timer > self.tuning.spawn_interval {
            self.spawn_obstacle(&mut events);
            self.spawn_timer = 0.0;
        }

        // 3. Fall
        for obstacle in &mut self.state.obstacles {
            obstacle.y += obstacle.speed * dt;
        }

        // 4. Hits
        self.process_hits(&mut events);

        // 5. Cull
        self.cull_obstacles(&mut events);

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(
            frame = self.frame,
            elapsed = self.state.elapsed_seconds,
            obstacles = self.state.obstacles.len(),
            lives = self.state.lives,
            "frame"
        );

        // 6. Schedule
        self.result(events)
    }

    /// The window was closed: stop scheduling frames.
    ///
    /// A closed engine never produces an outcome.
    pub fn close(&mut self) {
        if !self.closed {
            debug!(subject = %self.config.subject_ref, frame = self.frame, "simulation closed");
        }
        self.closed = true;
        self.state.phase = SimPhase::Ended;
    }

    /// No further frames will be processed.
    pub fn is_terminal(&self) -> bool {
        self.state.is_ended()
    }

    /// Ended by losing every life, as opposed to being closed.
    pub fn is_finished(&self) -> bool {
        self.state.is_ended() && !self.closed
    }

    /// Current state.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Config this engine runs.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Frames processed since start.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Hash of the current state.
    pub fn snapshot_hash(&self) -> StateHash {
        self.state.compute_hash()
    }

    fn result(&self, events: Vec<SimEvent>) -> TickResult {
        TickResult {
            state: self.state.clone(),
            events,
            request_next_frame: self.state.is_running(),
        }
    }

    fn spawn_obstacle(&mut self, events: &mut Vec<SimEvent>) {
        let id = self.next_obstacle_id;
        self.next_obstacle_id += 1;

        let x = self.rng.next_range(SPAWN_X_MIN, SPAWN_X_MAX);
        self.state.obstacles.push(Obstacle {
            id,
            x,
            y: SPAWN_Y,
            speed: self.tuning.obstacle_speed,
            width_percent: self.playfield.width_percent(self.tuning.obstacle_size_px),
        });
        events.push(SimEvent::obstacle_spawned(self.frame, id, x));
    }

    fn process_hits(&mut self, events: &mut Vec<SimEvent>) {
        let hits = check_obstacle_hits(&self.state.obstacles, &self.state.avatar);
        if hits.is_empty() {
            return;
        }

        let mut removed = Vec::with_capacity(hits.len());
        for index in hits {
            if self.state.lives == 0 {
                break;
            }

            let obstacle_id = self.state.obstacles[index].id;
            self.state.lives -= 1;
            removed.push(obstacle_id);
            events.push(SimEvent::avatar_hit(self.frame, obstacle_id, self.state.lives));
            debug!(obstacle_id, lives = self.state.lives, "avatar hit");

            if self.state.lives == 0 {
                self.state.phase = SimPhase::Ended;
                events.push(SimEvent::session_ended(self.frame, self.state.elapsed_seconds));
            }
        }

        self.state.obstacles.retain(|o| !removed.contains(&o.id));
    }

    fn cull_obstacles(&mut self, events: &mut Vec<SimEvent>) {
        let frame = self.frame;
        self.state.obstacles.retain(|o| {
            if o.is_off_screen() {
                events.push(SimEvent::obstacle_culled(frame, o.id));
                false
            } else {
                true
            }
        });
    }

    #[cfg(test)]
    pub(crate) fn inject_obstacle(&mut self, x: f64, y: f64) -> u32 {
        let id = self.next_obstacle_id;
        self.next_obstacle_id += 1;
        self.state.obstacles.push(Obstacle {
            id,
            x,
            y,
            speed: self.tuning.obstacle_speed,
            width_percent: self.tuning.obstacle_size_percent,
        });
        id
    }
}

/// Drive an engine at a fixed frame rate until it ends or `max_frames` pass.
///
/// `pointer` is asked for a fractional x before every frame. Returns every
/// event produced.
pub fn run_headless<F>(
    engine: &mut SimulationEngine,
    frame_rate: u32,
    max_frames: u32,
    mut pointer: F,
) -> Vec<SimEvent>
where
    F: FnMut(u32, &SimulationState) -> Option<f64>,
{
    let mut all_events = Vec::new();
    engine.start();

    for n in 0..max_frames {
        if let Some(x) = pointer(n, engine.state()) {
            engine.on_pointer_move(x);
        }

        let result = engine.tick(n as f64 / frame_rate as f64);
        all_events.extend(result.events);

        if !result.request_next_frame {
            break;
        }
    }

    all_events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::SimEventData;
    use crate::game::state::{SubjectRef, AVATAR_MAX_X, AVATAR_MIN_X, MAX_LIVES};
    use rand::Rng;

    fn config() -> SessionConfig {
        SessionConfig::new(SubjectRef::new("actor-1"), 15, 0)
    }

    fn running_engine() -> SimulationEngine {
        let mut engine = SimulationEngine::new(config(), PlayfieldGeometry::default(), 42).unwrap();
        engine.start();
        engine
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let bad = SessionConfig::new(SubjectRef::new("actor-1"), 0, 0);
        assert!(SimulationEngine::new(bad, PlayfieldGeometry::default(), 1).is_err());
    }

    #[test]
    fn test_idle_tick_is_noop() {
        let mut engine = SimulationEngine::new(config(), PlayfieldGeometry::default(), 1).unwrap();
        let result = engine.tick(1.0);
        assert_eq!(result.state.phase, SimPhase::Idle);
        assert!(!result.request_next_frame);
        assert_eq!(engine.frame(), 0);
    }

    #[test]
    fn test_start_only_from_idle() {
        let mut engine = running_engine();
        assert!(engine.state().is_running());
        assert!(!engine.start());
    }

    #[test]
    fn test_first_frame_has_zero_dt() {
        let mut engine = running_engine();
        engine.inject_obstacle(10.0, 20.0);

        let result = engine.tick(100.0);
        assert_eq!(result.state.elapsed_seconds, 0.0);
        assert_eq!(result.state.obstacles[0].y, 20.0);
        assert!(result.request_next_frame);
    }

    #[test]
    fn test_elapsed_from_wall_clock() {
        let mut engine = running_engine();
        engine.tick(10.0);
        engine.tick(10.5);
        // Dropped frames between 10.5 and 12.0
        let result = engine.tick(12.0);
        assert!((result.state.elapsed_seconds - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_spawn_after_interval() {
        let mut engine = running_engine();
        engine.tick(0.0);
        let result = engine.tick(0.5);
        assert!(result.state.obstacles.is_empty());

        // Spawn timer reaches 0.9 > 0.8, then the new obstacle falls for 0.4s
        let result = engine.tick(0.9);
        assert_eq!(result.state.obstacles.len(), 1);
        let obstacle = &result.state.obstacles[0];
        assert!((SPAWN_X_MIN..SPAWN_X_MAX).contains(&obstacle.x));
        assert!((obstacle.y - (SPAWN_Y + 62.5 * 0.4)).abs() < 1e-9);
        assert!(result
            .events
            .iter()
            .any(|e| matches!(e.data, SimEventData::ObstacleSpawned { .. })));

        // Timer was reset: nothing new until another full interval passes
        let result = engine.tick(1.5);
        assert_eq!(result.state.obstacles.len(), 1);
    }

    #[test]
    fn test_hit_decrements_one_life() {
        let mut engine = running_engine();
        engine.on_pointer_move(0.51);
        engine.inject_obstacle(50.0, 90.0);

        let result = engine.tick(0.0);
        assert_eq!(result.state.lives, MAX_LIVES - 1);
        assert!(result.state.obstacles.is_empty());
        assert_eq!(result.events.iter().filter(|e| e.is_hit()).count(), 1);
    }

    #[test]
    fn test_distant_obstacle_does_not_hit() {
        let mut engine = running_engine();
        engine.on_pointer_move(0.51);
        engine.inject_obstacle(60.0, 90.0);

        let result = engine.tick(0.0);
        assert_eq!(result.state.lives, MAX_LIVES);
        assert_eq!(result.state.obstacles.len(), 1);
    }

    #[test]
    fn test_cull_does_not_cost_lives() {
        let mut engine = running_engine();
        let id = engine.inject_obstacle(50.0, 106.0);

        let result = engine.tick(0.0);
        assert_eq!(result.state.lives, MAX_LIVES);
        assert!(result.state.obstacles.is_empty());
        assert!(result
            .events
            .iter()
            .any(|e| e.data == SimEventData::ObstacleCulled { obstacle_id: id }));
    }

    #[test]
    fn test_ends_on_third_hit() {
        let mut engine = running_engine();

        for expected_lives in [2u8, 1] {
            engine.inject_obstacle(50.0, 90.0);
            let result = engine.tick(0.0);
            assert_eq!(result.state.lives, expected_lives);
            assert_eq!(result.state.phase, SimPhase::Running);
            assert!(result.request_next_frame);
        }

        engine.inject_obstacle(50.0, 90.0);
        let result = engine.tick(0.0);
        assert_eq!(result.state.lives, 0);
        assert_eq!(result.state.phase, SimPhase::Ended);
        assert!(!result.request_next_frame);
        assert!(engine.is_terminal());
        assert!(engine.is_finished());
    }

    #[test]
    fn test_simultaneous_hits_stop_at_zero_lives() {
        let mut engine = running_engine();
        for _ in 0..5 {
            engine.inject_obstacle(50.0, 90.0);
        }

        let result = engine.tick(0.0);
        assert_eq!(result.state.lives, 0);
        assert_eq!(result.state.phase, SimPhase::Ended);
        assert_eq!(result.events.iter().filter(|e| e.is_hit()).count(), 3);
        assert_eq!(result.state.obstacles.len(), 2);
    }

    #[test]
    fn test_pointer_ignored_unless_running() {
        let mut engine = SimulationEngine::new(config(), PlayfieldGeometry::default(), 1).unwrap();
        engine.on_pointer_move(0.9);
        assert_eq!(engine.state().avatar.x, 50.0);

        engine.start();
        engine.on_pointer_move(0.9);
        assert_eq!(engine.state().avatar.x, 90.0);

        engine.close();
        engine.on_pointer_move(0.1);
        assert_eq!(engine.state().avatar.x, 90.0);
    }

    #[test]
    fn test_random_pointer_stays_clamped() {
        let mut engine = running_engine();
        let mut rng = rand::thread_rng();

        for n in 0..500 {
            engine.on_pointer_move(rng.gen_range(-2.0..3.0));
            let x = engine.state().avatar.x;
            assert!((AVATAR_MIN_X..=AVATAR_MAX_X).contains(&x));
            engine.tick(n as f64 / 60.0);
        }
    }

    #[test]
    fn test_close_suppresses_frames() {
        let mut engine = running_engine();
        engine.tick(0.0);
        engine.close();

        let frame = engine.frame();
        let result = engine.tick(1.0);
        assert!(!result.request_next_frame);
        assert_eq!(engine.frame(), frame);
        assert!(engine.is_terminal());
        assert!(!engine.is_finished());
    }

    #[test]
    fn test_determinism() {
        let run = || {
            let mut engine =
                SimulationEngine::new(config(), PlayfieldGeometry::default(), 777).unwrap();
            let events = run_headless(&mut engine, 60, 3_000, |n, _| {
                Some(((n % 240) as f64) / 240.0)
            });
            (engine.snapshot_hash(), events.len())
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_headless_session_runs_to_end() {
        let mut engine = SimulationEngine::new(config(), PlayfieldGeometry::default(), 9).unwrap();

        // Standing still in the middle: guards eventually land three hits
        let events = run_headless(&mut engine, 60, 60 * 600, |_, _| None);

        assert!(engine.is_finished());
        assert_eq!(engine.state().lives, 0);
        assert_eq!(events.iter().filter(|e| e.is_hit()).count(), 3);
        let ended: Vec<_> = events
            .iter()
            .filter(|e| matches!(e.data, SimEventData::SessionEnded { .. }))
            .collect();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].frame, engine.frame());
    }
}
