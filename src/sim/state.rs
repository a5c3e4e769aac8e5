//! Game session state and core simulation types
//!
//! One [`GameSession`] owns everything for a run: the agent, terrain, hazards,
//! the timer queue and the derived score. The tick and the terminal sequence
//! live in `tick.rs`.

use std::collections::VecDeque;

use glam::Vec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use super::dice::seeded;
use super::director::ObstacleDirector;
use super::effects::BlastEffect;
use super::scheduler::Scheduler;
use super::spike::Spike;
use super::spotlight::Spotlight;
use super::terrain::{SpikeSite, WorldGenerator};
use crate::config::RunConfig;
use crate::round_tenths;

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Active gameplay
    Running,
    /// Run ended; waiting for the summary and a restart
    GameOver,
}

/// What ended the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Spike,
    Spotlight,
    Floor,
}

/// Payload attached to scheduler timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Obstacle director interval
    SpawnObstacle,
    /// Spike phase boundary (spike id)
    SpikeBoundary(u32),
    /// Spotlight beam recompute and hit-test (spotlight id)
    SpotlightBeam(u32),
    /// Spotlight lifetime ran out (spotlight id)
    SpotlightExpire(u32),
    /// Present the end-of-run summary
    ShowSummary,
}

/// Requests from the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start a fresh run once the summary is showing
    Restart,
}

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    SessionStarted { seed: u64 },
    TerrainExtended { segments: u32, gaps: u32 },
    SpikeSpawned { id: u32, x: f32 },
    SpotlightSpawned { id: u32, x: f32, y: f32 },
    SpotlightExpired { id: u32 },
    EntitiesRetired { count: usize },
    GameOver { final_score: u64, cause: DeathCause },
    SummaryShown { final_score: u64 },
    Restarted { seed: u64 },
}

/// End-of-run summary shown after the blast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub final_score: u64,
    pub distance_meters: f64,
}

/// The player cube
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Centre
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub jump_count: u32,
    pub max_jumps: u32,
    /// Visual roll while airborne (degrees)
    pub roll_angle: f32,
    pub grounded: bool,
    pub visible: bool,
    pub tint: u32,
}

impl Agent {
    pub fn new(pos: Vec2, config: &RunConfig) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            size: config.cube_size,
            jump_count: 0,
            max_jumps: config.max_jumps,
            roll_angle: 0.0,
            grounded: false,
            visible: true,
            tint: 0xffffff,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.pos, Vec2::splat(self.size))
    }

    /// Jump if any jumps are left
    pub fn try_jump(&mut self, jump_velocity: f32) -> bool {
        if self.jump_count >= self.max_jumps {
            return false;
        }
        self.vel.y = jump_velocity;
        self.jump_count += 1;
        self.grounded = false;
        true
    }

    /// Touched down on a surface
    pub fn land(&mut self) {
        self.vel.y = 0.0;
        self.grounded = true;
        self.jump_count = 0;
        self.roll_angle = 0.0;
    }
}

/// Horizontal follow camera
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Camera {
    pub scroll_x: f32,
}

impl Camera {
    /// Camera already centred on its follow target
    pub fn looking_at(target_x: f32, config: &RunConfig) -> Self {
        Self {
            scroll_x: (target_x - config.camera_follow_offset).max(0.0),
        }
    }

    /// Ease toward keeping `target_x` at the follow offset
    pub fn follow(&mut self, target_x: f32, config: &RunConfig) {
        let desired = (target_x - config.camera_follow_offset).max(0.0);
        self.scroll_x += (desired - self.scroll_x) * config.camera_lerp;
    }

    /// Kill zone along the bottom of the view
    pub fn floor_sensor(&self, config: &RunConfig) -> Aabb {
        Aabb::from_top_left(
            self.scroll_x,
            config.world_height - config.floor_sensor_height,
            config.floor_sensor_width,
            config.floor_sensor_height,
        )
    }
}

/// Distance in meters for an x position, to one decimal
pub fn distance_for(x: f32) -> f64 {
    round_tenths(x as f64 / 100.0)
}

/// Score for a distance
pub fn score_for(distance_meters: f64) -> u64 {
    (distance_meters * 2.0).floor().max(0.0) as u64
}

/// Complete state of one run
#[derive(Debug, Clone)]
pub struct GameSession {
    pub config: RunConfig,
    /// Run seed for reproducibility
    pub seed: u64,
    pub phase: SessionPhase,
    /// Simulation clock (ms)
    pub time_ms: u64,
    pub tick_count: u64,
    pub agent: Agent,
    pub terrain: WorldGenerator,
    pub spikes: Vec<Spike>,
    pub spotlights: Vec<Spotlight>,
    pub scheduler: Scheduler<TimerAction>,
    pub director: ObstacleDirector,
    pub camera: Camera,
    /// Furthest distance reached (m, one decimal)
    pub distance_meters: f64,
    pub score: u64,
    pub is_hiding: bool,
    pub input_enabled: bool,
    /// Physics/collision substrate paused
    pub substrate_frozen: bool,
    pub blast: Option<BlastEffect>,
    pub summary: Option<Summary>,
    pub(crate) rng: Pcg32,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) commands: VecDeque<Command>,
    next_id: u32,
}

impl GameSession {
    /// Start a run: seed terrain, place the agent, arm the director
    pub fn new(config: RunConfig, seed: u64) -> Self {
        let config = config.validated();
        let mut rng = seeded(seed);

        let mut terrain = WorldGenerator::new();
        terrain.seed(&mut rng, &config);

        let spawn_y = terrain
            .segment_at(config.spawn_x)
            .or_else(|| terrain.segments().first())
            .map(|s| s.y)
            .unwrap_or(config.base_platform_y)
            - config.cube_size / 2.0;
        let agent = Agent::new(Vec2::new(config.spawn_x, spawn_y), &config);
        let camera = Camera::looking_at(agent.pos.x, &config);

        let mut scheduler = Scheduler::new();
        let mut director = ObstacleDirector::new();
        director.start(&mut scheduler, &config);

        let distance_meters = distance_for(agent.pos.x);
        log::info!(
            "Session started (seed {}): {} segments, agent at ({}, {})",
            seed,
            terrain.segments().len(),
            agent.pos.x,
            agent.pos.y
        );

        Self {
            config,
            seed,
            phase: SessionPhase::Running,
            time_ms: 0,
            tick_count: 0,
            agent,
            terrain,
            spikes: Vec::new(),
            spotlights: Vec::new(),
            scheduler,
            director,
            camera,
            distance_meters,
            score: score_for(distance_meters),
            is_hiding: false,
            input_enabled: true,
            substrate_frozen: false,
            blast: None,
            summary: None,
            rng,
            events: vec![GameEvent::SessionStarted { seed }],
            commands: VecDeque::new(),
            next_id: 1,
        }
    }

    /// Allocate a new hazard ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    /// Distance formatted for display, e.g. "12.5m"
    pub fn distance_label(&self) -> String {
        format!("{:.1}m", self.distance_meters)
    }

    /// Queue a command for the next tick
    pub fn submit(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    /// Take all events emitted since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Create a spike at `site` and start its cycle at `at`
    pub fn spawn_spike(&mut self, site: SpikeSite, at: u64) -> u32 {
        let id = self.next_entity_id();
        let mut spike = Spike::new(id, site, &self.config);
        spike.start(at, &mut self.scheduler);
        self.spikes.push(spike);
        self.events.push(GameEvent::SpikeSpawned { id, x: site.anchor_x });
        log::debug!("Spike {} spawned at x={}", id, site.anchor_x);
        id
    }

    /// Create a spotlight at `(x, y)` with its beam and expiry timers.
    /// The beam cadence starts from the scheduler clock.
    pub fn spawn_spotlight(&mut self, x: f32, y: f32, at: u64) -> u32 {
        let id = self.next_entity_id();
        let light = Spotlight::spawn(id, x, y, at, &self.config, &mut self.scheduler);
        self.spotlights.push(light);
        self.events.push(GameEvent::SpotlightSpawned { id, x, y });
        log::debug!("Spotlight {} spawned at ({}, {})", id, x, y);
        id
    }

    /// Recompute distance and score from the agent position.
    /// Distance only ever grows while running.
    pub fn update_distance(&mut self) {
        if !self.is_running() {
            return;
        }
        self.distance_meters = self.distance_meters.max(distance_for(self.agent.pos.x));
        self.score = score_for(self.distance_meters);
    }

    /// Broad-phase check of the agent against every segment (touching counts)
    pub fn update_hiding(&mut self) {
        let bounds = self.agent.bounds();
        self.is_hiding = self.terrain.segments().iter().any(|s| bounds.touches(&s.bounds()));
    }
}
