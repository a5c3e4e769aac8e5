//! Run configuration
//!
//! Every tunable constant lives in one immutable value that is built once and
//! handed to the session. Loaded from JSON when a file is supplied, otherwise
//! the defaults below are used.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// What the obstacle director does when its spike roll finds no platform
/// near the spawn point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NoPlatformPolicy {
    /// Spawn nothing this interval
    Skip,
    /// Still spawn the spotlight that would have accompanied the spike
    #[default]
    SpotlightOnly,
}

impl NoPlatformPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoPlatformPolicy::Skip => "Skip",
            NoPlatformPolicy::SpotlightOnly => "SpotlightOnly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "skip" => Some(NoPlatformPolicy::Skip),
            "spotlightonly" | "spotlight_only" | "spotlight" => Some(NoPlatformPolicy::SpotlightOnly),
            _ => None,
        }
    }
}

/// Fixed gameplay constants for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    // === Agent ===
    /// Horizontal speed while a direction is held (px/s)
    pub movement_speed: f32,
    /// Edge length of the agent cube and of spikes (px)
    pub cube_size: f32,
    /// Downward acceleration (px/s²)
    pub gravity: f32,
    /// Vertical velocity applied on jump (px/s, negative is up)
    pub jump_velocity: f32,
    /// Jumps allowed before touching ground again
    pub max_jumps: u32,
    /// Agent spawn x (px)
    pub spawn_x: f32,
    /// Roll added per reference frame while airborne (degrees)
    pub roll_per_frame: f32,

    // === World ===
    /// World floor (px from top)
    pub world_height: f32,
    /// Width of one terrain slot (px)
    pub platform_width: f32,
    /// Collision height of a platform (px)
    pub platform_height: f32,
    /// Lowest platform surface (px from top)
    pub base_platform_y: f32,
    /// How many cubes above base a platform may rise
    pub max_rise_cubes: u32,

    // === Generation ===
    /// Extend terrain once the agent is within this distance of the frontier
    pub generation_trigger_distance: f32,
    /// Slots appended per extension
    pub slots_per_batch: u32,
    /// Probability a slot is left as a gap
    pub gap_chance: f32,
    /// Probability a generated segment carries a spike
    pub spike_chance: f32,
    /// Width the initial terrain must cover (px)
    pub bootstrap_view_width: f32,
    /// Extra slots generated past the initial view
    pub bootstrap_extra_segments: u32,
    /// Leading slots held at base height during bootstrap
    pub bootstrap_flat_segments: u32,

    // === Spikes ===
    pub spike_rise_ms: u64,
    pub spike_active_ms: u64,
    pub spike_retract_ms: u64,
    pub spike_cooldown_ms: u64,

    // === Spotlights ===
    /// Lifetime from spawn to forced removal
    pub spotlight_lifetime_ms: u64,
    /// Horizontal velocity (px/s)
    pub spotlight_speed: f32,
    /// Beam recompute / hit-test period
    pub beam_update_ms: u64,
    /// Edge length of the spotlight body (px)
    pub spotlight_size: f32,
    /// Beam base extends this far left of the apex (px)
    pub beam_spread_left: f32,
    /// Beam base extends this far right of the apex (px)
    pub beam_spread_right: f32,
    /// Beam base sits this far below the apex (px)
    pub beam_depth: f32,

    // === Obstacle director ===
    pub obstacle_interval_ms: u64,
    /// Spawn point distance ahead of the agent (px)
    pub spawn_ahead_distance: f32,
    /// Max distance from spawn point to a platform centre for a spike (px)
    pub platform_search_radius: f32,
    /// Probability of taking the spike branch
    pub spike_branch_chance: f32,
    pub spotlight_min_y: i32,
    pub spotlight_max_y: i32,
    pub no_platform_policy: NoPlatformPolicy,

    // === Cleanup ===
    /// Entities further than this behind the agent are destroyed (px)
    pub despawn_radius: f32,

    // === Camera ===
    /// Agent's distance from the left edge of the view once followed (px)
    pub camera_follow_offset: f32,
    /// Per-frame follow smoothing
    pub camera_lerp: f32,
    pub floor_sensor_width: f32,
    pub floor_sensor_height: f32,

    // === Game over ===
    /// Delay between the blast and the summary (ms)
    pub summary_delay_ms: u64,
    /// Debris fragments thrown by the blast
    pub blast_fragments: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            movement_speed: 200.0,
            cube_size: 32.0,
            gravity: 800.0,
            jump_velocity: -450.0,
            max_jumps: 1,
            spawn_x: 400.0,
            roll_per_frame: 2.5,

            world_height: 600.0,
            platform_width: 64.0,
            platform_height: 32.0,
            base_platform_y: 450.0,
            max_rise_cubes: 4,

            generation_trigger_distance: 600.0,
            slots_per_batch: 3,
            gap_chance: 0.2,
            spike_chance: 0.1,
            bootstrap_view_width: 800.0,
            bootstrap_extra_segments: 10,
            bootstrap_flat_segments: 4,

            spike_rise_ms: 500,
            spike_active_ms: 5000,
            spike_retract_ms: 500,
            spike_cooldown_ms: 2000,

            spotlight_lifetime_ms: 10_000,
            spotlight_speed: -200.0,
            beam_update_ms: 16,
            spotlight_size: 50.0,
            beam_spread_left: 350.0,
            beam_spread_right: 150.0,
            beam_depth: 400.0,

            obstacle_interval_ms: 5000,
            spawn_ahead_distance: 800.0,
            platform_search_radius: 200.0,
            spike_branch_chance: 0.5,
            spotlight_min_y: 100,
            spotlight_max_y: 500,
            no_platform_policy: NoPlatformPolicy::SpotlightOnly,

            despawn_radius: 800.0,

            camera_follow_offset: 200.0,
            camera_lerp: 0.1,
            floor_sensor_width: 4000.0,
            floor_sensor_height: 10.0,

            summary_delay_ms: 500,
            blast_fragments: 12,
        }
    }
}

impl RunConfig {
    /// Highest platform surface allowed (smallest y)
    pub fn min_platform_y(&self) -> f32 {
        self.base_platform_y - self.cube_size * self.max_rise_cubes as f32
    }

    /// Number of slots produced by the bootstrap pass
    pub fn bootstrap_slot_count(&self) -> u32 {
        (self.bootstrap_view_width / self.platform_width).ceil() as u32 + self.bootstrap_extra_segments
    }

    /// Rising-entry to Rising-entry period of a spike
    pub fn spike_cycle_ms(&self) -> u64 {
        self.spike_rise_ms + self.spike_active_ms + self.spike_retract_ms + self.spike_cooldown_ms
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::validated)
    }

    /// Load from a JSON file, falling back to defaults if it is missing or malformed
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded run config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Invalid run config {}: {}; using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read run config {}: {}; using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Replace values the simulation cannot run with by their defaults
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if self.platform_width <= 0.0 {
            log::warn!("platform_width must be positive, got {}", self.platform_width);
            self.platform_width = defaults.platform_width;
        }
        if self.cube_size <= 0.0 {
            log::warn!("cube_size must be positive, got {}", self.cube_size);
            self.cube_size = defaults.cube_size;
        }
        if self.max_jumps == 0 {
            log::warn!("max_jumps must be at least 1");
            self.max_jumps = defaults.max_jumps;
        }
        if self.obstacle_interval_ms == 0 {
            log::warn!("obstacle_interval_ms must be positive");
            self.obstacle_interval_ms = defaults.obstacle_interval_ms;
        }
        if self.beam_update_ms == 0 {
            log::warn!("beam_update_ms must be positive");
            self.beam_update_ms = defaults.beam_update_ms;
        }
        if self.spike_cycle_ms() == 0 {
            log::warn!("spike cycle must have a positive duration");
            self.spike_rise_ms = defaults.spike_rise_ms;
            self.spike_active_ms = defaults.spike_active_ms;
            self.spike_retract_ms = defaults.spike_retract_ms;
            self.spike_cooldown_ms = defaults.spike_cooldown_ms;
        }
        if self.spotlight_min_y > self.spotlight_max_y {
            std::mem::swap(&mut self.spotlight_min_y, &mut self.spotlight_max_y);
        }
        self.gap_chance = self.gap_chance.clamp(0.0, 1.0);
        self.spike_chance = self.spike_chance.clamp(0.0, 1.0);
        self.spike_branch_chance = self.spike_branch_chance.clamp(0.0, 1.0);

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_derived_values() {
        let config = RunConfig::default();
        assert_eq!(config.spike_cycle_ms(), 8000);
        assert_eq!(config.bootstrap_slot_count(), 23);
        assert_eq!(config.min_platform_y(), 450.0 - 128.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = RunConfig::from_json(r#"{ "max_jumps": 2, "no_platform_policy": "Skip" }"#).unwrap();
        assert_eq!(config.max_jumps, 2);
        assert_eq!(config.no_platform_policy, NoPlatformPolicy::Skip);
        assert_eq!(config.platform_width, 64.0);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = RunConfig::from_json(r#"{ "platform_width": 0.0, "max_jumps": 0, "gap_chance": 3.0 }"#).unwrap();
        assert_eq!(config.platform_width, 64.0);
        assert_eq!(config.max_jumps, 1);
        assert_eq!(config.gap_chance, 1.0);
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(RunConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = RunConfig::load(Path::new("/nonexistent/cube-runner.json"));
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(NoPlatformPolicy::from_str("skip"), Some(NoPlatformPolicy::Skip));
        assert_eq!(NoPlatformPolicy::from_str("Spotlight_Only"), Some(NoPlatformPolicy::SpotlightOnly));
        assert_eq!(NoPlatformPolicy::from_str("nope"), None);
        assert_eq!(NoPlatformPolicy::Skip.as_str(), "Skip");
    }
}
