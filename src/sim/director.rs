//! Periodic obstacle spawning
//!
//! Every interval the director picks a point ahead of the agent and decides
//! what to put there. It only plans; the session executes the spawns so new
//! hazards get their timers from the same scheduler.

use super::dice::Dice;
use super::scheduler::{Scheduler, TimerId};
use super::state::TimerAction;
use super::terrain::{SpikeSite, WorldGenerator};
use crate::config::{NoPlatformPolicy, RunConfig};

/// One hazard to create
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Spawn {
    Spike(SpikeSite),
    Spotlight { x: f32, y: f32 },
}

/// Which way the roll went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// Spike on a nearby platform plus a spotlight
    SpikeOnPlatform,
    /// Spike branch with no platform in range; resolved by policy
    NoPlatform(NoPlatformPolicy),
    /// Spotlight only
    Spotlight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectorPlan {
    pub ahead_x: f32,
    pub branch: Branch,
    pub spawns: Vec<Spawn>,
}

#[derive(Debug, Clone, Default)]
pub struct ObstacleDirector {
    timer: Option<TimerId>,
}

impl ObstacleDirector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the repeating spawn timer
    pub fn start(&mut self, scheduler: &mut Scheduler<TimerAction>, config: &RunConfig) {
        if let Some(id) = self.timer.take() {
            scheduler.cancel(id);
        }
        self.timer = Some(scheduler.schedule_repeating(config.obstacle_interval_ms, TimerAction::SpawnObstacle));
    }

    pub fn timer(&self) -> Option<TimerId> {
        self.timer
    }

    pub fn stop(&mut self, scheduler: &mut Scheduler<TimerAction>) {
        if let Some(id) = self.timer.take() {
            scheduler.cancel(id);
        }
    }

    /// Decide this interval's spawns
    pub fn plan(
        &self,
        agent_x: f32,
        terrain: &WorldGenerator,
        dice: &mut impl Dice,
        config: &RunConfig,
    ) -> DirectorPlan {
        let ahead_x = agent_x + config.spawn_ahead_distance;
        let mut spawns = Vec::new();

        let branch = if dice.chance(config.spike_branch_chance) {
            match terrain.segment_near(ahead_x, config.platform_search_radius) {
                Some(segment) => {
                    spawns.push(Spawn::Spike(SpikeSite::on(segment, config.cube_size)));
                    spawns.push(spotlight_at(ahead_x, dice, config));
                    Branch::SpikeOnPlatform
                }
                None => {
                    if config.no_platform_policy == NoPlatformPolicy::SpotlightOnly {
                        spawns.push(spotlight_at(ahead_x, dice, config));
                    }
                    Branch::NoPlatform(config.no_platform_policy)
                }
            }
        } else {
            spawns.push(spotlight_at(ahead_x, dice, config));
            Branch::Spotlight
        };

        DirectorPlan {
            ahead_x,
            branch,
            spawns,
        }
    }
}

fn spotlight_at(x: f32, dice: &mut impl Dice, config: &RunConfig) -> Spawn {
    let y = dice.int_between(config.spotlight_min_y, config.spotlight_max_y) as f32;
    Spawn::Spotlight { x, y }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::dice::ScriptedDice;

    fn terrain_with(xs: &[f32], config: &RunConfig) -> WorldGenerator {
        let mut terrain = WorldGenerator::new();
        for &x in xs {
            terrain.place_segment(x, 450.0, config);
        }
        terrain
    }

    #[test]
    fn test_spike_branch_with_platform() {
        let config = RunConfig::default();
        let terrain = terrain_with(&[1100.0, 1164.0], &config);
        let mut dice = ScriptedDice::fixed(true, 300);

        let plan = ObstacleDirector::new().plan(400.0, &terrain, &mut dice, &config);
        assert_eq!(plan.ahead_x, 1200.0);
        assert_eq!(plan.branch, Branch::SpikeOnPlatform);
        assert_eq!(
            plan.spawns,
            vec![
                Spawn::Spike(SpikeSite {
                    anchor_x: 1196.0,
                    surface_y: 434.0
                }),
                Spawn::Spotlight { x: 1200.0, y: 300.0 },
            ]
        );
    }

    #[test]
    fn test_spotlight_branch() {
        let config = RunConfig::default();
        let terrain = terrain_with(&[1164.0], &config);
        let mut dice = ScriptedDice::fixed(false, 450);

        let plan = ObstacleDirector::new().plan(400.0, &terrain, &mut dice, &config);
        assert_eq!(plan.branch, Branch::Spotlight);
        assert_eq!(plan.spawns, vec![Spawn::Spotlight { x: 1200.0, y: 450.0 }]);
    }

    #[test]
    fn test_no_platform_spotlight_only() {
        let config = RunConfig::default();
        let terrain = terrain_with(&[0.0], &config);
        let mut dice = ScriptedDice::fixed(true, 100);

        let plan = ObstacleDirector::new().plan(400.0, &terrain, &mut dice, &config);
        assert_eq!(plan.branch, Branch::NoPlatform(NoPlatformPolicy::SpotlightOnly));
        assert_eq!(plan.spawns, vec![Spawn::Spotlight { x: 1200.0, y: 100.0 }]);
    }

    #[test]
    fn test_no_platform_skip() {
        let config = RunConfig {
            no_platform_policy: NoPlatformPolicy::Skip,
            ..RunConfig::default()
        };
        let terrain = terrain_with(&[0.0], &config);
        let mut dice = ScriptedDice::fixed(true, 100);

        let plan = ObstacleDirector::new().plan(400.0, &terrain, &mut dice, &config);
        assert_eq!(plan.branch, Branch::NoPlatform(NoPlatformPolicy::Skip));
        assert!(plan.spawns.is_empty());
    }

    #[test]
    fn test_spotlight_height_clamped_to_range() {
        let config = RunConfig::default();
        let terrain = WorldGenerator::new();
        let mut dice = ScriptedDice::fixed(false, 9000);
        let plan = ObstacleDirector::new().plan(0.0, &terrain, &mut dice, &config);
        assert_eq!(plan.spawns, vec![Spawn::Spotlight { x: 800.0, y: 500.0 }]);
    }

    #[test]
    fn test_start_registers_single_repeating_timer() {
        let config = RunConfig::default();
        let mut scheduler = Scheduler::new();
        let mut director = ObstacleDirector::new();
        director.start(&mut scheduler, &config);
        director.start(&mut scheduler, &config);
        assert_eq!(scheduler.len(), 1);

        let fired = scheduler.pop_due(5000).unwrap();
        assert_eq!(fired.action, TimerAction::SpawnObstacle);
        assert_eq!(fired.fire_at, 5000);

        director.stop(&mut scheduler);
        assert!(scheduler.is_empty());
    }
}
