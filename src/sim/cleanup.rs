//! Despawning of entities left behind the agent
//!
//! Anything further than the despawn radius behind the agent is destroyed.
//! Hazards own timers, so they are collected by id first and then removed one
//! by one with their timers cancelled.

use super::scheduler::Scheduler;
use super::spike::Spike;
use super::spotlight::Spotlight;
use super::state::TimerAction;
use super::terrain::WorldGenerator;

/// What one cleanup pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub spikes: usize,
    pub spotlights: usize,
    pub extensions: usize,
    pub segments: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.spikes + self.spotlights + self.extensions + self.segments
    }
}

/// Remove every entity whose x is left of `agent_x - despawn_radius`
pub fn retire_behind(
    agent_x: f32,
    despawn_radius: f32,
    terrain: &mut WorldGenerator,
    spikes: &mut Vec<Spike>,
    spotlights: &mut Vec<Spotlight>,
    scheduler: &mut Scheduler<TimerAction>,
) -> CleanupReport {
    let limit_x = agent_x - despawn_radius;

    let stale_spikes: Vec<u32> = spikes
        .iter()
        .filter(|s| s.anchor_x < limit_x)
        .map(|s| s.id)
        .collect();
    for id in &stale_spikes {
        if let Some(idx) = spikes.iter().position(|s| s.id == *id) {
            let mut spike = spikes.remove(idx);
            spike.cancel(scheduler);
        }
    }

    let stale_lights: Vec<u32> = spotlights
        .iter()
        .filter(|l| l.pos.x < limit_x)
        .map(|l| l.id)
        .collect();
    for id in &stale_lights {
        if let Some(idx) = spotlights.iter().position(|l| l.id == *id) {
            let mut light = spotlights.remove(idx);
            light.cancel_timers(scheduler);
        }
    }

    let report = CleanupReport {
        spikes: stale_spikes.len(),
        spotlights: stale_lights.len(),
        extensions: terrain.retire_extensions_before(limit_x),
        segments: terrain.retire_segments_before(limit_x),
    };

    if report.total() > 0 {
        log::debug!("Retired behind x={}: {:?}", limit_x, report);
    }
    report
}
