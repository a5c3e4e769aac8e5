//! Sweeping spotlight hazard
//!
//! A spotlight drifts left at constant speed, unaffected by gravity, and
//! projects a triangular beam below it. A repeating timer recomputes the beam
//! and hit-tests the agent; a one-shot timer removes the spotlight after its
//! lifetime no matter where it is.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Triangle;
use super::scheduler::{Scheduler, TimerId};
use super::state::TimerAction;
use crate::config::RunConfig;

/// Beam shape relative to the spotlight centre
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamGeometry {
    pub spread_left: f32,
    pub spread_right: f32,
    pub depth: f32,
}

impl BeamGeometry {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            spread_left: config.beam_spread_left,
            spread_right: config.beam_spread_right,
            depth: config.beam_depth,
        }
    }

    /// Beam triangle with its apex at `apex`, widening downward
    pub fn beam_at(&self, apex: Vec2) -> Triangle {
        Triangle::new(
            apex,
            Vec2::new(apex.x - self.spread_left, apex.y + self.depth),
            Vec2::new(apex.x + self.spread_right, apex.y + self.depth),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spotlight {
    pub id: u32,
    pub pos: Vec2,
    pub vel_x: f32,
    pub size: f32,
    pub beam: Triangle,
    pub spawned_at: u64,
    pub lifetime_ms: u64,
    geometry: BeamGeometry,
    #[serde(skip)]
    beam_timer: Option<TimerId>,
    #[serde(skip)]
    expiry_timer: Option<TimerId>,
}

impl Spotlight {
    /// Create a spotlight at `(x, y)` and arm its beam and expiry timers
    pub fn spawn(
        id: u32,
        x: f32,
        y: f32,
        now: u64,
        config: &RunConfig,
        scheduler: &mut Scheduler<TimerAction>,
    ) -> Self {
        let geometry = BeamGeometry::from_config(config);
        let pos = Vec2::new(x, y);
        let beam_timer = scheduler.schedule_repeating(config.beam_update_ms, TimerAction::SpotlightBeam(id));
        let expiry_timer = scheduler.schedule_once_at(
            now + config.spotlight_lifetime_ms,
            TimerAction::SpotlightExpire(id),
        );

        Self {
            id,
            pos,
            vel_x: config.spotlight_speed,
            size: config.spotlight_size,
            beam: geometry.beam_at(pos),
            spawned_at: now,
            lifetime_ms: config.spotlight_lifetime_ms,
            geometry,
            beam_timer: Some(beam_timer),
            expiry_timer: Some(expiry_timer),
        }
    }

    pub fn expires_at(&self) -> u64 {
        self.spawned_at + self.lifetime_ms
    }

    pub fn beam_timer(&self) -> Option<TimerId> {
        self.beam_timer
    }

    pub fn expiry_timer(&self) -> Option<TimerId> {
        self.expiry_timer
    }

    /// Advance position by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        self.pos.x += self.vel_x * dt;
    }

    /// Recompute the beam from the current position
    pub fn update_beam(&mut self) {
        self.beam = self.geometry.beam_at(self.pos);
    }

    /// Recompute the beam and report whether it catches `point`.
    /// Hiding always protects.
    pub fn sweep(&mut self, point: Vec2, is_hiding: bool) -> bool {
        self.update_beam();
        !is_hiding && self.beam.contains_point(point)
    }

    /// Remove every timer this spotlight owns
    pub fn cancel_timers(&mut self, scheduler: &mut Scheduler<TimerAction>) {
        if let Some(id) = self.beam_timer.take() {
            scheduler.cancel(id);
        }
        if let Some(id) = self.expiry_timer.take() {
            scheduler.cancel(id);
        }
    }
}
