//! Retractable spike hazard
//!
//! Each spike runs its own cycle: Rising -> Active -> Retracting -> Cooldown
//! -> Rising. Every boundary is a one-shot timer chained from the exact fire
//! time of the previous one, so the period never drifts with frame timing.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use super::scheduler::{Fired, Scheduler, TimerId};
use super::state::TimerAction;
use super::terrain::SpikeSite;
use crate::config::RunConfig;
use crate::lerp;

/// Spike cycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpikeState {
    /// Below the surface, waiting to be started
    Dormant,
    /// Emerging toward the surface
    Rising,
    /// Fully out; the only lethal state
    Active,
    /// Sinking back below the surface
    Retracting,
    /// Hidden pause before rising again
    Cooldown,
}

impl SpikeState {
    pub fn next(self) -> Self {
        match self {
            SpikeState::Dormant => SpikeState::Rising,
            SpikeState::Rising => SpikeState::Active,
            SpikeState::Active => SpikeState::Retracting,
            SpikeState::Retracting => SpikeState::Cooldown,
            SpikeState::Cooldown => SpikeState::Rising,
        }
    }

    pub fn is_lethal(self) -> bool {
        self == SpikeState::Active
    }
}

/// Phase durations copied from the run config at spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpikeTimings {
    pub rise_ms: u64,
    pub active_ms: u64,
    pub retract_ms: u64,
    pub cooldown_ms: u64,
}

impl SpikeTimings {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            rise_ms: config.spike_rise_ms,
            active_ms: config.spike_active_ms,
            retract_ms: config.spike_retract_ms,
            cooldown_ms: config.spike_cooldown_ms,
        }
    }

    /// How long `state` lasts; Dormant has no timeout
    pub fn duration(&self, state: SpikeState) -> Option<u64> {
        match state {
            SpikeState::Dormant => None,
            SpikeState::Rising => Some(self.rise_ms),
            SpikeState::Active => Some(self.active_ms),
            SpikeState::Retracting => Some(self.retract_ms),
            SpikeState::Cooldown => Some(self.cooldown_ms),
        }
    }
}

/// A spike and its cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spike {
    pub id: u32,
    pub anchor_x: f32,
    /// Centre y when fully risen
    pub surface_y: f32,
    pub size: f32,
    pub state: SpikeState,
    pub state_entered_at: u64,
    timings: SpikeTimings,
    #[serde(skip)]
    pending: Option<TimerId>,
    cancelled: bool,
}

impl Spike {
    pub fn new(id: u32, site: SpikeSite, config: &RunConfig) -> Self {
        Self {
            id,
            anchor_x: site.anchor_x,
            surface_y: site.surface_y,
            size: config.cube_size,
            state: SpikeState::Dormant,
            state_entered_at: 0,
            timings: SpikeTimings::from_config(config),
            pending: None,
            cancelled: false,
        }
    }

    /// Centre y while fully retracted
    #[inline]
    pub fn hidden_y(&self) -> f32 {
        self.surface_y + self.size
    }

    pub fn is_lethal(&self) -> bool {
        self.state.is_lethal()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Boundary timer currently armed, if any
    pub fn pending_timer(&self) -> Option<TimerId> {
        self.pending
    }

    /// Leave Dormant and begin the cycle at `now`
    pub fn start(&mut self, now: u64, scheduler: &mut Scheduler<TimerAction>) {
        if self.cancelled || self.state != SpikeState::Dormant {
            return;
        }
        self.enter(SpikeState::Rising, now, scheduler);
    }

    /// Handle a boundary timer. Returns false for fires that no longer belong
    /// to this spike (cancelled machine or superseded timer).
    pub fn advance(&mut self, fired: &Fired<TimerAction>, scheduler: &mut Scheduler<TimerAction>) -> bool {
        if self.cancelled || self.pending != Some(fired.id) {
            return false;
        }
        self.pending = None;
        self.enter(self.state.next(), fired.fire_at, scheduler);
        true
    }

    fn enter(&mut self, state: SpikeState, at: u64, scheduler: &mut Scheduler<TimerAction>) {
        self.state = state;
        self.state_entered_at = at;
        self.pending = self
            .timings
            .duration(state)
            .map(|d| scheduler.schedule_once_at(at + d, TimerAction::SpikeBoundary(self.id)));
    }

    /// Stop the cycle for good, removing the armed boundary timer
    pub fn cancel(&mut self, scheduler: &mut Scheduler<TimerAction>) {
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
        self.cancelled = true;
    }

    /// Centre y at `now`, interpolated while rising or retracting
    pub fn center_y(&self, now: u64) -> f32 {
        let elapsed = now.saturating_sub(self.state_entered_at) as f32;
        match self.state {
            SpikeState::Dormant | SpikeState::Cooldown => self.hidden_y(),
            SpikeState::Active => self.surface_y,
            SpikeState::Rising => {
                let t = elapsed / self.timings.rise_ms.max(1) as f32;
                lerp(self.hidden_y(), self.surface_y, t)
            }
            SpikeState::Retracting => {
                let t = elapsed / self.timings.retract_ms.max(1) as f32;
                lerp(self.surface_y, self.hidden_y(), t)
            }
        }
    }

    pub fn bounds(&self, now: u64) -> Aabb {
        Aabb::from_center(Vec2::new(self.anchor_x, self.center_y(now)), Vec2::splat(self.size))
    }
}
