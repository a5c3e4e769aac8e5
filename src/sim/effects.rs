//! Death blast effect
//!
//! Purely cosmetic: a short particle burst plus debris fragments that spin
//! and fade. Nothing here collides with anything.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::dice::Dice;

/// Burst particles are emitted for this long
pub const EMIT_DURATION_MS: u64 = 200;
/// One particle per this many ms while emitting
pub const EMIT_INTERVAL_MS: u64 = 20;
pub const PARTICLE_LIFE_MS: u64 = 800;
pub const PARTICLE_GRAVITY: f32 = 300.0;
pub const MAX_PARTICLES: usize = 40;
/// Fragments fade out over this long once their fade starts
pub const FRAGMENT_FADE_MS: u64 = 300;

/// A burst particle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub age_ms: u64,
    /// 0.5 at birth shrinking to 0
    pub scale: f32,
}

/// A debris square
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    /// Current rotation (degrees)
    pub angle: f32,
    pub target_angle: f32,
    pub spin_ms: u64,
    pub fade_delay_ms: u64,
    pub alpha: f32,
}

impl Fragment {
    pub fn is_gone(&self, age_ms: u64) -> bool {
        age_ms >= self.fade_delay_ms + FRAGMENT_FADE_MS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlastEffect {
    pub origin: Vec2,
    pub color: u32,
    pub age_ms: u64,
    pub particles: Vec<Particle>,
    pub fragments: Vec<Fragment>,
    emitted: usize,
}

impl BlastEffect {
    pub fn new(origin: Vec2, color: u32, fragment_count: u32, dice: &mut impl Dice) -> Self {
        let fragments = (0..fragment_count)
            .map(|_| Fragment {
                pos: origin + Vec2::new(dice.float_between(-5.0, 5.0), dice.float_between(-5.0, 5.0)),
                vel: Vec2::new(dice.float_between(-200.0, 200.0), dice.float_between(-300.0, -100.0)),
                size: Vec2::new(dice.float_between(5.0, 10.0), dice.float_between(5.0, 10.0)),
                angle: 0.0,
                target_angle: dice.float_between(-360.0, 360.0),
                spin_ms: dice.int_between(800, 1500) as u64,
                fade_delay_ms: dice.int_between(300, 600) as u64,
                alpha: 1.0,
            })
            .collect();

        Self {
            origin,
            color,
            age_ms: 0,
            particles: Vec::with_capacity(MAX_PARTICLES),
            fragments,
            emitted: 0,
        }
    }

    /// Advance the effect. Positions only move when `moving` is set (the
    /// physics substrate is frozen right after the blast starts); spin and
    /// fade always run.
    pub fn update(&mut self, dt_ms: u64, moving: bool, dice: &mut impl Dice) {
        self.age_ms += dt_ms;
        let dt = dt_ms as f32 / 1000.0;

        // Emit on a fixed cadence for the first 200 ms
        let due = (self.age_ms.min(EMIT_DURATION_MS) / EMIT_INTERVAL_MS) as usize;
        while self.emitted < due.min(MAX_PARTICLES) {
            let angle = dice.float_between(0.0, 360.0).to_radians();
            let speed = dice.float_between(100.0, 200.0);
            self.particles.push(Particle {
                pos: self.origin,
                vel: Vec2::new(angle.cos(), angle.sin()) * speed,
                age_ms: 0,
                scale: 0.5,
            });
            self.emitted += 1;
        }

        for particle in &mut self.particles {
            particle.age_ms += dt_ms;
            if moving {
                particle.vel.y += PARTICLE_GRAVITY * dt;
                particle.pos += particle.vel * dt;
            }
            let life = 1.0 - particle.age_ms as f32 / PARTICLE_LIFE_MS as f32;
            particle.scale = 0.5 * life.max(0.0);
        }
        self.particles.retain(|p| p.age_ms < PARTICLE_LIFE_MS);

        let age = self.age_ms;
        for fragment in &mut self.fragments {
            if moving {
                fragment.pos += fragment.vel * dt;
            }
            // Power1 ease-out toward the target angle
            let t = (age as f32 / fragment.spin_ms.max(1) as f32).min(1.0);
            let eased = 1.0 - (1.0 - t) * (1.0 - t);
            fragment.angle = fragment.target_angle * eased;

            let fade_t = age.saturating_sub(fragment.fade_delay_ms) as f32 / FRAGMENT_FADE_MS as f32;
            fragment.alpha = (1.0 - fade_t).clamp(0.0, 1.0);
        }
        self.fragments.retain(|f| !f.is_gone(age));
    }

    /// Everything has faded and emission is over
    pub fn is_finished(&self) -> bool {
        self.age_ms >= EMIT_DURATION_MS && self.particles.is_empty() && self.fragments.is_empty()
    }
}
