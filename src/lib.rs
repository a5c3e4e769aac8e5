//! Cube Runner - simulation core for an endless side-scrolling runner
//!
//! Core modules:
//! - `sim`: Deterministic simulation (terrain, hazards, timers, game session)
//! - `config`: Immutable run configuration

pub mod config;
pub mod sim;

pub use config::{NoPlatformPolicy, RunConfig};

/// Simulation timing constants
pub mod consts {
    /// Fixed simulation timestep in milliseconds (~60 Hz)
    pub const SIM_DT_MS: u64 = 16;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Reference frame length used to scale per-frame rates (roll speed)
    pub const FRAME_MS: f32 = 16.0;
}

/// Round to one decimal place (the precision distance is reported with)
#[inline]
pub fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Linear interpolation between `a` and `b` for `t` in [0, 1]
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}
