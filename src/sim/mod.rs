//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Timers fire in (time, creation) order
//! - No rendering or platform dependencies

pub mod cleanup;
pub mod collision;
pub mod dice;
pub mod director;
pub mod effects;
pub mod scheduler;
pub mod spike;
pub mod spotlight;
pub mod state;
pub mod terrain;
pub mod tick;

pub use cleanup::{CleanupReport, retire_behind};
pub use collision::{Aabb, Triangle};
pub use dice::{Dice, seeded};
pub use director::{Branch, DirectorPlan, ObstacleDirector, Spawn};
pub use effects::BlastEffect;
pub use scheduler::{Fired, Scheduler, TimerId};
pub use spike::{Spike, SpikeState};
pub use spotlight::Spotlight;
pub use state::{
    Agent, Camera, Command, DeathCause, GameEvent, GameSession, SessionPhase, Summary,
    TimerAction,
};
pub use terrain::{SpikeSite, TerrainExtension, TerrainSegment, WorldGenerator};
pub use tick::{TickInput, tick, trigger_game_over};
