//! Fixed timestep simulation tick
//!
//! Advances one [`GameSession`] deterministically: agent motion, terrain
//! upkeep, hazard checks, then every timer that came due during the step.

use glam::Vec2;
use rand::Rng;

use super::cleanup;
use super::director::Spawn;
use super::effects::BlastEffect;
use super::scheduler::Fired;
use super::state::{
    Agent, Command, DeathCause, GameEvent, GameSession, SessionPhase, Summary, TimerAction,
};
use super::terrain::TerrainSegment;
use crate::config::RunConfig;
use crate::consts::FRAME_MS;

/// Input for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Move left (held)
    pub left: bool,
    /// Move right (held)
    pub right: bool,
    /// Jump (edge: set only on the tick the button went down)
    pub jump_pressed: bool,
}

/// Advance the session by `dt_ms`
pub fn tick(session: &mut GameSession, input: &TickInput, dt_ms: u64) {
    process_commands(session);

    let input = if session.input_enabled {
        *input
    } else {
        TickInput::default()
    };

    session.time_ms += dt_ms;
    session.tick_count += 1;

    if session.is_running() && !session.substrate_frozen {
        step_world(session, &input, dt_ms);
    }

    let moving = !session.substrate_frozen;
    if let Some(blast) = session.blast.as_mut() {
        blast.update(dt_ms, moving, &mut session.rng);
        if blast.is_finished() {
            session.blast = None;
        }
    }

    run_timers(session);
}

fn process_commands(session: &mut GameSession) {
    while let Some(command) = session.commands.pop_front() {
        match command {
            Command::Restart if session.summary.is_some() => {
                restart(session);
                return;
            }
            Command::Restart => log::debug!("Restart ignored until the summary is shown"),
        }
    }
}

/// Replace the whole run with a fresh one seeded from the session RNG
fn restart(session: &mut GameSession) {
    let seed: u64 = session.rng.random();
    let mut events = std::mem::take(&mut session.events);
    events.push(GameEvent::Restarted { seed });

    let mut fresh = GameSession::new(session.config.clone(), seed);
    events.append(&mut fresh.events);
    fresh.events = events;

    log::info!("Restarting (previous score {}, new seed {})", session.score, seed);
    *session = fresh;
}

fn step_world(session: &mut GameSession, input: &TickInput, dt_ms: u64) {
    step_agent(
        &mut session.agent,
        session.terrain.segments(),
        input,
        dt_ms,
        &session.config,
    );
    session.camera.follow(session.agent.pos.x, &session.config);
    session.update_distance();

    let report = session
        .terrain
        .extend_if_needed(session.agent.pos.x, &mut session.rng, &session.config);
    if !report.is_empty() {
        for site in &report.spike_sites {
            session.spawn_spike(*site, session.time_ms);
        }
        session.events.push(GameEvent::TerrainExtended {
            segments: report.segments_added,
            gaps: report.gaps,
        });
    }

    let retired = cleanup::retire_behind(
        session.agent.pos.x,
        session.config.despawn_radius,
        &mut session.terrain,
        &mut session.spikes,
        &mut session.spotlights,
        &mut session.scheduler,
    );
    if retired.total() > 0 {
        session.events.push(GameEvent::EntitiesRetired {
            count: retired.total(),
        });
    }

    let dt = dt_ms as f32 / 1000.0;
    for light in &mut session.spotlights {
        light.step(dt);
    }

    session.update_hiding();

    if let Some(cause) = lethal_contact(session) {
        let now = session.time_ms;
        trigger_game_over(session, cause, now);
    }
}

/// Move the agent from input and gravity, then push it out of any segment
/// it ended up inside, one axis at a time.
fn step_agent(
    agent: &mut Agent,
    segments: &[TerrainSegment],
    input: &TickInput,
    dt_ms: u64,
    config: &RunConfig,
) {
    let dt = dt_ms as f32 / 1000.0;
    let half = agent.size / 2.0;

    agent.vel.x = match (input.left, input.right) {
        (true, false) => -config.movement_speed,
        (false, true) => config.movement_speed,
        _ => 0.0,
    };
    if input.jump_pressed {
        agent.try_jump(config.jump_velocity);
    }
    agent.vel.y += config.gravity * dt;

    // Horizontal
    agent.pos.x += agent.vel.x * dt;
    for segment in segments {
        let solid = segment.bounds();
        if !agent.bounds().intersects(&solid) {
            continue;
        }
        if agent.vel.x > 0.0 {
            agent.pos.x = solid.min.x - half;
        } else if agent.vel.x < 0.0 {
            agent.pos.x = solid.max.x + half;
        }
    }
    agent.pos.x = agent.pos.x.max(half);

    // Vertical
    agent.grounded = false;
    agent.pos.y += agent.vel.y * dt;
    for segment in segments {
        let solid = segment.bounds();
        if !agent.bounds().intersects(&solid) {
            continue;
        }
        if agent.vel.y > 0.0 {
            agent.pos.y = solid.min.y - half;
            agent.land();
        } else if agent.vel.y < 0.0 {
            agent.pos.y = solid.max.y + half;
            agent.vel.y = 0.0;
        }
    }
    if agent.pos.y + half > config.world_height {
        agent.pos.y = config.world_height - half;
        agent.vel.y = 0.0;
    }

    if !agent.grounded {
        agent.roll_angle += config.roll_per_frame * dt_ms as f32 / FRAME_MS;
    }
}

/// Hazards checked every tick (spotlights are checked on their own timer)
fn lethal_contact(session: &GameSession) -> Option<DeathCause> {
    let bounds = session.agent.bounds();
    let now = session.time_ms;

    if session
        .spikes
        .iter()
        .any(|s| s.is_lethal() && s.bounds(now).intersects(&bounds))
    {
        return Some(DeathCause::Spike);
    }
    if session.camera.floor_sensor(&session.config).intersects(&bounds) {
        return Some(DeathCause::Floor);
    }
    None
}

/// Fire every timer due by now, one at a time
fn run_timers(session: &mut GameSession) {
    while let Some(fired) = session.scheduler.pop_due(session.time_ms) {
        dispatch(session, fired);
    }
    session.scheduler.advance_to(session.time_ms);
}

fn dispatch(session: &mut GameSession, fired: Fired<TimerAction>) {
    if fired.action == TimerAction::ShowSummary {
        show_summary(session);
        return;
    }
    if !session.is_running() {
        return;
    }

    match fired.action {
        TimerAction::SpawnObstacle => spawn_obstacles(session, fired.fire_at),
        TimerAction::SpikeBoundary(id) => {
            if let Some(spike) = session.spikes.iter_mut().find(|s| s.id == id) {
                spike.advance(&fired, &mut session.scheduler);
            }
        }
        TimerAction::SpotlightBeam(id) => {
            let (point, hiding) = (session.agent.pos, session.is_hiding);
            let caught = session
                .spotlights
                .iter_mut()
                .find(|l| l.id == id)
                .is_some_and(|light| light.sweep(point, hiding));
            if caught {
                trigger_game_over(session, DeathCause::Spotlight, fired.fire_at);
            }
        }
        TimerAction::SpotlightExpire(id) => expire_spotlight(session, id),
        TimerAction::ShowSummary => {}
    }
}

fn spawn_obstacles(session: &mut GameSession, at: u64) {
    let plan = session.director.plan(
        session.agent.pos.x,
        &session.terrain,
        &mut session.rng,
        &session.config,
    );
    log::debug!("Director at x={}: {:?}", plan.ahead_x, plan.branch);

    for spawn in plan.spawns {
        match spawn {
            Spawn::Spike(site) => {
                session.spawn_spike(site, at);
            }
            Spawn::Spotlight { x, y } => {
                session.spawn_spotlight(x, y, at);
            }
        }
    }
}

fn expire_spotlight(session: &mut GameSession, id: u32) {
    let Some(idx) = session.spotlights.iter().position(|l| l.id == id) else {
        return;
    };
    let mut light = session.spotlights.remove(idx);
    light.cancel_timers(&mut session.scheduler);
    session.events.push(GameEvent::SpotlightExpired { id });
    log::debug!("Spotlight {} expired", id);
}

/// Enter the terminal state. Only the first call has any effect.
pub fn trigger_game_over(session: &mut GameSession, cause: DeathCause, at: u64) {
    if !session.is_running() {
        return;
    }
    session.phase = SessionPhase::GameOver;

    let origin = session.agent.pos;
    let tint = session.agent.tint;
    session.blast = Some(BlastEffect::new(
        origin,
        tint,
        session.config.blast_fragments,
        &mut session.rng,
    ));
    session.agent.visible = false;
    session.agent.vel = Vec2::ZERO;

    for spike in &mut session.spikes {
        spike.cancel(&mut session.scheduler);
    }
    for light in &mut session.spotlights {
        light.cancel_timers(&mut session.scheduler);
    }
    session.director.stop(&mut session.scheduler);
    let dropped = session.scheduler.cancel_all();

    session.substrate_frozen = true;
    session.input_enabled = false;
    session
        .scheduler
        .schedule_once_at(at + session.config.summary_delay_ms, TimerAction::ShowSummary);

    session.events.push(GameEvent::GameOver {
        final_score: session.score,
        cause,
    });
    log::info!(
        "Game over ({:?}) at {} ms: score {}, distance {}, {} timers dropped",
        cause,
        at,
        session.score,
        session.distance_label(),
        dropped
    );
}

fn show_summary(session: &mut GameSession) {
    let summary = Summary {
        final_score: session.score,
        distance_meters: session.distance_meters,
    };
    session.summary = Some(summary);
    session.events.push(GameEvent::SummaryShown {
        final_score: summary.final_score,
    });
    log::info!("Summary: score {} ({})", summary.final_score, session.distance_label());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT_MS;
    use crate::sim::spike::SpikeState;
    use crate::sim::terrain::{SpikeSite, WorldGenerator};

    /// Session with no random hazards, no director and hand-placed terrain.
    /// A far segment pins the frontier so nothing new is generated.
    fn quiet_session(segment_xs: &[f32], agent_pos: Vec2) -> GameSession {
        let config = RunConfig {
            spike_chance: 0.0,
            gap_chance: 0.0,
            ..RunConfig::default()
        };
        let mut session = GameSession::new(config, 7);
        session.director.stop(&mut session.scheduler);

        let mut terrain = WorldGenerator::new();
        for &x in segment_xs {
            terrain.place_segment(x, 450.0, &session.config);
        }
        terrain.place_segment(100_000.0, 450.0, &session.config);
        session.terrain = terrain;

        session.agent.pos = agent_pos;
        session.drain_events();
        session
    }

    fn floor_xs(count: usize) -> Vec<f32> {
        (0..count).map(|i| i as f32 * 64.0).collect()
    }

    fn run(session: &mut GameSession, input: TickInput, ticks: usize) {
        for _ in 0..ticks {
            tick(session, &input, SIM_DT_MS);
        }
    }

    fn game_over_cause(events: &[GameEvent]) -> Option<DeathCause> {
        events.iter().find_map(|e| match e {
            GameEvent::GameOver { cause, .. } => Some(*cause),
            _ => None,
        })
    }

    #[test]
    fn test_distance_and_score_at_x_250() {
        let config = RunConfig {
            spawn_x: 250.0,
            ..RunConfig::default()
        };
        let mut session = GameSession::new(config, 3);
        assert_eq!(session.distance_meters, 2.5);
        assert_eq!(session.score, 5);

        tick(&mut session, &TickInput::default(), SIM_DT_MS);
        assert_eq!(session.agent.pos.x, 250.0);
        assert_eq!(session.score, 5);
    }

    #[test]
    fn test_standing_agent_stays_grounded() {
        let mut session = quiet_session(&floor_xs(20), Vec2::new(400.0, 434.0));
        run(&mut session, TickInput::default(), 30);
        assert_eq!(session.agent.pos.y, 434.0);
        assert!(session.agent.grounded);
        assert_eq!(session.agent.roll_angle, 0.0);
    }

    #[test]
    fn test_distance_never_decreases() {
        let mut session = quiet_session(&floor_xs(40), Vec2::new(400.0, 434.0));
        let right = TickInput {
            right: true,
            ..Default::default()
        };
        let left = TickInput {
            left: true,
            ..Default::default()
        };

        let mut last = session.distance_meters;
        for input in std::iter::repeat_n(right, 60).chain(std::iter::repeat_n(left, 60)) {
            tick(&mut session, &input, SIM_DT_MS);
            assert!(session.distance_meters >= last);
            assert_eq!(session.score, (session.distance_meters * 2.0).floor() as u64);
            last = session.distance_meters;
        }
        assert!(session.agent.pos.x < 400.0 + 192.0);
        assert!(session.is_running());
    }

    #[test]
    fn test_wall_blocks_and_jump_climbs() {
        let config = RunConfig::default();
        let mut session = quiet_session(&[], Vec2::new(400.0, 434.0));
        let mut terrain = WorldGenerator::new();
        for i in 0..8 {
            terrain.place_segment(i as f32 * 64.0, 450.0, &config);
        }
        for i in 0..10 {
            terrain.place_segment(512.0 + i as f32 * 64.0, 418.0, &config);
        }
        terrain.place_segment(100_000.0, 450.0, &config);
        session.terrain = terrain;

        let right = TickInput {
            right: true,
            ..Default::default()
        };
        run(&mut session, right, 60);
        // Pressed against the step
        assert_eq!(session.agent.pos.x, 512.0 - 16.0);

        let jump = TickInput {
            right: true,
            jump_pressed: true,
            ..Default::default()
        };
        tick(&mut session, &jump, SIM_DT_MS);
        assert!(!session.agent.grounded);
        assert!(session.agent.roll_angle > 0.0);
        assert_eq!(session.agent.jump_count, 1);

        // A second press mid-air is refused with one jump allowed
        tick(&mut session, &jump, SIM_DT_MS);
        assert_eq!(session.agent.jump_count, 1);

        run(&mut session, right, 80);
        assert!(session.agent.grounded);
        assert_eq!(session.agent.pos.y, 418.0 - 16.0);
        assert!(session.agent.pos.x > 512.0);
        assert_eq!(session.agent.roll_angle, 0.0);
    }

    #[test]
    fn test_hiding_blocks_beam() {
        let mut session = quiet_session(&[960.0], Vec2::new(992.0, 434.0));
        session.spawn_spotlight(992.0, 200.0, session.time_ms);

        run(&mut session, TickInput::default(), 10);
        assert!(session.is_hiding);
        assert!(session.spotlights[0].beam.contains_point(session.agent.pos));
        assert!(session.is_running());
    }

    #[test]
    fn test_beam_kills_when_not_hiding() {
        let mut session = quiet_session(&[], Vec2::new(992.0, 300.0));
        session.spawn_spotlight(992.0, 200.0, session.time_ms);

        tick(&mut session, &TickInput::default(), SIM_DT_MS);
        assert!(!session.is_hiding);
        assert_eq!(session.phase, SessionPhase::GameOver);
        assert_eq!(game_over_cause(&session.drain_events()), Some(DeathCause::Spotlight));
    }

    #[test]
    fn test_spike_kills_only_once_active() {
        let mut session = quiet_session(&[960.0, 1024.0], Vec2::new(1030.0, 434.0));
        let site = SpikeSite::on(&session.terrain.segments()[1], session.config.cube_size);
        assert_eq!(site.anchor_x, 1056.0);
        session.spawn_spike(site, session.time_ms);

        run(&mut session, TickInput::default(), 25);
        assert_eq!(session.time_ms, 400);
        assert_eq!(session.spikes[0].state, SpikeState::Rising);
        assert!(session.is_running());

        run(&mut session, TickInput::default(), 10);
        // Standing on a platform counts as hiding; spikes kill regardless
        assert!(session.is_hiding);
        assert_eq!(session.phase, SessionPhase::GameOver);
        assert_eq!(game_over_cause(&session.drain_events()), Some(DeathCause::Spike));
        assert_eq!(session.spikes[0].state, SpikeState::Active);
    }

    #[test]
    fn test_spotlight_expires_at_lifetime() {
        let mut session = quiet_session(&floor_xs(20), Vec2::new(400.0, 434.0));
        let id = session.spawn_spotlight(5000.0, 100.0, session.time_ms);
        let beam_timer = session.spotlights[0].beam_timer().unwrap();

        run(&mut session, TickInput::default(), 624);
        assert_eq!(session.time_ms, 9984);
        assert_eq!(session.spotlights.len(), 1);

        tick(&mut session, &TickInput::default(), SIM_DT_MS);
        assert_eq!(session.time_ms, 10_000);
        assert!(session.spotlights.is_empty());
        assert!(!session.scheduler.is_pending(beam_timer));
        assert!(session.scheduler.is_empty());
        assert!(session.drain_events().contains(&GameEvent::SpotlightExpired { id }));
    }

    #[test]
    fn test_falling_into_floor_sensor() {
        let mut session = quiet_session(&[], Vec2::new(400.0, 300.0));
        run(&mut session, TickInput::default(), 200);
        assert_eq!(session.phase, SessionPhase::GameOver);
        assert_eq!(game_over_cause(&session.drain_events()), Some(DeathCause::Floor));
    }

    #[test]
    fn test_game_over_is_terminal() {
        let mut session = quiet_session(&floor_xs(20), Vec2::new(400.0, 434.0));
        session.director.start(&mut session.scheduler, &session.config);
        session.spawn_spike(
            SpikeSite {
                anchor_x: 700.0,
                surface_y: 434.0,
            },
            0,
        );
        session.spawn_spotlight(1500.0, 150.0, 0);
        run(&mut session, TickInput::default(), 40);
        assert!(session.is_running());

        let now = session.time_ms;
        trigger_game_over(&mut session, DeathCause::Floor, now);
        assert!(!session.agent.visible);
        assert!(session.substrate_frozen);
        assert!(!session.input_enabled);
        assert!(session.director.timer().is_none());
        assert!(session.spikes.iter().all(|s| s.is_cancelled()));
        // Only the summary timer survives
        assert_eq!(session.scheduler.len(), 1);

        let score = session.score;
        let distance = session.distance_meters;
        let pos = session.agent.pos;
        let spike_state = session.spikes[0].state;
        let light_pos = session.spotlights[0].pos;
        let segments = session.terrain.segments().len();
        session.drain_events();

        let mash = TickInput {
            right: true,
            jump_pressed: true,
            ..Default::default()
        };
        // Long enough for several director intervals and a full spike cycle
        run(&mut session, mash, 1000);

        assert_eq!(session.score, score);
        assert_eq!(session.distance_meters, distance);
        assert_eq!(session.agent.pos, pos);
        assert_eq!(session.spikes.len(), 1);
        assert_eq!(session.spikes[0].state, spike_state);
        assert_eq!(session.spotlights[0].pos, light_pos);
        assert_eq!(session.terrain.segments().len(), segments);
        assert!(session.scheduler.is_empty());

        let events = session.drain_events();
        assert_eq!(events, vec![GameEvent::SummaryShown { final_score: score }]);
    }

    #[test]
    fn test_game_over_only_once() {
        let mut session = quiet_session(&floor_xs(20), Vec2::new(400.0, 434.0));
        trigger_game_over(&mut session, DeathCause::Spike, 0);
        trigger_game_over(&mut session, DeathCause::Spotlight, 0);

        let events = session.drain_events();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::GameOver { .. }))
                .count(),
            1
        );
        assert_eq!(game_over_cause(&events), Some(DeathCause::Spike));
        assert_eq!(session.scheduler.len(), 1);
    }

    #[test]
    fn test_summary_after_delay() {
        let mut session = quiet_session(&floor_xs(20), Vec2::new(400.0, 434.0));
        let now = session.time_ms;
        trigger_game_over(&mut session, DeathCause::Floor, now);
        let final_score = session.score;

        run(&mut session, TickInput::default(), 31);
        assert_eq!(session.time_ms, 496);
        assert!(session.summary.is_none());

        tick(&mut session, &TickInput::default(), SIM_DT_MS);
        let summary = session.summary.unwrap();
        assert_eq!(summary.final_score, final_score);
        assert!(
            session
                .drain_events()
                .contains(&GameEvent::SummaryShown { final_score })
        );
    }

    #[test]
    fn test_blast_frozen_after_game_over() {
        let mut session = quiet_session(&floor_xs(20), Vec2::new(400.0, 434.0));
        trigger_game_over(&mut session, DeathCause::Spike, 0);

        let blast = session.blast.as_ref().unwrap();
        assert_eq!(blast.fragments.len(), 12);
        assert_eq!(blast.origin, Vec2::new(400.0, 434.0));
        let start: Vec<Vec2> = blast.fragments.iter().map(|f| f.pos).collect();

        run(&mut session, TickInput::default(), 5);
        let blast = session.blast.as_ref().unwrap();
        for (fragment, p) in blast.fragments.iter().zip(start) {
            assert_eq!(fragment.pos, p);
        }

        // Everything fades out eventually
        run(&mut session, TickInput::default(), 200);
        assert!(session.blast.is_none());
    }

    #[test]
    fn test_restart_needs_summary() {
        let mut session = GameSession::new(RunConfig::default(), 5);
        let now = session.time_ms;
        trigger_game_over(&mut session, DeathCause::Floor, now);

        session.submit(Command::Restart);
        tick(&mut session, &TickInput::default(), SIM_DT_MS);
        assert_eq!(session.phase, SessionPhase::GameOver);

        run(&mut session, TickInput::default(), 40);
        assert!(session.summary.is_some());
        session.drain_events();

        session.submit(Command::Restart);
        tick(&mut session, &TickInput::default(), SIM_DT_MS);

        assert!(session.is_running());
        assert!(session.summary.is_none());
        assert!(session.blast.is_none());
        assert!(session.input_enabled);
        assert!(!session.substrate_frozen);
        assert!(session.agent.visible);
        assert!(session.spotlights.is_empty());
        assert!(session.director.timer().is_some());
        assert_eq!(session.time_ms, SIM_DT_MS);
        assert_eq!(session.score, 8);

        let events = session.drain_events();
        let seed = session.seed;
        assert!(events.contains(&GameEvent::Restarted { seed }));
        assert!(events.contains(&GameEvent::SessionStarted { seed }));
    }

    #[test]
    fn test_terrain_extends_and_retires_during_tick() {
        let mut session = quiet_session(&[], Vec2::new(3400.0, 434.0));
        let mut terrain = WorldGenerator::new();
        for x in floor_xs(60) {
            terrain.place_segment(x, 450.0, &session.config);
        }
        session.terrain = terrain;
        let frontier = session.terrain.frontier_x().unwrap();

        tick(&mut session, &TickInput::default(), SIM_DT_MS);

        assert_eq!(session.terrain.frontier_x(), Some(frontier + 3.0 * 64.0));
        let events = session.drain_events();
        assert!(events.contains(&GameEvent::TerrainExtended {
            segments: 3,
            gaps: 0
        }));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, GameEvent::EntitiesRetired { count } if *count > 0))
        );
        let limit = session.agent.pos.x - session.config.despawn_radius;
        assert!(
            session
                .terrain
                .segments()
                .iter()
                .all(|s| s.center_x() >= limit)
        );
    }

    #[test]
    fn test_director_spawns_on_interval() {
        let mut session = quiet_session(&floor_xs(40), Vec2::new(400.0, 434.0));
        session.director.start(&mut session.scheduler, &session.config);

        run(&mut session, TickInput::default(), 312);
        assert!(session.spotlights.is_empty());

        tick(&mut session, &TickInput::default(), SIM_DT_MS);
        assert_eq!(session.time_ms, 5008);
        assert!(!session.spotlights.is_empty());
        // Spawned on the interval boundary, not the tick that noticed it
        assert_eq!(session.spotlights[0].spawned_at, 5000);
        assert_eq!(session.spotlights[0].expires_at(), 15_000);
    }

    #[test]
    fn test_fresh_sessions_start_on_solid_ground() {
        for seed in 0..100 {
            let mut session = GameSession::new(RunConfig::default(), seed);
            run(&mut session, TickInput::default(), 150);
            assert!(session.is_running(), "seed {seed} died standing still");
            assert!(session.agent.grounded);
            assert_eq!(session.tick_count, 150);
        }
    }

    #[test]
    fn test_disabled_input_is_ignored() {
        let mut session = quiet_session(&floor_xs(20), Vec2::new(400.0, 434.0));
        session.input_enabled = false;
        let right = TickInput {
            right: true,
            ..Default::default()
        };
        run(&mut session, right, 10);
        assert_eq!(session.agent.pos.x, 400.0);
    }
}
