//! Cube Runner entry point
//!
//! Headless runner: plays a few runs with a simple autopilot on the fixed
//! timestep loop and logs what happens. Rendering and input are supplied by
//! a host; this binary stands in for both.
//!
//! Usage: `cube-runner [seed] [config.json]`

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::Path;
    use std::time::{SystemTime, UNIX_EPOCH};

    use cube_runner::RunConfig;
    use cube_runner::consts::{MAX_SUBSTEPS, SIM_DT_MS};
    use cube_runner::sim::{Command, GameEvent, GameSession, SpikeState, TickInput, tick};

    /// Presentation frame length the host would run at (~30 Hz)
    const HOST_FRAME_MS: u64 = 33;
    /// Runs to play before exiting
    const RUNS: u32 = 3;
    /// Give up on a run that survives this long (simulated ms)
    const MAX_RUN_MS: u64 = 5 * 60 * 1000;

    struct Runner {
        session: GameSession,
        accumulator_ms: u64,
        input: TickInput,
        scores: Vec<u64>,
    }

    impl Runner {
        fn new(config: RunConfig, seed: u64) -> Self {
            Self {
                session: GameSession::new(config, seed),
                accumulator_ms: 0,
                input: TickInput::default(),
                scores: Vec::new(),
            }
        }

        /// Run simulation ticks for one presentation frame
        fn update(&mut self, frame_ms: u64) {
            self.accumulator_ms += frame_ms.min(100);

            let mut substeps = 0;
            while self.accumulator_ms >= SIM_DT_MS && substeps < MAX_SUBSTEPS {
                tick(&mut self.session, &self.input, SIM_DT_MS);
                self.accumulator_ms -= SIM_DT_MS;
                substeps += 1;

                // Jump is edge-triggered
                self.input.jump_pressed = false;
            }
        }

        /// Log events and restart once the summary is up.
        /// Returns false when every run is done.
        fn handle_events(&mut self) -> bool {
            for event in self.session.drain_events() {
                match event {
                    GameEvent::SessionStarted { seed } => {
                        log::info!("Run {} started with seed {}", self.scores.len() + 1, seed)
                    }
                    GameEvent::GameOver { final_score, cause } => {
                        log::info!(
                            "Run {} over after {} ticks: {:?} at {} (score {})",
                            self.scores.len() + 1,
                            self.session.tick_count,
                            cause,
                            self.session.distance_label(),
                            final_score
                        )
                    }
                    GameEvent::SummaryShown { final_score } => {
                        self.scores.push(final_score);
                        if self.scores.len() as u32 >= RUNS {
                            return false;
                        }
                        self.session.submit(Command::Restart);
                    }
                    other => log::debug!("{:?}", other),
                }
            }
            true
        }
    }

    /// Hold right; jump at walls, gaps and raised spikes just ahead
    fn autopilot(session: &GameSession) -> TickInput {
        let agent = &session.agent;
        let config = &session.config;
        let front = agent.pos.x + agent.size / 2.0;

        let here = session.terrain.segment_at(agent.pos.x);
        let next = session.terrain.segment_at(front + config.platform_width / 2.0);
        let obstacle = match (here, next) {
            (Some(here), Some(next)) => next.y < here.y,
            (Some(_), None) => true,
            _ => false,
        };
        let spike_ahead = session.spikes.iter().any(|s| {
            let dx = s.anchor_x - front;
            let raised = !matches!(s.state, SpikeState::Dormant | SpikeState::Cooldown);
            raised && (0.0..96.0).contains(&dx)
        });

        TickInput {
            left: false,
            right: true,
            jump_pressed: agent.grounded && (obstacle || spike_ahead),
        }
    }

    pub fn run() {
        let mut args = std::env::args().skip(1);
        let seed = args.next().and_then(|s| s.parse::<u64>().ok()).unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0)
        });
        let config = match args.next() {
            Some(path) => RunConfig::load(Path::new(&path)),
            None => RunConfig::default(),
        };

        log::info!("Cube Runner (headless) starting with seed {}", seed);
        let mut runner = Runner::new(config, seed);

        loop {
            if runner.session.is_running() {
                if runner.session.time_ms > MAX_RUN_MS {
                    log::warn!("Run survived {} ms, stopping", MAX_RUN_MS);
                    break;
                }
                runner.input = autopilot(&runner.session);
            }
            runner.update(HOST_FRAME_MS);
            if !runner.handle_events() {
                break;
            }
        }

        log::info!("Scores: {:?}", runner.scores);
        if let Some(best) = runner.scores.iter().max() {
            println!("Best score: {}", best);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    headless::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation is driven by the host on wasm; nothing to run here
}
