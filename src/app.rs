//! App: terminal init, main loop, tick and key handling.

use crate::GameConfig;
use crate::game::Simulation;
use crate::input::{Action, key_to_action};
use crate::piece::RandomShapes;
use crate::theme::Theme;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    /// Grid size clamped to the terminal so board + border fit on screen.
    grid_width: u16,
    grid_height: u16,
    sim: Simulation,
    screen: Screen,
    paused: bool,
    last_tick: Instant,
    /// TachyonFX fade over the board once the game is over.
    game_over_effect: Option<Effect>,
    /// Last time the game-over effect was processed (for delta).
    game_over_effect_time: Option<Instant>,
}

fn new_simulation(config: &GameConfig, theme: &Theme, width: u16, height: u16) -> Simulation {
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Simulation::new(
        width as usize,
        height as usize,
        theme.shapes(),
        Box::new(RandomShapes::new(rng)),
    )
}

/// Ticks owed after a stall beyond this many are dropped.
const MAX_CATCH_UP_TICKS: u32 = 64;

/// Ticks due at `now`. Advances `last_tick` by whole intervals so the rate holds
/// independently of the frame rate.
fn ticks_due(last_tick: &mut Instant, interval: Duration, now: Instant) -> u32 {
    let mut due = 0;
    while now.saturating_duration_since(*last_tick) >= interval {
        *last_tick += interval;
        due += 1;
        if due == MAX_CATCH_UP_TICKS {
            *last_tick = now;
            break;
        }
    }
    due
}

/// Requested grid size, shrunk to what fits the terminal next to the sidebar.
fn fit_grid(config: &GameConfig, term_cols: u16, term_rows: u16) -> (u16, u16) {
    let (fit_w, fit_h) = crate::ui::max_grid_for_terminal(term_cols, term_rows);
    let width = config.width.min(fit_w).max(crate::ui::MIN_GRID_SIZE);
    let height = config.height.min(fit_h).max(crate::ui::MIN_GRID_SIZE);
    (width, height)
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let (width, height) = (config.width, config.height);
        let sim = new_simulation(&config, &theme, width, height);
        Self {
            config,
            theme,
            grid_width: width,
            grid_height: height,
            sim,
            screen: Screen::Playing,
            paused: false,
            last_tick: Instant::now(),
            game_over_effect: None,
            game_over_effect_time: None,
        }
    }

    fn reset_game(&mut self) {
        self.sim = new_simulation(&self.config, &self.theme, self.grid_width, self.grid_height);
        self.screen = Screen::Playing;
        self.paused = false;
        self.last_tick = Instant::now();
        self.game_over_effect = None;
        self.game_over_effect_time = None;
        info!(width = self.grid_width, height = self.grid_height, "game restarted");
    }

    /// Returns true when the app should exit.
    fn handle_action(&mut self, action: Action) -> bool {
        match (self.screen, action) {
            (_, Action::Quit) => return true,
            (Screen::Playing, Action::Pause) => {
                self.paused = !self.paused;
                debug!(paused = self.paused, "pause toggled");
            }
            (Screen::Playing, Action::Move(command)) if !self.paused => {
                self.sim.apply(command);
            }
            (Screen::GameOver, Action::Restart) => self.reset_game(),
            _ => {}
        }
        false
    }

    fn tick(&mut self) {
        self.sim.tick();
        if self.sim.is_game_over() {
            self.screen = Screen::GameOver;
            info!(
                ticks = self.sim.tick_count(),
                particles = self.sim.particles().len(),
                "game over"
            );
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::PopKeyboardEnhancementFlags,
            execute,
            terminal::{LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let result = self.run_in_terminal();

        // Restore even when setup failed part way.
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        let left = execute!(std::io::stdout(), LeaveAlternateScreen);
        let raw = disable_raw_mode();
        result?;
        left?;
        raw?;
        Ok(())
    }

    /// Alternate screen, terminal, grid fitting and the main loop. Raw mode is already on.
    fn run_in_terminal(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, size},
        };

        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Release events let us ignore them; terminals without the protocol only send presses.
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let (term_cols, term_rows) = size()?;
        let (width, height) = fit_grid(&self.config, term_cols, term_rows);
        if (width, height) != (self.grid_width, self.grid_height) {
            info!(
                requested_width = self.config.width,
                requested_height = self.config.height,
                width,
                height,
                "grid clamped to terminal"
            );
            self.grid_width = width;
            self.grid_height = height;
            self.reset_game();
        }

        self.run_loop(&mut terminal)
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let tick_interval = Duration::from_secs_f64(1.0 / self.config.tick_rate);
        let frame_interval = Duration::from_secs_f64(1.0 / self.config.frame_rate);
        self.last_tick = Instant::now();
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    &self.sim,
                    &self.theme,
                    self.screen,
                    self.paused,
                    &mut self.game_over_effect,
                    &mut self.game_over_effect_time,
                    self.config.no_animation,
                    now,
                );
            })?;

            // Input phase: every press is one attempted move, applied before the next tick.
            let timeout = frame_interval.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else {
                        continue;
                    };
                    if key.kind == KeyEventKind::Press && self.handle_action(key_to_action(key)) {
                        info!("quit requested");
                        return Ok(());
                    }
                }
            }

            let now = Instant::now();
            if self.screen == Screen::Playing && !self.paused {
                for _ in 0..ticks_due(&mut self.last_tick, tick_interval, now) {
                    self.tick();
                    if self.screen != Screen::Playing {
                        break;
                    }
                }
            } else {
                self.last_tick = now;
            }
        }
    }
}
