//! Sandfall: falling tetrominoes that crumble into sand, in the terminal.

mod app;
mod game;
mod grid;
mod input;
mod piece;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Options derived from CLI that shape the simulation and the main loop.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub width: u16,
    pub height: u16,
    pub tick_rate: f64,
    pub frame_rate: f64,
    pub seed: Option<u64>,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::never(&log_dir, "sandfall.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // The terminal belongs to the UI, so logs only go to the file.
    let default_filter = if args.debug {
        "debug,sandfall=debug"
    } else {
        "warn,sandfall=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let theme = theme::Theme::load(args.theme.as_deref())
        .with_context(|| format!("loading theme {:?}", args.theme))?;
    let config = GameConfig {
        width: args.width,
        height: args.height,
        tick_rate: args.tick_rate,
        frame_rate: args.frame_rate,
        seed: args.seed,
        no_animation: args.no_animation,
    };
    info!(log_path = %log_dir.display(), ?config, "sandfall starting");

    let mut app = App::new(config, theme);
    app.run()?;
    info!("sandfall exiting");
    Ok(())
}

/// `$XDG_STATE_HOME/sandfall`, else `~/.local/state/sandfall`, else the temp dir.
fn log_dir() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".local/state"))
        })
        .unwrap_or_else(std::env::temp_dir)
        .join("sandfall")
}

fn grid_size_parser() -> clap::builder::RangedI64ValueParser<u16> {
    clap::value_parser!(u16).range(i64::from(ui::MIN_GRID_SIZE)..=i64::from(ui::MAX_GRID_SIZE))
}

fn positive_rate(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        Ok(_) => Err("rate must be a positive number".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Falling-sand tetromino game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "sandfall",
    version,
    about = "Falling tetrominoes that crumble into sand when they land.",
    long_about = "Sandfall drops tetrominoes into a grid. When a piece can fall no further it \
        breaks into single grains of sand that slide down and diagonally until they come to rest. \
        The game ends when a new piece has no room to spawn.\n\n\
        CONTROLS:\n  Left/h  Move left    Right/l  Move right    Down/j  Soft drop\n  \
        P       Pause        R        Restart (game over)    Q / Esc  Quit\n\n\
        Use --theme to load a btop-style theme file (theme[key]=\"#RRGGBB\")."
)]
pub struct Args {
    /// Grid width in columns.
    #[arg(long, default_value = "40", value_name = "COLS", value_parser = grid_size_parser())]
    pub width: u16,

    /// Grid height in rows.
    #[arg(long, default_value = "30", value_name = "ROWS", value_parser = grid_size_parser())]
    pub height: u16,

    /// Simulation ticks per second.
    #[arg(long, default_value = "30.0", value_name = "RATE", value_parser = positive_rate)]
    pub tick_rate: f64,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE", value_parser = positive_rate)]
    pub frame_rate: f64,

    /// Seed for the piece sequence (random when not set).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]="value").
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Disable the game-over fade.
    #[arg(long)]
    pub no_animation: bool,

    /// Verbose logging to the log file.
    #[arg(long)]
    pub debug: bool,
}
