//! Simulation: grid, falling piece, sand particles, tick ordering.

use crate::grid::{Cell, Grid, ParticleId};
use crate::piece::{Piece, ShapeSet, ShapeSource, TetrominoKind};
use ratatui::style::Color;
use tracing::{debug, info};

/// One grain of sand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Particle {
    pub col: usize,
    pub row: usize,
    pub color: Color,
    /// Terminal: a settled particle is never moved again.
    pub settled: bool,
}

impl Particle {
    pub fn new(col: usize, row: usize, color: Color) -> Self {
        Self {
            col,
            row,
            color,
            settled: false,
        }
    }

    /// Straight down, else down-left, else down-right, else settle.
    /// The particle's own cell must already be cleared in `grid`.
    fn settle_step(&mut self, grid: &Grid) {
        let (col, row) = (self.col as i32, self.row as i32);
        let below = row + 1;
        if grid.is_free(col, below) {
            self.row += 1;
        } else if grid.is_free(col - 1, below) {
            self.col -= 1;
            self.row += 1;
        } else if grid.is_free(col + 1, below) {
            self.col += 1;
            self.row += 1;
        } else {
            self.settled = true;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    Running,
    GameOver,
}

/// Discrete player intent; each one is a single attempted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveLeft,
    MoveRight,
    SoftDrop,
}

impl Command {
    fn delta(self) -> (i32, i32) {
        match self {
            Self::MoveLeft => (-1, 0),
            Self::MoveRight => (1, 0),
            Self::SoftDrop => (0, 1),
        }
    }
}

/// Owns all game state. The renderer borrows it read-only between ticks.
#[derive(Debug)]
pub struct Simulation {
    grid: Grid,
    piece: Piece,
    particles: Vec<Particle>,
    state: SimState,
    shapes: ShapeSet,
    source: Box<dyn ShapeSource>,
    tick_count: u64,
}

impl Simulation {
    /// Empty grid and a first piece from `source`.
    pub fn new(width: usize, height: usize, shapes: ShapeSet, mut source: Box<dyn ShapeSource>) -> Self {
        let kind = source.next_kind();
        let piece = Piece::spawn(shapes.get(kind), width);
        let mut sim = Self {
            grid: Grid::new(width, height),
            piece,
            particles: Vec::new(),
            state: SimState::Running,
            shapes,
            source,
            tick_count: 0,
        };
        sim.check_spawn();
        sim
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn piece(&self) -> &Piece {
        &self.piece
    }

    #[inline]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[inline]
    pub fn state(&self) -> SimState {
        self.state
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.state == SimState::GameOver
    }

    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn settled_count(&self) -> usize {
        self.particles.iter().filter(|p| p.settled).count()
    }

    /// Colour of the particle in an occupied cell.
    pub fn particle_color(&self, col: usize, row: usize) -> Option<Color> {
        self.grid
            .cell_at(col, row)
            .particle()
            .map(|id| self.particles[id].color)
    }

    /// Move the piece by the delta. Refused (false) after game over.
    pub fn try_move_piece(&mut self, dcol: i32, drow: i32) -> bool {
        if self.is_game_over() {
            return false;
        }
        self.piece.try_move(dcol, drow, &self.grid)
    }

    pub fn apply(&mut self, command: Command) -> bool {
        let (dcol, drow) = command.delta();
        self.try_move_piece(dcol, drow)
    }

    /// Gravity on the piece, conversion + respawn when it lands, then one settling pass.
    pub fn tick(&mut self) {
        if self.is_game_over() {
            return;
        }
        self.tick_count += 1;
        if !self.piece.try_move(0, 1, &self.grid) {
            let added = self.convert_piece();
            debug!(
                kind = self.piece.kind.name(),
                col = self.piece.col,
                row = self.piece.row,
                added,
                "piece landed"
            );
            self.spawn_next();
        }
        self.settle_pass();
        debug_assert_eq!(self.grid.occupied_count(), self.particles.len());
    }

    /// Add one unsettled particle at an empty in-bounds cell.
    /// Returns `None` (and adds nothing) if the cell is taken or outside the grid.
    pub fn add_particle(&mut self, col: usize, row: usize, color: Color) -> Option<ParticleId> {
        if !self.grid.is_free(col as i32, row as i32) {
            return None;
        }
        let id = self.particles.len();
        self.particles.push(Particle::new(col, row, color));
        self.grid.set(col, row, Cell::Occupied(id));
        Some(id)
    }

    /// Turn every visible cell of the piece into a particle. Returns how many were added.
    fn convert_piece(&mut self) -> usize {
        let color = self.piece.color;
        let mut added = 0;
        for (col, row) in self.piece.cells() {
            if row < 0 {
                continue;
            }
            // A grain that slid under the piece since its last move keeps the cell.
            if self.add_particle(col as usize, row as usize, color).is_some() {
                added += 1;
            } else {
                debug!(col, row, "piece cell already occupied, dropped");
            }
        }
        added
    }

    fn spawn_next(&mut self) {
        let kind = self.source.next_kind();
        self.spawn(kind);
    }

    /// Replace the current piece with a fresh one of `kind` at the spawn origin.
    pub fn spawn(&mut self, kind: TetrominoKind) {
        self.piece = Piece::spawn(self.shapes.get(kind), self.grid.width());
        debug!(kind = kind.name(), col = self.piece.col, "spawned piece");
        self.check_spawn();
    }

    fn check_spawn(&mut self) {
        if !self.piece.try_move(0, 0, &self.grid) {
            self.state = SimState::GameOver;
            info!(
                ticks = self.tick_count,
                particles = self.particles.len(),
                "spawn blocked, game over"
            );
        }
    }

    /// One pass over unsettled particles in creation order. Each move is written
    /// back immediately, so later particles see earlier ones at their new cell.
    fn settle_pass(&mut self) {
        for id in 0..self.particles.len() {
            let particle = &mut self.particles[id];
            if particle.settled {
                continue;
            }
            self.grid.set(particle.col, particle.row, Cell::Empty);
            particle.settle_step(&self.grid);
            self.grid.set(particle.col, particle.row, Cell::Occupied(id));
        }
    }
}
