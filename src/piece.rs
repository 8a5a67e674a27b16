//! Falling piece: shape table, random shape source, movement and collision.

use crate::grid::Grid;
use rand::Rng;
use ratatui::style::Color;

/// Tetromino kinds (I, O, T, S, Z, J, L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TetrominoKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl TetrominoKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::S, Self::Z, Self::J, Self::L];

    /// 4 cells relative to the origin; each (dcol, drow).
    pub fn offsets(self) -> [(i32, i32); 4] {
        match self {
            Self::I => [(0, 0), (0, 1), (0, 2), (0, 3)],
            Self::O => [(0, 0), (0, 1), (1, 0), (1, 1)],
            Self::T => [(0, 1), (1, 0), (1, 1), (1, 2)],
            Self::S => [(0, 1), (0, 2), (1, 0), (1, 1)],
            Self::Z => [(0, 0), (0, 1), (1, 1), (1, 2)],
            Self::J => [(0, 0), (1, 0), (1, 1), (1, 2)],
            Self::L => [(0, 2), (1, 0), (1, 1), (1, 2)],
        }
    }

    pub fn default_color(self) -> Color {
        match self {
            Self::I => Color::Rgb(0, 255, 255),
            Self::O => Color::Rgb(255, 255, 0),
            Self::T => Color::Rgb(128, 0, 128),
            Self::S => Color::Rgb(0, 255, 0),
            Self::Z => Color::Rgb(255, 0, 0),
            Self::J => Color::Rgb(0, 0, 255),
            Self::L => Color::Rgb(255, 128, 0),
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::I => "I",
            Self::O => "O",
            Self::T => "T",
            Self::S => "S",
            Self::Z => "Z",
            Self::J => "J",
            Self::L => "L",
        }
    }
}

/// Offsets and colour for one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeDef {
    pub kind: TetrominoKind,
    pub offsets: [(i32, i32); 4],
    pub color: Color,
}

/// The 7 shape definitions a simulation is built with. Fixed after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeSet {
    defs: [ShapeDef; 7],
}

impl Default for ShapeSet {
    fn default() -> Self {
        Self {
            defs: TetrominoKind::ALL.map(|kind| ShapeDef {
                kind,
                offsets: kind.offsets(),
                color: kind.default_color(),
            }),
        }
    }
}

impl ShapeSet {
    /// Standard offsets with colours taken from `colors` (indexed like `TetrominoKind::ALL`).
    pub fn with_colors(colors: [Color; 7]) -> Self {
        let mut set = Self::default();
        for (def, color) in set.defs.iter_mut().zip(colors) {
            def.color = color;
        }
        set
    }

    #[inline]
    pub fn get(&self, kind: TetrominoKind) -> &ShapeDef {
        &self.defs[kind.index()]
    }
}

/// Where the next shape comes from. The app uses `RandomShapes`; tests script the sequence.
pub trait ShapeSource: std::fmt::Debug {
    fn next_kind(&mut self) -> TetrominoKind;
}

/// Uniform choice among the 7 kinds.
#[derive(Debug, Clone)]
pub struct RandomShapes<R> {
    rng: R,
}

impl<R: Rng> RandomShapes<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + std::fmt::Debug> ShapeSource for RandomShapes<R> {
    fn next_kind(&mut self) -> TetrominoKind {
        TetrominoKind::ALL[self.rng.gen_range(0..TetrominoKind::ALL.len())]
    }
}

/// Cycles through a fixed list of kinds.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ScriptedShapes {
    kinds: Vec<TetrominoKind>,
    pos: usize,
}

#[cfg(test)]
impl ScriptedShapes {
    pub fn new(kinds: &[TetrominoKind]) -> Self {
        assert!(!kinds.is_empty());
        Self {
            kinds: kinds.to_vec(),
            pos: 0,
        }
    }
}

#[cfg(test)]
impl ShapeSource for ScriptedShapes {
    fn next_kind(&mut self) -> TetrominoKind {
        let kind = self.kinds[self.pos % self.kinds.len()];
        self.pos += 1;
        kind
    }
}

/// Active falling piece. Only `col` and `row` change after spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub kind: TetrominoKind,
    pub color: Color,
    pub offsets: [(i32, i32); 4],
    pub col: i32,
    pub row: i32,
}

impl Piece {
    /// Horizontally centred on the top row.
    pub fn spawn(def: &ShapeDef, grid_width: usize) -> Self {
        Self {
            kind: def.kind,
            color: def.color,
            offsets: def.offsets,
            col: grid_width as i32 / 2 - 2,
            row: 0,
        }
    }

    /// Absolute cells at the current origin.
    pub fn cells(&self) -> [(i32, i32); 4] {
        self.cells_at(self.col, self.row)
    }

    fn cells_at(&self, col: i32, row: i32) -> [(i32, i32); 4] {
        self.offsets.map(|(dc, dr)| (col + dc, row + dr))
    }

    /// True if the piece fits with its origin at `(col, row)`.
    /// Cells above the grid (negative row) never collide.
    pub fn fits_at(&self, col: i32, row: i32, grid: &Grid) -> bool {
        self.cells_at(col, row).iter().all(|&(c, r)| {
            if c < 0 || c as usize >= grid.width() || r >= grid.height() as i32 {
                return false;
            }
            r < 0 || grid.is_free(c, r)
        })
    }

    /// Move by the delta if every resulting cell is valid; otherwise leave the piece untouched.
    pub fn try_move(&mut self, dcol: i32, drow: i32, grid: &Grid) -> bool {
        let (col, row) = (self.col + dcol, self.row + drow);
        if !self.fits_at(col, row, grid) {
            return false;
        }
        self.col = col;
        self.row = row;
        true
    }

    /// Whether the piece covers the cell.
    pub fn covers(&self, col: i32, row: i32) -> bool {
        self.cells().contains(&(col, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn piece(kind: TetrominoKind, col: i32, row: i32) -> Piece {
        let mut p = Piece::spawn(ShapeSet::default().get(kind), 10);
        p.col = col;
        p.row = row;
        p
    }

    #[test]
    fn test_spawn_centred_on_top_row() {
        let p = Piece::spawn(ShapeSet::default().get(TetrominoKind::T), 40);
        assert_eq!((p.col, p.row), (18, 0));
        assert_eq!(p.color, Color::Rgb(128, 0, 128));
        assert_eq!(p.cells(), [(18, 1), (19, 0), (19, 1), (19, 2)]);
    }

    #[test]
    fn test_move_left_at_wall_is_refused() {
        let grid = Grid::new(10, 10);
        let mut p = piece(TetrominoKind::O, 0, 3);
        assert!(!p.try_move(-1, 0, &grid));
        assert_eq!((p.col, p.row), (0, 3));
    }

    #[test]
    fn test_move_right_at_wall_is_refused() {
        let grid = Grid::new(10, 10);
        let mut p = piece(TetrominoKind::O, 8, 3);
        assert!(!p.try_move(1, 0, &grid));
        assert!(p.try_move(-1, 0, &grid));
        assert_eq!(p.col, 7);
    }

    #[test]
    fn test_move_below_floor_is_refused() {
        let grid = Grid::new(10, 10);
        let mut p = piece(TetrominoKind::I, 4, 6);
        assert!(!p.try_move(0, 1, &grid));
        assert_eq!(p.row, 6);
    }

    #[test]
    fn test_move_into_occupied_cell_is_refused() {
        let mut grid = Grid::new(10, 10);
        grid.set(4, 5, Cell::Occupied(0));
        let mut p = piece(TetrominoKind::I, 4, 1);
        assert!(!p.try_move(0, 1, &grid));
        assert!(p.try_move(1, 1, &grid));
        assert_eq!((p.col, p.row), (5, 2));
    }

    #[test]
    fn test_cells_above_grid_ignore_occupancy() {
        let mut grid = Grid::new(10, 10);
        grid.set(4, 0, Cell::Occupied(0));
        let mut p = piece(TetrominoKind::I, 4, -4);
        // All four cells at rows -4..=-1.
        assert!(p.try_move(0, 0, &grid));
        // Bottom cell would land on the occupied (4, 0).
        assert!(!p.try_move(0, 1, &grid));
        assert_eq!(p.row, -4);
    }

    #[test]
    fn test_covers() {
        let p = piece(TetrominoKind::L, 2, 2);
        assert!(p.covers(2, 4));
        assert!(p.covers(3, 2));
        assert!(!p.covers(2, 2));
    }

    #[test]
    fn test_shape_set_color_override() {
        let colors = [Color::Rgb(1, 1, 1); 7];
        let set = ShapeSet::with_colors(colors);
        assert_eq!(set.get(TetrominoKind::Z).color, Color::Rgb(1, 1, 1));
        assert_eq!(set.get(TetrominoKind::Z).offsets, TetrominoKind::Z.offsets());
    }

    #[test]
    fn test_random_shapes_cover_all_kinds() {
        let mut source = RandomShapes::new(StdRng::seed_from_u64(7));
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(source.next_kind());
        }
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn test_scripted_shapes_cycle() {
        let mut source = ScriptedShapes::new(&[TetrominoKind::I, TetrominoKind::O]);
        assert_eq!(source.next_kind(), TetrominoKind::I);
        assert_eq!(source.next_kind(), TetrominoKind::O);
        assert_eq!(source.next_kind(), TetrominoKind::I);
    }

    fn grid_from(width: usize, height: usize, occupied: &[bool]) -> Grid {
        let mut grid = Grid::new(width, height);
        for (i, &o) in occupied.iter().enumerate().take(width * height) {
            if o {
                grid.set(i % width, i / width, Cell::Occupied(i));
            }
        }
        grid
    }

    proptest! {
        #[test]
        fn prop_try_move_never_overlaps_or_leaves_grid(
            occupied in prop::collection::vec(prop::bool::weighted(0.3), 64),
            kind in 0usize..7,
            moves in prop::collection::vec((-1i32..=1, 0i32..=1), 0..40),
        ) {
            let grid = grid_from(8, 8, &occupied);
            let mut p = Piece::spawn(ShapeSet::default().get(TetrominoKind::ALL[kind]), 8);
            p.row = -4;
            for (dc, dr) in moves {
                p.try_move(dc, dr, &grid);
                for (c, r) in p.cells() {
                    prop_assert!((0..8).contains(&c));
                    prop_assert!(r < 8);
                    if r >= 0 {
                        prop_assert!(grid.is_free(c, r));
                    }
                }
            }
        }

        #[test]
        fn prop_zero_move_is_idempotent(
            occupied in prop::collection::vec(prop::bool::weighted(0.3), 64),
            kind in 0usize..7,
            col in -2i32..8,
            row in -4i32..8,
        ) {
            let grid = grid_from(8, 8, &occupied);
            let mut p = piece(TetrominoKind::ALL[kind], col, row);
            let first = p.try_move(0, 0, &grid);
            for _ in 0..3 {
                prop_assert_eq!(p.try_move(0, 0, &grid), first);
                prop_assert_eq!((p.col, p.row), (col, row));
            }
        }
    }
}
