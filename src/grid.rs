//! Playfield grid: fixed-size cell array indexing into the particle arena.

/// Index of a particle in `Simulation::particles`.
pub type ParticleId = usize;

/// Single cell: either empty or holding the particle with the given id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Occupied(ParticleId),
}

impl Cell {
    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }

    #[inline]
    pub fn particle(self) -> Option<ParticleId> {
        match self {
            Self::Empty => None,
            Self::Occupied(id) => Some(id),
        }
    }
}

/// Row-major cell storage. Column 0 is left, row 0 is top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Empty; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, col: i32, row: i32) -> bool {
        col >= 0 && row >= 0 && (col as usize) < self.width && (row as usize) < self.height
    }

    #[inline]
    fn index(&self, col: usize, row: usize) -> usize {
        assert!(
            col < self.width && row < self.height,
            "cell ({col}, {row}) outside {}x{} grid",
            self.width,
            self.height
        );
        row * self.width + col
    }

    /// Content of an in-bounds cell. Panics when out of bounds.
    #[inline]
    pub fn cell_at(&self, col: usize, row: usize) -> Cell {
        self.cells[self.index(col, row)]
    }

    /// Overwrite an in-bounds cell. Panics when out of bounds.
    #[inline]
    pub fn set(&mut self, col: usize, row: usize, cell: Cell) {
        let idx = self.index(col, row);
        self.cells[idx] = cell;
    }

    /// Signed lookup; `None` outside the grid.
    #[inline]
    pub fn get(&self, col: i32, row: i32) -> Option<Cell> {
        self.in_bounds(col, row)
            .then(|| self.cells[row as usize * self.width + col as usize])
    }

    /// In bounds and empty.
    #[inline]
    pub fn is_free(&self, col: i32, row: i32) -> bool {
        self.get(col, row).is_some_and(Cell::is_empty)
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// `(col, row, id)` for every occupied cell, top row first.
    #[cfg(test)]
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize, ParticleId)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(i, c)| c.particle().map(|id| (i % width, i / width, id)))
    }
}
