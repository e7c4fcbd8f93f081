//! Dense row-major 2D grid used for tile layers.
//!
//! Row 0 is the first row stored. World grids keep the world's bottom-left
//! origin (row 0 = lowest row); document layers are produced by reading the
//! rows in reverse.

/// A `width × height` grid stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Create a grid filled with `fill`.
    pub fn filled(width: usize, height: usize, fill: T) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; width * height],
        }
    }

    /// Return a copy with the row order reversed.
    ///
    /// The cell at `(x, height - 1 - y)` lands at `(x, y)`.
    pub fn flipped_vertical(&self) -> Self {
        let mut cells = Vec::with_capacity(self.cells.len());
        for row in self.rows().rev() {
            cells.extend_from_slice(row);
        }
        Self {
            width: self.width,
            height: self.height,
            cells,
        }
    }
}

impl<T> Grid<T> {
    /// Build a grid from row-major cells. Returns `None` on a size mismatch.
    pub fn from_cells(width: usize, height: usize, cells: Vec<T>) -> Option<Self> {
        if cells.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            cells,
        })
    }

    /// Build a grid by evaluating `f(x, y)` for every cell, row by row.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x < self.width && y < self.height {
            self.cells.get(y * self.width + x)
        } else {
            None
        }
    }

    /// Overwrite a cell. Out-of-range positions are ignored and return `false`.
    pub fn set(&mut self, x: usize, y: usize, value: T) -> bool {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = value;
            true
        } else {
            false
        }
    }

    /// Iterate rows from row 0 upward.
    pub fn rows(&self) -> impl DoubleEndedIterator<Item = &[T]> {
        // chunks_exact(0) panics, and an empty grid has no rows anyway
        let width = self.width.max(1);
        self.cells.chunks_exact(width).take(self.height)
    }

    /// Row-major cells.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// Map every cell into a new grid of the same shape.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().map(f).collect(),
        }
    }
}
