//! Dense min-plus matrices.
//!
//! Every matrix of the retiming engine (W, G′, D, the constraint layers and the
//! constraint graph) is a [`Matrix`] of `Option<i64>` cells, where `None` means there is
//! no path (or no constraint) between the row and the column. Keeping "unreachable" out of
//! band means no sentinel value can leak into a sum.
//!
//! Shortest paths are computed by repeated min-plus self-composition: if a matrix holds
//! the shortest walks of at most `k` edges, composing it with itself yields the shortest
//! walks of at most `2k` edges.

use std::{convert::Infallible, ops::Index};

use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    cells: Vec<Option<i64>>,
}

impl Matrix {
    /// A `rows` x `cols` matrix with every cell unreachable.
    pub fn unreachable(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
        }
    }

    /// The `n` x `n` min-plus identity: zero on the diagonal, unreachable elsewhere.
    pub fn identity(n: usize) -> Self {
        let mut matrix = Self::unreachable(n, n);
        for v in 0..n {
            matrix.set(v, v, Some(0));
        }
        matrix
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<i64> {
        self[(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, value: Option<i64>) {
        let ix = self.offset(row, col);
        self.cells[ix] = value;
    }

    /// Lower the cell to `value` if that is smaller than what it holds.
    ///
    /// Returns whether the cell changed.
    pub fn tighten(&mut self, row: usize, col: usize, value: i64) -> bool {
        let ix = self.offset(row, col);
        match self.cells[ix] {
            Some(current) if current <= value => false,
            _ => {
                self.cells[ix] = Some(value);
                true
            }
        }
    }

    /// Row-major iterator over the reachable cells as `(row, col, value)`.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, i64)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(ix, cell)| cell.map(|value| (ix / cols, ix % cols, value)))
    }

    pub fn row(&self, row: usize) -> &[Option<i64>] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub fn transpose(&self) -> Matrix {
        let mut transposed = Matrix::unreachable(self.cols, self.rows);
        for (r, c, value) in self.entries() {
            transposed.set(c, r, Some(value));
        }
        transposed
    }

    /// One generation of min-plus self-composition.
    ///
    /// `next[r][c] = min(self[r][c], min over i != c of self[r][i] + self[i][c])`, where
    /// the intermediate `i` ranges over the columns. Rows past the last column (such as the
    /// reference row of a constraint graph) only ever act as path sources.
    pub fn compose(&self) -> Matrix {
        debug_assert!(self.rows >= self.cols);

        let mut next = self.clone();
        for r in 0..self.rows {
            for c in 0..self.cols {
                for i in (0..self.cols).filter(|&i| i != c) {
                    if let (Some(a), Some(b)) = (self[(r, i)], self[(i, c)]) {
                        // Magnitudes are bounded when the matrix is built
                        next.tighten(r, c, a.saturating_add(b));
                    }
                }
            }
        }
        next
    }

    /// Compose the matrix with itself until it stops changing, at most `cols - 1` times.
    ///
    /// Without negative cycles `cols - 1` generations cover walks of `2^(cols-1)` edges,
    /// more than any simple path needs.
    pub fn closure(self) -> Matrix {
        match self.closure_with(|_, _| Ok::<_, Infallible>(())) {
            Ok(matrix) => matrix,
            Err(never) => match never {},
        }
    }

    /// Like [`Matrix::closure`], handing every new generation to `inspect` first.
    ///
    /// An error from `inspect` aborts the closure and is returned as is.
    pub fn closure_with<E>(
        self,
        mut inspect: impl FnMut(usize, &Matrix) -> Result<(), E>,
    ) -> Result<Matrix, E> {
        let mut current = self;
        for generation in 1..current.cols {
            let next = current.compose();
            inspect(generation, &next)?;
            if next == current {
                trace!(generation, "min-plus closure reached a fixed point");
                return Ok(next);
            }
            current = next;
        }
        Ok(current)
    }

    fn offset(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        row * self.cols + col
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Option<i64>;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        &self.cells[self.offset(row, col)]
    }
}
