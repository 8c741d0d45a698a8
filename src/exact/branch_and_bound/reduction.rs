//! Row/column reduction of a node's working matrix.

use crate::matrix::{CostMatrix, NO_EDGE};

/// Square cost buffer owned by a single search node.
///
/// Cloning is the only way two nodes come to hold the same values; every
/// child works on its own copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedMatrix {
    size: usize,
    cells: Vec<i64>,
}

impl ReducedMatrix {
    /// Copy of the original costs, not yet reduced.
    pub fn from_matrix(matrix: &CostMatrix) -> Self {
        ReducedMatrix {
            size: matrix.size(),
            cells: matrix.as_slice().to_vec(),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Reduced cost of an edge, `None` when closed or absent.
    #[inline]
    pub fn get(&self, from: usize, to: usize) -> Option<i64> {
        let c = self.cells[from * self.size + to];
        (c != NO_EDGE).then_some(c)
    }

    /// Mark a single edge as unusable.
    #[inline]
    pub fn forbid(&mut self, from: usize, to: usize) {
        self.cells[from * self.size + to] = NO_EDGE;
    }

    /// Close every edge leaving `from`.
    pub fn close_row(&mut self, from: usize) {
        let start = from * self.size;
        self.cells[start..start + self.size].fill(NO_EDGE);
    }

    /// Close every edge entering `to`.
    pub fn close_column(&mut self, to: usize) {
        for row in 0..self.size {
            self.cells[row * self.size + to] = NO_EDGE;
        }
    }

    /// Reduce rows then columns in place, returning the total subtracted.
    ///
    /// A row or column is left untouched when it has no finite entry or its
    /// minimum is already 0.
    pub fn reduce(&mut self) -> i64 {
        let n = self.size;
        let mut total = 0;

        for row in 0..n {
            let cells = &mut self.cells[row * n..(row + 1) * n];
            let min = cells.iter().copied().filter(|&c| c != NO_EDGE).min();
            if let Some(min) = min.filter(|&m| m > 0) {
                for c in cells.iter_mut().filter(|c| **c != NO_EDGE) {
                    *c -= min;
                }
                total += min;
            }
        }

        for col in 0..n {
            let min = (0..n)
                .map(|row| self.cells[row * n + col])
                .filter(|&c| c != NO_EDGE)
                .min();
            if let Some(min) = min.filter(|&m| m > 0) {
                for row in 0..n {
                    let c = &mut self.cells[row * n + col];
                    if *c != NO_EDGE {
                        *c -= min;
                    }
                }
                total += min;
            }
        }

        total
    }
}
