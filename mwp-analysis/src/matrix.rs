// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Square matrices of polynomials.
//!
//! Row index is the *source* variable of a dependency, column index the
//! *target*. The identity matrix (unit diagonal) is the relation of a
//! program that changes nothing.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::Serialize;

use crate::error::{AnalysisError, AnalysisResult};
use crate::polynomial::Polynomial;

/// Iteration cap for [`Matrix::fixpoint`]. The polynomial lattice over a
/// fixed delta set is finite, so exceeding this indicates a defect.
pub const FIXPOINT_CAP: usize = 10_000;

/// A square matrix of polynomials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Matrix {
    rows: Vec<Vec<Polynomial>>,
}

impl Matrix {
    /// Create a zero matrix of the given size.
    pub fn zero(size: usize) -> Self {
        Self {
            rows: vec![vec![Polynomial::zero(); size]; size],
        }
    }

    /// Create an identity matrix: `m` on the diagonal, `o` elsewhere.
    pub fn identity(size: usize) -> Self {
        let mut matrix = Self::zero(size);
        for i in 0..size {
            matrix[(i, i)] = Polynomial::unit();
        }
        matrix
    }

    /// Matrix dimension.
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// Element-wise polynomial sum.
    pub fn sum(&self, other: &Matrix) -> AnalysisResult<Matrix> {
        self.check_size(other)?;
        let n = self.size();
        let mut result = Matrix::zero(n);
        for i in 0..n {
            for j in 0..n {
                result[(i, j)] = self[(i, j)].add(&other[(i, j)]);
            }
        }
        Ok(result)
    }

    /// Standard matrix product over the polynomial semiring.
    pub fn prod(&self, other: &Matrix) -> AnalysisResult<Matrix> {
        self.check_size(other)?;
        let n = self.size();
        let mut result = Matrix::zero(n);
        for i in 0..n {
            for j in 0..n {
                let mut total = Polynomial::zero();
                for k in 0..n {
                    total = total.add(&self[(i, k)].mul(&other[(k, j)]));
                }
                result[(i, j)] = total;
            }
        }
        Ok(result)
    }

    /// Embed this matrix into a larger identity matrix (homogenisation
    /// primitive): entries copy to the same top-left positions, new
    /// rows/columns get `m` on the diagonal and `o` elsewhere.
    pub fn resize(&self, new_size: usize) -> Matrix {
        let mut result = Matrix::identity(new_size);
        let bound = self.size().min(new_size);
        for i in 0..bound {
            for j in 0..bound {
                result[(i, j)] = self[(i, j)].clone();
            }
        }
        result
    }

    /// The star `I ⊔ M ⊔ M² ⊔ M³ ⊔ …`, iterated to a fixpoint.
    ///
    /// Stops once folding in the next power changes nothing; monotone
    /// over a finite lattice, so the [`FIXPOINT_CAP`] guard only trips
    /// on an internal defect.
    pub fn fixpoint(&self) -> AnalysisResult<Matrix> {
        let mut fix = Matrix::identity(self.size());
        let mut power = Matrix::identity(self.size());

        for _ in 0..FIXPOINT_CAP {
            let previous = fix.clone();
            power = power.prod(self)?;
            fix = fix.sum(&power)?;
            if fix == previous {
                return Ok(fix);
            }
        }
        Err(AnalysisError::FixpointDivergence { cap: FIXPOINT_CAP })
    }

    fn check_size(&self, other: &Matrix) -> AnalysisResult<()> {
        if self.size() == other.size() {
            Ok(())
        } else {
            Err(AnalysisError::DimensionMismatch {
                left: self.size(),
                right: other.size(),
            })
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Polynomial;

    fn index(&self, (row, col): (usize, usize)) -> &Polynomial {
        &self.rows[row][col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Polynomial {
        &mut self.rows[row][col]
    }
}

impl Matrix {
    /// Iterate rows.
    pub fn rows(&self) -> impl Iterator<Item = &[Polynomial]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Iterate rows mutably.
    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut Vec<Polynomial>> {
        self.rows.iter_mut()
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|p| p.to_string()).collect();
            writeln!(f, "{}", cells.join("  "))?;
        }
        Ok(())
    }
}
