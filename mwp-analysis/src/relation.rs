// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Relations: matrices annotated with the program variables they range
//! over.
//!
//! Composition of two relations first aligns their variable lists
//! (*homogenisation*), then multiplies the matrices. The loop operators
//! live here as well: the star fixpoint and the while/bounded-loop
//! corrections that replace scalars invalid under iteration with `∞`.

use std::fmt;

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::choice::{Choices, Seq};
use crate::delta_graph::DeltaGraph;
use crate::error::AnalysisResult;
use crate::matrix::Matrix;
use crate::monomial::Monomial;
use crate::polynomial::Polynomial;
use crate::semiring::Scalar;
use mwp_ast::Ident;

/// A matrix over an ordered list of program variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    /// Variable names; row/column `k` is variable `variables[k]`.
    pub variables: Vec<Ident>,
    /// The flow matrix.
    pub matrix: Matrix,
}

impl Relation {
    /// Create a relation with a zero matrix.
    pub fn new(variables: Vec<Ident>) -> Self {
        let size = variables.len();
        Self {
            variables,
            matrix: Matrix::zero(size),
        }
    }

    /// Create a relation with an identity matrix.
    pub fn identity(variables: Vec<Ident>) -> Self {
        let size = variables.len();
        Self {
            variables,
            matrix: Matrix::identity(size),
        }
    }

    /// True when the relation ranges over no variables.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Index of a variable in this relation.
    pub fn index_of(&self, variable: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == variable)
    }

    /// Build an identity relation whose column for `variable` is
    /// replaced by the given vector (row `k` of the column gets
    /// `vector[k]`; rows past the vector keep their identity entries).
    pub fn replace_column(&self, vector: &[Polynomial], variable: &str) -> Relation {
        let mut result = Relation::identity(self.variables.clone());
        if let Some(j) = self.index_of(variable) {
            for (i, poly) in vector.iter().enumerate() {
                result.matrix[(i, j)] = poly.clone();
            }
        }
        result
    }

    /// Align two relations on the union of their variables, preserving
    /// the first relation's order and appending new names from the
    /// second. Matrices are embedded accordingly; uncovered entries are
    /// identity.
    pub fn homogenise(r1: &Relation, r2: &Relation) -> (Relation, Relation) {
        if r1.variables == r2.variables {
            return (r1.clone(), r2.clone());
        }
        if r1.is_empty() {
            return (Relation::identity(r2.variables.clone()), r2.clone());
        }
        if r2.is_empty() {
            return (r1.clone(), Relation::identity(r1.variables.clone()));
        }
        tracing::debug!("matrix homogenisation");

        let mut extended = r1.variables.clone();
        for var in &r2.variables {
            if !extended.contains(var) {
                extended.push(var.clone());
            }
        }
        let size = extended.len();

        let matrix1 = r1.matrix.resize(size);

        // remap the second matrix through the extended variable order
        let mapping: Vec<(usize, usize)> = extended
            .iter()
            .enumerate()
            .filter_map(|(new, var)| r2.index_of(var).map(|old| (new, old)))
            .collect();
        let mut matrix2 = Matrix::identity(size);
        for &(mi, ri) in &mapping {
            for &(mj, rj) in &mapping {
                matrix2[(mi, mj)] = r2.matrix[(ri, rj)].clone();
            }
        }

        (
            Relation {
                variables: extended.clone(),
                matrix: matrix1,
            },
            Relation {
                variables: extended,
                matrix: matrix2,
            },
        )
    }

    /// Sum of two relations after homogenisation.
    pub fn sum(&self, other: &Relation) -> AnalysisResult<Relation> {
        let (r1, r2) = Relation::homogenise(self, other);
        Ok(Relation {
            variables: r1.variables,
            matrix: r1.matrix.sum(&r2.matrix)?,
        })
    }

    /// Composition of two relations after homogenisation.
    pub fn composition(&self, other: &Relation) -> AnalysisResult<Relation> {
        let (r1, r2) = Relation::homogenise(self, other);
        Ok(Relation {
            variables: r1.variables,
            matrix: r1.matrix.prod(&r2.matrix)?,
        })
    }

    /// Equality up to homogenisation: same variable set, element-wise
    /// equal matrices.
    pub fn equal(&self, other: &Relation) -> bool {
        let mine: FxHashSet<&Ident> = self.variables.iter().collect();
        let theirs: FxHashSet<&Ident> = other.variables.iter().collect();
        if mine != theirs {
            return false;
        }
        let (r1, r2) = Relation::homogenise(self, other);
        r1.matrix == r2.matrix
    }

    /// The star of this relation (reflexive-transitive closure under
    /// elementwise sum).
    pub fn fixpoint(&self) -> AnalysisResult<Relation> {
        tracing::debug!(variables = ?self.variables, "computing fixpoint");
        Ok(Relation {
            variables: self.variables.clone(),
            matrix: self.matrix.fixpoint()?,
        })
    }

    /// While-loop correction: after the body star, a `p` scalar
    /// anywhere or a `w` scalar on the diagonal cannot be iterated —
    /// both become `∞`, and their delta sequences feed the graph.
    pub fn while_correction(&mut self, dg: &mut DeltaGraph) {
        for (i, row) in self.matrix.rows_mut().enumerate() {
            for (j, poly) in row.iter_mut().enumerate() {
                for mono in &mut poly.monomials {
                    if mono.scalar == Scalar::Poly || (mono.scalar == Scalar::Weak && i == j) {
                        mono.scalar = Scalar::Infty;
                        dg.from_monomial(mono);
                    }
                }
            }
        }
    }

    /// Bounded-loop correction: any non-`m` diagonal scalar becomes
    /// `∞`, and every `p` entry at `(i, j)` is recorded as a dependency
    /// of the loop counter — added to row `x_var`, column `j`.
    pub fn loop_correction(&mut self, x_var: &str, dg: &mut DeltaGraph) {
        let Some(ell) = self.index_of(x_var) else {
            return;
        };
        let mut additions: Vec<(usize, Monomial)> = Vec::new();
        for (i, row) in self.matrix.rows_mut().enumerate() {
            for (j, poly) in row.iter_mut().enumerate() {
                for mono in &mut poly.monomials {
                    if i == j && mono.scalar != Scalar::Unit {
                        mono.scalar = Scalar::Infty;
                        dg.from_monomial(mono);
                    } else if mono.scalar == Scalar::Poly {
                        additions.push((j, mono.clone()));
                    }
                }
            }
        }
        for (j, mono) in additions {
            self.matrix[(ell, j)] = self.matrix[(ell, j)].add(&Polynomial::new([mono]));
        }
    }

    /// Evaluate the matrix under a concrete choice assignment.
    pub fn apply_choice(&self, choices: &[u8]) -> SimpleRelation {
        let n = self.variables.len();
        let mut matrix = vec![vec![Scalar::Zero; n]; n];
        for i in 0..n {
            for j in 0..n {
                let least = if i == j { Scalar::Unit } else { Scalar::Zero };
                matrix[i][j] = self.matrix[(i, j)].choice_scalar(choices, least);
            }
        }
        SimpleRelation {
            variables: self.variables.clone(),
            matrix,
        }
    }

    /// Gather all failure sequences of the matrix and build the choice
    /// disjunction that avoids them.
    pub fn eval(&self, domain: &[u8], index: usize) -> Choices {
        let mut infinity_deltas: FxHashSet<Seq> = FxHashSet::default();
        for row in self.matrix.rows() {
            for poly in row {
                infinity_deltas.extend(poly.eval(&[]));
            }
        }
        Choices::generate(domain, index, infinity_deltas)
    }

    /// Like [`Relation::eval`], but restricted to the column of one
    /// variable — the choices under which that single variable stays
    /// bounded.
    pub fn var_eval(&self, domain: &[u8], index: usize, variable: &str) -> Choices {
        let mut infinity_deltas: FxHashSet<Seq> = FxHashSet::default();
        if let Some(col) = self.index_of(variable) {
            for row in self.matrix.rows() {
                infinity_deltas.extend(row[col].eval(&[]));
            }
        }
        Choices::generate(domain, index, infinity_deltas)
    }

    /// Variable pairs whose flow can reach `∞` under some choice,
    /// optionally restricted to pairs touching the given variables.
    /// Returned in variable order as `(source, targets)`, targets
    /// non-empty.
    pub fn infty_vars(&self, only: Option<&FxHashSet<Ident>>) -> Vec<(Ident, Vec<Ident>)> {
        let mut result = Vec::new();
        for (i, src) in self.variables.iter().enumerate() {
            let targets: Vec<Ident> = self
                .variables
                .iter()
                .enumerate()
                .filter(|&(j, tgt)| {
                    self.matrix[(i, j)].some_infty()
                        && only.map_or(true, |set| set.contains(src) || set.contains(tgt))
                })
                .map(|(_, tgt)| tgt.clone())
                .collect();
            if !targets.is_empty() {
                result.push((src.clone(), targets));
            }
        }
        result
    }

    /// Format the potentially-infinite flows, e.g. `x ➔ y, z ‖ w ➔ w`.
    pub fn infty_pairs(&self, only: Option<&FxHashSet<Ident>>) -> String {
        self.infty_vars(only)
            .iter()
            .map(|(src, targets)| {
                let list: Vec<&str> = targets.iter().map(|t| t.as_str()).collect();
                format!("{src} ➔ {}", list.join(", "))
            })
            .collect::<Vec<_>>()
            .join(" ‖ ")
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .variables
            .iter()
            .map(|v| v.len())
            .max()
            .unwrap_or_default();
        for (i, var) in self.variables.iter().enumerate() {
            let row: Vec<String> = (0..self.variables.len())
                .map(|j| self.matrix[(i, j)].to_string())
                .collect();
            writeln!(f, "{var:width$} | {}", row.join(" "))?;
        }
        Ok(())
    }
}

/// A relation whose matrix holds plain scalars: the result of applying
/// one derivation choice to a polynomial relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimpleRelation {
    /// Variable names.
    pub variables: Vec<Ident>,
    /// Scalar matrix.
    pub matrix: Vec<Vec<Scalar>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(names: &[&str]) -> Vec<Ident> {
        names.iter().map(|n| Ident::new(n)).collect()
    }

    #[test]
    fn test_replace_column() {
        let rel = Relation::identity(vars(&["x", "y"]));
        let vector = vec![Polynomial::zero(), Polynomial::unit()];
        let out = rel.replace_column(&vector, "x");
        assert!(out.matrix[(0, 0)].is_zero());
        assert_eq!(out.matrix[(1, 0)], Polynomial::unit());
        assert_eq!(out.matrix[(1, 1)], Polynomial::unit());
    }

    #[test]
    fn test_homogenise_extends_variables() {
        let r1 = Relation::identity(vars(&["x", "y"]));
        let r2 = Relation::identity(vars(&["y", "z"]));
        let (h1, h2) = Relation::homogenise(&r1, &r2);
        assert_eq!(h1.variables, vars(&["x", "y", "z"]));
        assert_eq!(h1.variables, h2.variables);
        assert_eq!(h1.matrix, Matrix::identity(3));
        assert_eq!(h2.matrix, Matrix::identity(3));
    }

    #[test]
    fn test_homogenise_remaps_entries() {
        // r2 knows a y -> z flow; after alignment it must sit at the
        // same variable pair, not the same numeric index
        let mut r2 = Relation::identity(vars(&["y", "z"]));
        r2.matrix[(0, 1)] = Polynomial::constant(Scalar::Weak);
        let r1 = Relation::identity(vars(&["x", "y", "z"]));
        let (_, h2) = Relation::homogenise(&r1, &r2);
        assert_eq!(h2.variables, vars(&["x", "y", "z"]));
        assert_eq!(h2.matrix[(1, 2)], Polynomial::constant(Scalar::Weak));
        assert!(h2.matrix[(1, 0)].is_zero());
    }

    #[test]
    fn test_composition_with_empty_is_identity_like() {
        let empty = Relation::new(Vec::new());
        let mut rel = Relation::identity(vars(&["x"]));
        rel.matrix[(0, 0)] = Polynomial::constant(Scalar::Weak);
        let composed = empty.composition(&rel).unwrap();
        assert_eq!(composed.matrix, rel.matrix);
    }

    #[test]
    fn test_composition_zeroes_overwritten_column() {
        // x := 0 erases previous flows into x
        let mut before = Relation::identity(vars(&["x", "y"]));
        before.matrix[(1, 0)] = Polynomial::constant(Scalar::Unit);
        let constant = Relation::new(vars(&["x"]));
        let after = before.composition(&constant).unwrap();
        assert!(after.matrix[(0, 0)].is_zero());
        assert!(after.matrix[(1, 0)].is_zero());
        assert_eq!(after.matrix[(1, 1)], Polynomial::unit());
    }

    #[test]
    fn test_equal_ignores_variable_order() {
        let mut r1 = Relation::identity(vars(&["x", "y"]));
        r1.matrix[(0, 1)] = Polynomial::constant(Scalar::Weak);
        let mut r2 = Relation::identity(vars(&["y", "x"]));
        r2.matrix[(1, 0)] = Polynomial::constant(Scalar::Weak);
        assert!(r1.equal(&r2));
        assert!(!r1.equal(&Relation::identity(vars(&["x", "y"]))));
    }

    #[test]
    fn test_while_correction() {
        let mut rel = Relation::identity(vars(&["x", "y"]));
        rel.matrix[(0, 0)] = Polynomial::new([
            Monomial::constant(Scalar::Unit),
            Monomial::new(Scalar::Weak, [(0, 0)]),
        ]);
        rel.matrix[(1, 0)] = Polynomial::new([Monomial::new(Scalar::Poly, [(1, 0)])]);
        let mut dg = DeltaGraph::default();
        rel.while_correction(&mut dg);

        // diagonal w and the p both became infinity
        assert!(rel.matrix[(0, 0)].some_infty());
        assert!(rel.matrix[(1, 0)].some_infty());
        // off-diagonal m untouched
        assert_eq!(rel.matrix[(1, 1)], Polynomial::unit());
    }

    #[test]
    fn test_loop_correction_records_counter_dependency() {
        let mut rel = Relation::identity(vars(&["n", "x", "y"]));
        rel.matrix[(1, 2)] = Polynomial::new([Monomial::new(Scalar::Poly, [(0, 0)])]);
        let mut dg = DeltaGraph::default();
        rel.loop_correction("n", &mut dg);

        // the p flow x -> y is now also a flow n -> y
        assert_eq!(
            rel.matrix[(0, 2)].choice_scalar(&[0], Scalar::Zero),
            Scalar::Poly
        );
        assert!(!rel.matrix[(0, 2)].some_infty());
    }

    #[test]
    fn test_loop_correction_flips_diagonal() {
        let mut rel = Relation::identity(vars(&["n", "x"]));
        rel.matrix[(1, 1)] = Polynomial::new([Monomial::new(Scalar::Weak, [(2, 0)])]);
        let mut dg = DeltaGraph::default();
        rel.loop_correction("n", &mut dg);
        assert!(rel.matrix[(1, 1)].some_infty());
    }

    #[test]
    fn test_apply_choice() {
        let mut rel = Relation::identity(vars(&["x", "y"]));
        rel.matrix[(1, 0)] =
            Polynomial::from_scalars(0, &[Scalar::Unit, Scalar::Poly, Scalar::Weak]);
        let simple = rel.apply_choice(&[1]);
        assert_eq!(simple.matrix[1][0], Scalar::Poly);
        assert_eq!(simple.matrix[0][0], Scalar::Unit);
        assert_eq!(simple.matrix[0][1], Scalar::Zero);
    }

    #[test]
    fn test_eval_collects_matrix_failures() {
        let mut rel = Relation::identity(vars(&["x"]));
        rel.matrix[(0, 0)] = Polynomial::new([
            Monomial::constant(Scalar::Unit),
            Monomial::new(Scalar::Infty, [(0, 0)]),
        ]);
        let choices = rel.eval(&[0, 1, 2], 1);
        assert!(!choices.infinite());
        assert_eq!(choices.valid, vec![vec![vec![1, 2]]]);
    }

    #[test]
    fn test_infty_vars() {
        let mut rel = Relation::identity(vars(&["x", "y"]));
        rel.matrix[(0, 1)] = Polynomial::new([Monomial::new(Scalar::Infty, [(1, 0)])]);
        let flows = rel.infty_vars(None);
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].0, "x");
        assert_eq!(flows[0].1, vars(&["y"]));
        assert_eq!(rel.infty_pairs(None), "x ➔ y");
    }
}
