// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Monomials: a scalar guarded by a conjunction of derivation choices.
//!
//! A delta `(v, j)` names one derivation choice: it holds when the
//! `j`-th non-deterministic program point resolves to value `v`. A
//! monomial's scalar applies exactly when all of its deltas hold
//! simultaneously; an empty delta list means it always applies.

use std::fmt;

use serde::Serialize;

use crate::semiring::Scalar;

/// A single derivation choice: `(value, index)`.
pub type Delta = (u8, usize);

/// How one monomial's delta set relates to another's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetInclusion {
    /// Self's deltas contain the other's, with a scalar the other
    /// dominates — self is redundant next to the other.
    Contains,
    /// Self's deltas are contained in the other's, with a dominating
    /// scalar — the other is redundant next to self.
    Included,
    /// Neither subsumes the other.
    Empty,
}

/// A scalar together with an index-ordered conjunction of deltas.
///
/// Invariants: deltas are strictly ordered by index (one delta per
/// index), and a monomial with scalar `Zero` carries no deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Monomial {
    /// The coefficient.
    pub scalar: Scalar,
    /// Conjunction of choices under which the coefficient applies.
    pub deltas: Vec<Delta>,
}

impl Monomial {
    /// Create a monomial from a scalar and any sequence of deltas.
    ///
    /// Deltas are inserted one by one; contradictory deltas (same index,
    /// different value) annihilate the result to the zero monomial.
    pub fn new(scalar: Scalar, deltas: impl IntoIterator<Item = Delta>) -> Self {
        let mut mono = Monomial::constant(scalar);
        mono.insert_deltas(deltas);
        mono
    }

    /// Create a delta-free monomial.
    pub fn constant(scalar: Scalar) -> Self {
        Self {
            scalar,
            deltas: Vec::new(),
        }
    }

    /// The zero monomial.
    pub fn zero() -> Self {
        Self::constant(Scalar::Zero)
    }

    /// True if this monomial is the zero monomial.
    pub fn is_zero(&self) -> bool {
        self.scalar == Scalar::Zero
    }

    /// Insert deltas into this monomial, keeping the index order.
    ///
    /// On contradiction the monomial collapses to zero and insertion
    /// stops.
    pub fn insert_deltas(&mut self, deltas: impl IntoIterator<Item = Delta>) {
        if self.is_zero() {
            return;
        }
        for delta in deltas {
            if !insert_delta(&mut self.deltas, delta) {
                self.scalar = Scalar::Zero;
                self.deltas.clear();
                return;
            }
        }
    }

    /// Product of two monomials: scalars multiply, delta lists merge.
    ///
    /// Contradicting delta lists or a zero scalar product yield the zero
    /// monomial.
    pub fn prod(&self, other: &Monomial) -> Monomial {
        let scalar = self.scalar.mul(other.scalar);
        if scalar == Scalar::Zero {
            return Monomial::zero();
        }
        let mut result = Monomial {
            scalar,
            deltas: self.deltas.clone(),
        };
        result.insert_deltas(other.deltas.iter().copied());
        result
    }

    /// True if every delta of `other` occurs in this monomial.
    pub fn contains(&self, other: &Monomial) -> bool {
        other.deltas.iter().all(|d| self.deltas.contains(d))
    }

    /// Classify the inclusion relation between two monomials, taking
    /// the scalars into account (see [`SetInclusion`]).
    pub fn inclusion(&self, other: &Monomial) -> SetInclusion {
        let lub = self.scalar.add(other.scalar);
        if self.contains(other) && other.scalar == lub {
            SetInclusion::Contains
        } else if other.contains(self) && self.scalar == lub {
            SetInclusion::Included
        } else {
            SetInclusion::Empty
        }
    }

    /// The scalar of this monomial if all its deltas agree with the
    /// given choice assignment, `None` otherwise.
    pub fn choice_scalar(&self, choices: &[u8]) -> Option<Scalar> {
        for &(v, j) in &self.deltas {
            if choices.get(j).copied() != Some(v) {
                return None;
            }
        }
        Some(self.scalar)
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scalar)?;
        for (v, j) in &self.deltas {
            write!(f, ".delta({v},{j})")?;
        }
        Ok(())
    }
}

/// Insert a delta into an index-sorted delta list.
///
/// Returns `false` when the list already pins the same index to a
/// different value — the contradiction that zeroes the owning monomial.
/// Inserting an already-present delta is a no-op.
fn insert_delta(sorted: &mut Vec<Delta>, delta: Delta) -> bool {
    let mut i = 0;
    while i < sorted.len() {
        if sorted[i].1 < delta.1 {
            i += 1;
        } else if sorted[i].1 == delta.1 {
            return sorted[i].0 == delta.0;
        } else {
            break;
        }
    }
    sorted.insert(i, delta);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sorts_deltas() {
        let mono = Monomial::new(Scalar::Weak, [(1, 2), (0, 0), (2, 1)]);
        assert_eq!(mono.deltas, vec![(0, 0), (2, 1), (1, 2)]);
        assert_eq!(mono.scalar, Scalar::Weak);
    }

    #[test]
    fn test_contradiction_is_zero() {
        let mono = Monomial::new(Scalar::Poly, [(0, 1), (1, 1)]);
        assert!(mono.is_zero());
        assert!(mono.deltas.is_empty());
    }

    #[test]
    fn test_duplicate_delta_is_noop() {
        let mono = Monomial::new(Scalar::Unit, [(1, 3), (1, 3)]);
        assert_eq!(mono.deltas, vec![(1, 3)]);
    }

    #[test]
    fn test_prod_merges_deltas() {
        let a = Monomial::new(Scalar::Unit, [(0, 0)]);
        let b = Monomial::new(Scalar::Weak, [(1, 1)]);
        let ab = a.prod(&b);
        assert_eq!(ab.scalar, Scalar::Weak);
        assert_eq!(ab.deltas, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_prod_contradiction() {
        let a = Monomial::new(Scalar::Unit, [(0, 0)]);
        let b = Monomial::new(Scalar::Weak, [(1, 0)]);
        assert!(a.prod(&b).is_zero());
    }

    #[test]
    fn test_prod_zero_drops_deltas() {
        let a = Monomial::new(Scalar::Zero, []);
        let b = Monomial::new(Scalar::Poly, [(2, 5)]);
        let ab = a.prod(&b);
        assert!(ab.is_zero());
        assert!(ab.deltas.is_empty());
    }

    #[test]
    fn test_choice_scalar() {
        let mono = Monomial::new(Scalar::Poly, [(0, 0), (2, 2)]);
        assert_eq!(mono.choice_scalar(&[0, 1, 2]), Some(Scalar::Poly));
        assert_eq!(mono.choice_scalar(&[1, 1, 2]), None);
        assert_eq!(mono.choice_scalar(&[0, 1]), None);
    }

    #[test]
    fn test_inclusion() {
        // fewer deltas + larger scalar subsumes more deltas + smaller scalar
        let general = Monomial::new(Scalar::Poly, [(0, 0)]);
        let specific = Monomial::new(Scalar::Unit, [(0, 0), (1, 1)]);
        assert_eq!(specific.inclusion(&general), SetInclusion::Contains);
        assert_eq!(general.inclusion(&specific), SetInclusion::Included);

        let unrelated = Monomial::new(Scalar::Unit, [(2, 7)]);
        assert_eq!(general.inclusion(&unrelated), SetInclusion::Empty);
    }

    #[test]
    fn test_display() {
        let mono = Monomial::new(Scalar::Weak, [(0, 0), (1, 1)]);
        assert_eq!(mono.to_string(), "w.delta(0,0).delta(1,1)");
        assert_eq!(Monomial::constant(Scalar::Unit).to_string(), "m");
    }
}
