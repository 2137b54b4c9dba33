// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Polynomials: normalized sums of monomials.
//!
//! A polynomial is an ordered list of monomials under a strict normal
//! form: no two monomials share a delta sequence, no zero coefficients
//! (the empty list denotes the zero polynomial), monomials sorted by
//! their delta sequence, and no monomial subsumed by a more general one
//! with a dominating scalar. Normalization is applied eagerly on every
//! operation — matrices produced by loop fixpoints would otherwise
//! accumulate combinatorially many redundant terms.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::monomial::{Delta, Monomial, SetInclusion};
use crate::semiring::Scalar;

/// Order on delta sequences: `δ(i,j) < δ(m,n)` iff `j < n`, or `j = n`
/// and `i < m`; extended to sequences by the first difference, then by
/// length.
pub(crate) fn compare_deltas(a: &[Delta], b: &[Delta]) -> Ordering {
    for (&(i, j), &(m, n)) in a.iter().zip(b.iter()) {
        if (i, j) != (m, n) {
            return if j < n || (j == n && i < m) {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
    }
    a.len().cmp(&b.len())
}

/// A normalized sum of monomials. The empty sum is the zero polynomial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Polynomial {
    /// Monomials in delta-sequence order.
    pub monomials: Vec<Monomial>,
}

impl Polynomial {
    /// The zero polynomial.
    pub fn zero() -> Self {
        Self {
            monomials: Vec::new(),
        }
    }

    /// The unit polynomial `m`.
    pub fn unit() -> Self {
        Self::constant(Scalar::Unit)
    }

    /// A delta-free polynomial of one scalar.
    pub fn constant(scalar: Scalar) -> Self {
        let mut poly = Self::zero();
        poly.insert(Monomial::constant(scalar));
        poly
    }

    /// Build a normalized polynomial from arbitrary monomials.
    pub fn new(monomials: impl IntoIterator<Item = Monomial>) -> Self {
        let mut poly = Self::zero();
        for mono in monomials {
            poly.insert(mono);
        }
        poly
    }

    /// One monomial per scalar, where the `k`-th gets delta `(k, index)`.
    ///
    /// `from_scalars(5, [m, w, p])` is `m.delta(0,5) + w.delta(1,5) +
    /// p.delta(2,5)` — the shape of a derivation-choice column entry.
    pub fn from_scalars(index: usize, scalars: &[Scalar]) -> Self {
        Self::new(
            scalars
                .iter()
                .enumerate()
                .map(|(v, &s)| Monomial::new(s, [(v as u8, index)])),
        )
    }

    /// True if this is the zero polynomial.
    pub fn is_zero(&self) -> bool {
        self.monomials.is_empty()
    }

    /// True if some monomial carries an `∞` coefficient.
    pub fn some_infty(&self) -> bool {
        self.monomials.iter().any(|m| m.scalar == Scalar::Infty)
    }

    /// Insert one monomial, restoring the normal form.
    ///
    /// Monomials subsumed by the new one are dropped; if the new one is
    /// itself subsumed it is discarded; otherwise it is placed at its
    /// sorted position.
    pub(crate) fn insert(&mut self, mono: Monomial) {
        if mono.is_zero() {
            return;
        }
        let mut i = 0;
        while i < self.monomials.len() {
            match self.monomials[i].inclusion(&mono) {
                SetInclusion::Contains => {
                    self.monomials.remove(i);
                }
                SetInclusion::Included => return,
                SetInclusion::Empty => i += 1,
            }
        }
        let pos = self
            .monomials
            .partition_point(|m| compare_deltas(&m.deltas, &mono.deltas) == Ordering::Less);
        self.monomials.insert(pos, mono);
    }

    /// Sum of two polynomials.
    pub fn add(&self, other: &Polynomial) -> Polynomial {
        let mut result = self.clone();
        for mono in &other.monomials {
            result.insert(mono.clone());
        }
        result
    }

    /// Product of two polynomials: the cross product of their
    /// monomials, renormalized.
    pub fn mul(&self, other: &Polynomial) -> Polynomial {
        let mut result = Polynomial::zero();
        for m1 in &self.monomials {
            for m2 in &other.monomials {
                result.insert(m1.prod(m2));
            }
        }
        result
    }

    /// Delta sequences of all monomials whose scalar is `∞` or occurs
    /// in `scalars` — the choice combinations leading to those flows.
    pub fn eval(&self, scalars: &[Scalar]) -> Vec<Vec<Delta>> {
        self.monomials
            .iter()
            .filter(|m| m.scalar == Scalar::Infty || scalars.contains(&m.scalar))
            .map(|m| m.deltas.clone())
            .collect()
    }

    /// Scalar of this polynomial under a concrete choice assignment:
    /// the sum of all matching monomial scalars, or `least` when the
    /// polynomial is non-zero but no monomial matches.
    pub fn choice_scalar(&self, choices: &[u8], least: Scalar) -> Scalar {
        if self.monomials.is_empty() {
            return Scalar::Zero;
        }
        let mut matched = None;
        for mono in &self.monomials {
            if let Some(scalar) = mono.choice_scalar(choices) {
                matched = Some(matched.map_or(scalar, |acc: Scalar| acc.add(scalar)));
            }
        }
        matched.unwrap_or(least)
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.monomials.is_empty() {
            return write!(f, "+o");
        }
        for mono in &self.monomials {
            write!(f, "+{mono}")?;
        }
        Ok(())
    }
}
