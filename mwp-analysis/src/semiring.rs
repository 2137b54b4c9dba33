// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! The five-element flow semiring.
//!
//! Every dependency between two program variables is summarized by one
//! scalar: `0` (no flow) < `m` (maximal/linear flow) < `w` (weak
//! polynomial flow) < `p` (polynomial flow) < `∞` (failure). Addition is
//! the least upper bound in this order; multiplication composes flows
//! along a path.

use std::fmt;

use serde::{Serialize, Serializer};

/// A flow scalar.
///
/// Ordered `Zero < Unit < Weak < Poly < Infty`; the derived `Ord` is the
/// semiring order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scalar {
    /// No dependency (`o`).
    Zero,
    /// Maximal, linear flow (`m`) — the multiplicative unit.
    Unit,
    /// Weak polynomial flow (`w`).
    Weak,
    /// Polynomial flow (`p`).
    Poly,
    /// Failure (`i`), $\infty$.
    Infty,
}

impl Scalar {
    /// All scalars, in ascending order.
    pub const ALL: [Scalar; 5] = [
        Scalar::Zero,
        Scalar::Unit,
        Scalar::Weak,
        Scalar::Poly,
        Scalar::Infty,
    ];

    /// Sum of two scalars: the least upper bound.
    ///
    /// Commutative, associative, idempotent; `Zero` is the identity and
    /// `Infty` absorbs.
    pub fn add(self, other: Scalar) -> Scalar {
        self.max(other)
    }

    /// Product of two scalars.
    ///
    /// | ×  | 0 | m | w | p | ∞ |
    /// |----|---|---|---|---|---|
    /// | 0  | 0 | 0 | 0 | 0 | 0 |
    /// | m  | 0 | m | w | p | ∞ |
    /// | w  | 0 | w | p | p | ∞ |
    /// | p  | 0 | p | p | p | ∞ |
    /// | ∞  | 0 | ∞ | ∞ | ∞ | ∞ |
    ///
    /// Commutative, associative; `Unit` is the identity, `Zero` absorbs
    /// everything, and `Infty` absorbs every non-zero scalar.
    pub fn mul(self, other: Scalar) -> Scalar {
        match (self, other) {
            (Scalar::Zero, _) | (_, Scalar::Zero) => Scalar::Zero,
            (Scalar::Infty, _) | (_, Scalar::Infty) => Scalar::Infty,
            (Scalar::Unit, x) | (x, Scalar::Unit) => x,
            // both operands are at least Weak
            _ => Scalar::Poly,
        }
    }

    /// Single-letter form used in display and serialized matrices.
    pub fn as_str(self) -> &'static str {
        match self {
            Scalar::Zero => "o",
            Scalar::Unit => "m",
            Scalar::Weak => "w",
            Scalar::Poly => "p",
            Scalar::Infty => "i",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
