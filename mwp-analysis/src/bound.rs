// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Symbolic mwp-bounds.
//!
//! A successful derivation yields, per variable `x`, an inequality
//! `x′ ≤ max(x₁,…,poly₁) + poly₂`: sources flowing at `m` are arguments
//! of the max, `w` sources join additively, `p` sources multiply. The
//! conjunction over all variables is the program's bound.

use std::collections::BTreeSet;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::relation::SimpleRelation;
use crate::semiring::Scalar;
use mwp_ast::Ident;

/// A set of variables joined by one operator — one slot of a bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HonestPoly {
    op: &'static str,
    variables: BTreeSet<Ident>,
}

impl HonestPoly {
    fn new(op: &'static str) -> Self {
        Self {
            op,
            variables: BTreeSet::new(),
        }
    }

    /// Add a variable to the slot.
    pub fn add(&mut self, var: Ident) {
        self.variables.insert(var);
    }

    /// True when the slot holds no variables.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Number of variables in the slot.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Variables in sorted order.
    pub fn vars(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.as_str()).collect()
    }
}

impl fmt::Display for HonestPoly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variables.is_empty() {
            return write!(f, "0");
        }
        write!(f, "{}", self.vars().join(self.op))
    }
}

/// One variable's mwp-bound: the `m`, `w` and `p` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MwpBound {
    /// Sources flowing at `m`: arguments of the max.
    pub x: HonestPoly,
    /// Sources flowing at `w`: the additive polynomial inside the max.
    pub y: HonestPoly,
    /// Sources flowing at `p`: the multiplicative polynomial added on.
    pub z: HonestPoly,
}

impl Default for MwpBound {
    fn default() -> Self {
        Self {
            x: HonestPoly::new(","),
            y: HonestPoly::new("+"),
            z: HonestPoly::new("*"),
        }
    }
}

impl MwpBound {
    /// File a source variable under the slot its scalar selects.
    /// `o` contributes nothing; `∞` must not reach a bound.
    pub fn append(&mut self, scalar: Scalar, var: Ident) {
        match scalar {
            Scalar::Unit => self.x.add(var),
            Scalar::Weak => self.y.add(var),
            Scalar::Poly => self.z.add(var),
            Scalar::Zero | Scalar::Infty => {}
        }
    }

    /// The bound as three sorted variable lists `(m, w, p)`.
    pub fn triple(&self) -> (Vec<&str>, Vec<&str>, Vec<&str>) {
        (self.x.vars(), self.y.vars(), self.z.vars())
    }

    /// Compact `m;w;p` form, lists comma-separated.
    pub fn triple_str(&self) -> String {
        format!(
            "{};{};{}",
            self.x.vars().join(","),
            self.y.vars().join(","),
            self.z.vars().join(",")
        )
    }
}

impl fmt::Display for MwpBound {
    /// `max(x…, y…) + z…`, with the max dropped for a single argument
    /// and empty slots elided; the empty bound is `0`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let term = match (self.x.is_empty(), self.y.is_empty()) {
            (false, false) => Some(format!("max({},{})", self.x, self.y)),
            (false, true) if self.x.len() > 1 => Some(format!("max({})", self.x)),
            (false, true) => Some(self.x.to_string()),
            (true, false) if self.y.len() > 1 => Some(format!("max({})", self.y)),
            (true, false) => Some(self.y.to_string()),
            (true, true) => None,
        };
        match (term, self.z.is_empty()) {
            (Some(term), true) => write!(f, "{term}"),
            (Some(term), false) => write!(f, "{term}+{}", self.z),
            (None, _) => write!(f, "{}", self.z),
        }
    }
}

/// The bound of a whole relation: one [`MwpBound`] per variable, in
/// relation variable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bound {
    /// Per-variable bounds.
    pub bounds: Vec<(Ident, MwpBound)>,
}

impl Bound {
    /// Calculate the bound from a scalar matrix produced by a witness
    /// choice: column per target, rows filed by their scalar.
    pub fn calculate(relation: &SimpleRelation) -> Bound {
        let mut bounds = Vec::with_capacity(relation.variables.len());
        for (col, name) in relation.variables.iter().enumerate() {
            let mut bound = MwpBound::default();
            for (row, source) in relation.variables.iter().enumerate() {
                bound.append(relation.matrix[row][col], source.clone());
            }
            bounds.push((name.clone(), bound));
        }
        Bound { bounds }
    }

    /// The bound of one variable, if present.
    pub fn get(&self, var: &str) -> Option<&MwpBound> {
        self.bounds
            .iter()
            .find(|(name, _)| name == var)
            .map(|(_, b)| b)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .bounds
            .iter()
            .map(|(name, bound)| format!("{name}′ ≤ {bound}"))
            .collect();
        write!(f, "{}", parts.join(" ∧ "))
    }
}

impl Serialize for Bound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.bounds.len()))?;
        for (name, bound) in &self.bounds {
            map.serialize_entry(name.as_str(), &bound.triple_str())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol_str::SmolStr;

    fn simple(vars: &[&str], matrix: Vec<Vec<Scalar>>) -> SimpleRelation {
        SimpleRelation {
            variables: vars.iter().map(|v| SmolStr::new(v)).collect(),
            matrix,
        }
    }

    #[test]
    fn test_append_files_by_scalar() {
        let mut bound = MwpBound::default();
        bound.append(Scalar::Unit, SmolStr::new("X0"));
        bound.append(Scalar::Weak, SmolStr::new("X1"));
        bound.append(Scalar::Poly, SmolStr::new("X2"));
        bound.append(Scalar::Zero, SmolStr::new("X3"));
        assert_eq!(bound.triple(), (vec!["X0"], vec!["X1"], vec!["X2"]));
    }

    #[test]
    fn test_triple_str() {
        let mut bound = MwpBound::default();
        bound.append(Scalar::Unit, SmolStr::new("X0"));
        bound.append(Scalar::Unit, SmolStr::new("X1"));
        bound.append(Scalar::Poly, SmolStr::new("X4"));
        bound.append(Scalar::Poly, SmolStr::new("X2"));
        assert_eq!(bound.triple_str(), "X0,X1;;X2,X4");
    }

    #[test]
    fn test_display_single_var() {
        let mut bound = MwpBound::default();
        bound.append(Scalar::Unit, SmolStr::new("x"));
        assert_eq!(bound.to_string(), "x");
    }

    #[test]
    fn test_display_max_and_product() {
        let mut bound = MwpBound::default();
        bound.append(Scalar::Unit, SmolStr::new("X0"));
        bound.append(Scalar::Unit, SmolStr::new("X1"));
        bound.append(Scalar::Poly, SmolStr::new("X2"));
        bound.append(Scalar::Poly, SmolStr::new("X3"));
        assert_eq!(bound.to_string(), "max(X0,X1)+X2*X3");
    }

    #[test]
    fn test_display_mixed_max() {
        let mut bound = MwpBound::default();
        bound.append(Scalar::Unit, SmolStr::new("x"));
        bound.append(Scalar::Weak, SmolStr::new("y"));
        bound.append(Scalar::Weak, SmolStr::new("z"));
        assert_eq!(bound.to_string(), "max(x,y+z)");
    }

    #[test]
    fn test_display_empty_is_zero() {
        assert_eq!(MwpBound::default().to_string(), "0");
    }

    #[test]
    fn test_calculate_from_matrix() {
        use Scalar::*;
        let rel = simple(
            &["x", "y"],
            vec![vec![Unit, Poly], vec![Zero, Unit]],
        );
        let bound = Bound::calculate(&rel);
        assert_eq!(bound.to_string(), "x′ ≤ x ∧ y′ ≤ y+x");
    }

    #[test]
    fn test_conjunction_order_follows_variables() {
        use Scalar::*;
        let rel = simple(
            &["b", "a"],
            vec![vec![Unit, Zero], vec![Zero, Unit]],
        );
        let bound = Bound::calculate(&rel);
        assert_eq!(bound.bounds[0].0, "b");
        assert_eq!(bound.bounds[1].0, "a");
    }
}
