// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! mwp-flow analysis: static certification of polynomial growth.
//!
//! Given a program in a restricted imperative language, the analysis
//! decides for every variable `x` whether its final value `x′` is
//! bounded by a polynomial in the initial values of the inputs, and if
//! so produces a symbolic bound `x′ ≤ max(vars, poly₁) + poly₂`.
//!
//! ## Structure
//!
//! - [`semiring`] — the five-element flow algebra `{0, m, w, p, ∞}`
//! - [`monomial`] / [`polynomial`] — coefficients guarded by
//!   derivation choices, in an eagerly normalized sum form
//! - [`matrix`] / [`relation`] / [`relation_list`] — variable-indexed
//!   flow matrices with composition, homogenisation, and the loop star
//! - [`delta_graph`] — incremental detection of unavoidable failure
//! - [`choice`] — simplification of failure sequences into the compact
//!   disjunction of valid derivation choices
//! - [`bound`] — extraction of the symbolic bound from a witness
//! - [`analysis`] — the statement-directed inference rules
//! - [`result`] — serializable result objects
//!
//! All algebraic values are immutable; the only mutable state is the
//! per-function traversal context, so distinct functions or programs
//! can be analyzed concurrently without coordination.

pub mod analysis;
pub mod bound;
pub mod choice;
pub mod delta_graph;
pub mod error;
pub mod matrix;
pub mod monomial;
pub mod polynomial;
pub mod relation;
pub mod relation_list;
pub mod result;
pub mod semiring;
pub mod syntax;

pub use analysis::{analyze_function, analyze_program, AnalysisConfig, DOMAIN};
pub use bound::{Bound, MwpBound};
pub use choice::{Choices, ChoiceVector};
pub use delta_graph::DeltaGraph;
pub use error::{AnalysisError, AnalysisResult};
pub use matrix::Matrix;
pub use monomial::{Delta, Monomial};
pub use polynomial::Polynomial;
pub use relation::{Relation, SimpleRelation};
pub use relation_list::RelationList;
pub use result::{FuncResult, FuncStatus, ProgramInfo, Report};
pub use semiring::Scalar;
