// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Analysis error types.
//!
//! An *infinite* verdict is not an error — it is a normal analysis
//! outcome carried on the result object. Errors here are the fatal
//! cases: internal invariant violations and strict-mode rejections.

use thiserror::Error;

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// A fatal analysis error for a single function.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The loop fixpoint failed to stabilize within the iteration cap.
    /// The lattice is finite, so hitting this indicates a defect, not a
    /// property of the input program.
    #[error("fixpoint did not stabilize within {cap} iterations")]
    FixpointDivergence { cap: usize },

    /// A matrix operation was attempted on incompatible dimensions.
    #[error("matrix dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}
