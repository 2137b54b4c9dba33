// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Result objects produced by the analysis.
//!
//! One [`FuncResult`] per analyzed function, collected into a
//! [`Report`] for the whole program. Everything serializes to JSON so
//! the driver can persist results next to the input file.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bound::Bound;
use crate::choice::Choices;
use crate::relation::Relation;
use mwp_ast::Ident;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Verdict for a single function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FuncStatus {
    /// Every variable is polynomially bounded under some derivation.
    Bounded,
    /// No derivation avoids `∞`.
    Infinite,
    /// Strict mode rejected the function's syntax.
    Unsupported,
    /// The analysis aborted on an internal error.
    Error,
}

/// Analysis result for one function.
#[derive(Debug, Clone, Serialize)]
pub struct FuncResult {
    /// Function name.
    pub name: Ident,
    /// The verdict.
    pub status: FuncStatus,
    /// True when no valid derivation exists.
    pub infinite: bool,
    /// Variables of the analyzed relation.
    pub variables: Vec<Ident>,
    /// Total number of derivation choices taken.
    pub index: usize,
    /// Final relation, omitted when an early exit skipped it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
    /// Valid derivation choices, when evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Choices>,
    /// The bound, per variable, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound: Option<Bound>,
    /// Human-readable bound conjunction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound_fmt: Option<String>,
    /// Variable pairs with no `∞`-free derivation, when infinite.
    #[serde(serialize_with = "flows_as_map")]
    pub problematic_flows: Vec<(Ident, Vec<Ident>)>,
    /// Constructs that were skipped during analysis.
    pub warnings: Vec<String>,
    /// Variable named by a `return` statement, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<Ident>,
    /// Wall-clock start, milliseconds since the epoch.
    pub start_time: u64,
    /// Wall-clock end, milliseconds since the epoch.
    pub end_time: u64,
}

impl FuncResult {
    /// Create a fresh result for a function, stamped with the start
    /// time.
    pub fn new(name: Ident) -> Self {
        Self {
            name,
            status: FuncStatus::Bounded,
            infinite: false,
            variables: Vec::new(),
            index: 0,
            relation: None,
            choices: None,
            bound: None,
            bound_fmt: None,
            problematic_flows: Vec::new(),
            warnings: Vec::new(),
            returns: None,
            start_time: now_millis(),
            end_time: 0,
        }
    }

    /// Record the bound together with its display form.
    pub fn set_bound(&mut self, bound: Bound) {
        self.bound_fmt = Some(bound.to_string());
        self.bound = Some(bound);
    }

    /// Stamp the end time.
    pub fn on_end(&mut self) {
        self.end_time = now_millis();
    }

    /// Analysis duration in milliseconds.
    pub fn dur_ms(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }
}

fn flows_as_map<S: Serializer>(
    flows: &[(Ident, Vec<Ident>)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(flows.len()))?;
    for (source, targets) in flows {
        map.serialize_entry(source.as_str(), targets)?;
    }
    map.end()
}

/// Program-level statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProgramInfo {
    /// Path of the analyzed file, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Source line count, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_lines: Option<usize>,
    /// Number of functions.
    pub n_functions: usize,
    /// Number of loops across all functions.
    pub n_loops: usize,
    /// Number of variables across all functions.
    pub n_variables: usize,
}

/// Analysis results for a whole program.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Program statistics.
    pub program: ProgramInfo,
    /// Per-function results, in source order.
    pub functions: Vec<FuncResult>,
    /// Wall-clock start, milliseconds since the epoch.
    pub start_time: u64,
    /// Wall-clock end, milliseconds since the epoch.
    pub end_time: u64,
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

impl Report {
    /// Create an empty report stamped with the start time.
    pub fn new() -> Self {
        Self {
            program: ProgramInfo::default(),
            functions: Vec::new(),
            start_time: now_millis(),
            end_time: 0,
        }
    }

    /// Append a function result.
    pub fn add(&mut self, result: FuncResult) {
        self.functions.push(result);
    }

    /// Look up a function result by name.
    pub fn get(&self, name: &str) -> Option<&FuncResult> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Stamp the end time.
    pub fn on_end(&mut self) {
        self.end_time = now_millis();
    }
}
