// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Relation lists: the disjunction of relations carried through
//! conditional branches.
//!
//! Each relation in the list is one possible flow matrix for the code
//! analyzed so far. Composition combines every member with every member
//! of the other list; duplicates are dropped.

use crate::delta_graph::DeltaGraph;
use crate::error::AnalysisResult;
use crate::polynomial::Polynomial;
use crate::relation::Relation;
use mwp_ast::Ident;

/// A non-empty list of relations.
#[derive(Debug, Clone)]
pub struct RelationList {
    /// Member relations.
    pub relations: Vec<Relation>,
}

impl Default for RelationList {
    fn default() -> Self {
        Self {
            relations: vec![Relation::new(Vec::new())],
        }
    }
}

impl RelationList {
    /// A list holding one zero relation over the given variables.
    pub fn from_variables(variables: Vec<Ident>) -> Self {
        Self {
            relations: vec![Relation::new(variables)],
        }
    }

    /// A list holding one identity relation over the given variables.
    pub fn identity(variables: Vec<Ident>) -> Self {
        Self {
            relations: vec![Relation::identity(variables)],
        }
    }

    /// The first relation of the list.
    pub fn first(&self) -> &Relation {
        &self.relations[0]
    }

    /// Replace a column in every member relation.
    pub fn replace_column(&mut self, vector: &[Polynomial], variable: &str) {
        self.relations = self
            .relations
            .iter()
            .map(|rel| rel.replace_column(vector, variable))
            .collect();
    }

    /// Compose every member with every member of `other`, keeping the
    /// distinct results.
    pub fn composition(&mut self, other: &RelationList) -> AnalysisResult<()> {
        let mut composed: Vec<Relation> = Vec::new();
        for r1 in &self.relations {
            for r2 in &other.relations {
                let output = r1.composition(r2)?;
                if !composed.contains(&output) {
                    composed.push(output);
                }
            }
        }
        self.relations = composed;
        Ok(())
    }

    /// Pairwise sum of two lists (the join of two branch disjunctions).
    pub fn sum(&self, other: &RelationList) -> AnalysisResult<RelationList> {
        let mut relations = Vec::new();
        for r1 in &self.relations {
            for r2 in &other.relations {
                relations.push(r1.sum(r2)?);
            }
        }
        Ok(RelationList { relations })
    }

    /// Star every member relation.
    pub fn fixpoint(&mut self) -> AnalysisResult<()> {
        let mut relations = Vec::with_capacity(self.relations.len());
        for rel in &self.relations {
            relations.push(rel.fixpoint()?);
        }
        self.relations = relations;
        Ok(())
    }

    /// Apply the while correction to every member.
    pub fn while_correction(&mut self, dg: &mut DeltaGraph) {
        for rel in &mut self.relations {
            rel.while_correction(dg);
        }
    }

    /// Apply the bounded-loop correction to every member.
    pub fn loop_correction(&mut self, x_var: &str, dg: &mut DeltaGraph) {
        for rel in &mut self.relations {
            rel.loop_correction(x_var, dg);
        }
    }
}
