// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Choice vectors: the compact representation of valid derivations.
//!
//! The analyzer hands this module the set of delta sequences that force
//! an `∞` coefficient somewhere in the result matrix. The simplifier
//! first reduces that set to a minimal equivalent form, then negates it
//! into a disjunction of *choice vectors*: per derivation index, the
//! subset of domain values under which no failure sequence can be
//! completed. An empty disjunction (at positive index) means every
//! derivation fails — the program is not polynomially bounded.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::monomial::Delta;

/// A delta sequence, ordered by index.
pub type Seq = Vec<Delta>;

/// Per derivation index, the set of allowed domain values.
pub type ChoiceVector = Vec<Vec<u8>>;

/// A disjunction of choice vectors of a fixed length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Choices {
    /// The valid choice vectors.
    pub valid: Vec<ChoiceVector>,
    /// Length of each vector: the number of derivation choices made.
    pub index: usize,
}

impl Choices {
    /// True if no valid derivation exists.
    pub fn infinite(&self) -> bool {
        self.valid.is_empty() && self.index > 0
    }

    /// The first valid derivation: the first value at each position of
    /// the first vector, if any vector exists.
    pub fn first(&self) -> Option<Vec<u8>> {
        self.valid
            .first()
            .map(|vector| vector.iter().map(|options| options[0]).collect())
    }

    /// Number of concrete derivations the disjunction denotes: the sum
    /// over vectors of the product of per-index option counts.
    pub fn n_bounds(&self) -> usize {
        self.valid
            .iter()
            .map(|vector| vector.iter().map(Vec::len).product::<usize>())
            .sum()
    }

    /// True if the given choice sequence is permitted by some vector.
    pub fn is_valid(&self, choices: &[u8]) -> bool {
        self.valid.iter().any(|vector| {
            choices.len() <= vector.len()
                && choices
                    .iter()
                    .enumerate()
                    .all(|(idx, value)| vector[idx].contains(value))
        })
    }

    /// Generate the choice representation from the failure set.
    ///
    /// Two stages: simplify the delta sequences to a fixed point, then
    /// build the vectors that avoid every remaining sequence.
    pub fn generate(domain: &[u8], index: usize, inf: FxHashSet<Seq>) -> Choices {
        if index == 0 {
            return Choices {
                valid: Vec::new(),
                index: 0,
            };
        }
        let sequences = simplify(domain, inf);
        tracing::debug!(paths = sequences.len(), "simplified failure sequences");
        let valid = build_choices(domain, index, &sequences);
        Choices { valid, index }
    }
}

/// Reduce the failure set until no rule applies: front/back reductions,
/// superset removal, and elimination of deltas that could never be part
/// of a valid vector.
fn simplify(domain: &[u8], mut sequences: FxHashSet<Seq>) -> FxHashSet<Seq> {
    loop {
        let len_before = sequences.len();
        while reduce(domain, &mut sequences, false) {}
        while reduce(domain, &mut sequences, true) {}
        sequences = unique_sequences(sequences);
        sequences = except_one(domain, sequences);
        let len_after = sequences.len();
        if len_before == len_after || len_after == 0 {
            return sequences;
        }
    }
}

/// One front (or back) reduction step.
///
/// When otherwise-identical sequences differ only in their first (or
/// last) delta value, and every domain value occurs there, the choice
/// at that position is irrelevant: the sequences collapse to the shared
/// remainder. Returns true if a collapse happened.
fn reduce(domain: &[u8], sequences: &mut FxHashSet<Seq>, from_end: bool) -> bool {
    let mut candidates: Vec<Seq> = sequences.iter().filter(|s| s.len() > 1).cloned().collect();
    candidates.sort_unstable();
    for s1 in candidates {
        let values: FxHashSet<u8> = sequences
            .iter()
            .filter(|s2| sub_equal(&s1, s2, from_end))
            .map(|s2| {
                if from_end {
                    s2[s2.len() - 1].0
                } else {
                    s2[0].0
                }
            })
            .collect();
        if domain.iter().all(|v| values.contains(v)) {
            let keep: Seq = if from_end {
                s1[..s1.len() - 1].to_vec()
            } else {
                s1[1..].to_vec()
            };
            remove_supersets(&keep, sequences);
            sequences.insert(keep);
            return true;
        }
    }
    false
}

/// Compare two sequences for equality everywhere except the first (or
/// last) delta's value; the differing position must share its index.
fn sub_equal(first: &Seq, second: &Seq, from_end: bool) -> bool {
    if first.len() != second.len() || first.is_empty() {
        return false;
    }
    let last = first.len() - 1;
    if from_end {
        first[last].1 == second[last].1 && first[..last] == second[..last]
    } else {
        first[0].1 == second[0].1 && first[1..] == second[1..]
    }
}

/// Keep only sequences not covered by a (multiset-)smaller one.
fn unique_sequences(sequences: FxHashSet<Seq>) -> FxHashSet<Seq> {
    let mut ordered: Vec<Seq> = sequences.into_iter().collect();
    ordered.sort_unstable_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    let mut result: FxHashSet<Seq> = FxHashSet::default();
    let mut remaining = std::collections::VecDeque::from(ordered);
    while let Some(first) = remaining.pop_front() {
        remaining.retain(|other| !is_subset(&first, other));
        result.insert(first);
    }
    result
}

/// Remove from the set every sequence of which `target` is a subset.
fn remove_supersets(target: &Seq, sequences: &mut FxHashSet<Seq>) {
    sequences.retain(|other| !is_subset(target, other));
}

/// True if every delta of `small` occurs in `big`.
fn is_subset(small: &Seq, big: &Seq) -> bool {
    if small == big {
        return false;
    }
    small.iter().all(|d| big.contains(d))
}

/// When singleton sequences cover all but one domain value at an index,
/// that last value can never be chosen in a valid vector — remove it
/// from the longer sequences that contain it.
fn except_one(domain: &[u8], mut sequences: FxHashSet<Seq>) -> FxHashSet<Seq> {
    let mut singles: Vec<Delta> = sequences
        .iter()
        .filter(|s| s.len() == 1)
        .map(|s| s[0])
        .collect();
    singles.sort_unstable();
    let mut queue = std::collections::VecDeque::from(singles);
    while let Some((v, index)) = queue.pop_front() {
        let values: Vec<u8> = queue
            .iter()
            .filter(|&&(_, j)| j == index)
            .map(|&(c, _)| c)
            .collect();
        let find: Vec<Delta> = domain
            .iter()
            .filter(|&&c| c != v && !values.contains(&c))
            .map(|&c| (c, index))
            .collect();
        if find.len() == 1 {
            let target = find[0];
            let affected: Vec<Seq> = sequences
                .iter()
                .filter(|s| s.len() > 1 && s.contains(&target))
                .cloned()
                .collect();
            for seq in affected {
                sequences.remove(&seq);
                sequences.insert(seq.into_iter().filter(|&d| d != target).collect());
            }
        }
    }
    sequences
}

/// Build the distinct choice vectors that avoid every failure sequence.
///
/// Works by negation: each tuple of the cross product of the failure
/// sequences picks one delta per sequence to block; removing those
/// values from an all-domain vector leaves choices under which no
/// sequence can complete. Tuples that would exhaust some position are
/// discarded, as are vectors subsumed by an already-found vector.
fn build_choices(domain: &[u8], index: usize, infinities: &FxHashSet<Seq>) -> Vec<ChoiceVector> {
    let mut domain_sorted = domain.to_vec();
    domain_sorted.sort_unstable();

    if infinities.is_empty() {
        return vec![vec![domain_sorted; index]];
    }

    let mut sorted_infty: Vec<Seq> = infinities.iter().cloned().collect();
    sorted_infty.sort_unstable_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

    let lens: Vec<usize> = sorted_infty.iter().map(Vec::len).collect();
    let iters: Vec<usize> = (0..lens.len())
        .map(|idx| lens[idx + 1..].iter().product())
        .collect();
    let max: usize = lens.iter().product();
    tracing::debug!(max, "maximum distinct vectors");

    // when every delta occurs in exactly one sequence, all generated
    // vectors are distinct and subsumption checks can be skipped
    let mut freq: rustc_hash::FxHashMap<Delta, usize> = rustc_hash::FxHashMap::default();
    for seq in &sorted_infty {
        for &delta in seq {
            *freq.entry(delta).or_default() += 1;
        }
    }
    let distinct = freq.values().max().copied() == Some(1);

    let mut vectors: Vec<ChoiceVector> = Vec::new();
    for iter_i in 0..max {
        let mut deltas: Vec<Delta> = sorted_infty
            .iter()
            .enumerate()
            .map(|(i, seq)| seq[(iter_i / iters[i]) % lens[i]])
            .collect();
        deltas.sort_unstable();
        deltas.dedup();

        // a tuple eliminating all domain values at one index cannot
        // produce a vector
        let indices: Vec<usize> = deltas.iter().map(|&(_, j)| j).collect();
        let exhausted = indices
            .iter()
            .any(|j| indices.iter().filter(|&&k| k == *j).count() >= domain.len());
        if exhausted {
            continue;
        }

        let mut vector: ChoiceVector = vec![domain_sorted.clone(); index];
        for &(v, j) in &deltas {
            vector[j].retain(|&c| c != v);
        }

        if distinct {
            vectors.push(vector);
        } else if vect_new(&vectors, &vector) {
            vect_rm(&mut vectors, &vector);
            vectors.push(vector);
        }
    }
    vectors
}

/// True if A permits every choice of B.
fn vect_contains(a: &ChoiceVector, b: &ChoiceVector) -> bool {
    a.iter()
        .zip(b.iter())
        .all(|(av, bv)| bv.iter().all(|x| av.contains(x)))
}

/// True if the vector is not subsumed by any existing vector.
fn vect_new(vectors: &[ChoiceVector], vector: &ChoiceVector) -> bool {
    !vectors.iter().any(|v| vect_contains(v, vector))
}

/// Drop existing vectors subsumed by the new vector.
fn vect_rm(vectors: &mut Vec<ChoiceVector>, vector: &ChoiceVector) {
    vectors.retain(|v| !vect_contains(vector, v));
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: [u8; 3] = [0, 1, 2];

    fn seqs(raw: &[&[Delta]]) -> FxHashSet<Seq> {
        raw.iter().map(|s| s.to_vec()).collect()
    }

    #[test]
    fn test_empty_failure_set_allows_everything() {
        let result = Choices::generate(&DOMAIN, 2, FxHashSet::default());
        assert_eq!(result.valid, vec![vec![vec![0, 1, 2], vec![0, 1, 2]]]);
        assert!(!result.infinite());
        assert_eq!(result.n_bounds(), 9);
    }

    #[test]
    fn test_zero_index_is_empty_by_convention() {
        let result = Choices::generate(&DOMAIN, 0, FxHashSet::default());
        assert!(result.valid.is_empty());
        assert!(!result.infinite());
    }

    #[test]
    fn test_all_choices_blocked_is_infinite() {
        let inf = seqs(&[&[(0, 3)], &[(1, 3)], &[(2, 3)]]);
        let result = Choices::generate(&DOMAIN, 4, inf);
        assert!(result.valid.is_empty());
        assert!(result.infinite());
    }

    #[test]
    fn test_single_failure_sequence() {
        let inf = seqs(&[&[(0, 1)]]);
        let result = Choices::generate(&DOMAIN, 2, inf);
        assert_eq!(result.valid, vec![vec![vec![0, 1, 2], vec![1, 2]]]);
    }

    #[test]
    fn test_vectors_avoid_every_failure_path() {
        let inf = seqs(&[&[(0, 1)], &[(1, 0), (2, 1)]]);
        let result = Choices::generate(&DOMAIN, 2, inf.clone());

        // brute-force: a choice tuple is valid iff it completes no
        // failure sequence
        for a in DOMAIN {
            for b in DOMAIN {
                let choices = [a, b];
                let hits_failure = inf
                    .iter()
                    .any(|seq| seq.iter().all(|&(v, j)| choices[j] == v));
                assert_eq!(
                    result.is_valid(&choices),
                    !hits_failure,
                    "choices {choices:?}"
                );
            }
        }
    }

    #[test]
    fn test_no_vector_subsumed_by_another() {
        let inf = seqs(&[&[(0, 0)], &[(1, 0)], &[(2, 1), (1, 2)], &[(2, 0), (1, 1), (1, 2)]]);
        let result = Choices::generate(&DOMAIN, 3, inf);
        for (i, a) in result.valid.iter().enumerate() {
            for (j, b) in result.valid.iter().enumerate() {
                if i != j {
                    assert!(!vect_contains(a, b), "{a:?} subsumes {b:?}");
                }
            }
        }
    }

    #[test]
    fn test_result_is_minimal() {
        let inf = seqs(&[&[(0, 0)], &[(1, 0)], &[(2, 1), (1, 2)], &[(2, 0), (1, 1), (1, 2)]]);
        let result = Choices::generate(&DOMAIN, 3, inf);

        assert!(result.valid.contains(&vec![vec![2], vec![0, 1, 2], vec![0, 2]]));
        assert!(result.valid.contains(&vec![vec![2], vec![0], vec![0, 1, 2]]));
        assert!(!result.valid.contains(&vec![vec![2], vec![0, 1], vec![0, 2]]));
        assert!(!result.valid.contains(&vec![vec![2], vec![0, 2], vec![0, 2]]));
    }

    #[test]
    fn test_parameterized_domain() {
        let domain = [0u8, 1, 2, 3];
        let inf = seqs(&[
            &[(0, 0), (0, 1)],
            &[(0, 0), (1, 1), (3, 2)],
            &[(1, 0), (1, 1), (3, 2)],
            &[(2, 0), (1, 1), (3, 2)],
            &[(3, 0), (1, 1), (3, 2)],
        ]);
        let result = Choices::generate(&domain, 3, inf);

        assert_eq!(result.valid.len(), 4);
        assert!(result
            .valid
            .contains(&vec![vec![1, 2, 3], vec![0, 2, 3], vec![0, 1, 2, 3]]));
        assert!(result
            .valid
            .contains(&vec![vec![1, 2, 3], vec![0, 1, 2, 3], vec![0, 1, 2]]));
        assert!(result
            .valid
            .contains(&vec![vec![0, 1, 2, 3], vec![2, 3], vec![0, 1, 2, 3]]));
        assert!(result
            .valid
            .contains(&vec![vec![0, 1, 2, 3], vec![1, 2, 3], vec![0, 1, 2]]));
    }

    #[test]
    fn test_first_choice() {
        // all choices blocked except (_, 0, _) at 1 etc.
        let inf1 = seqs(&[&[(0, 0)], &[(1, 1)], &[(0, 2)]]);
        let inf2 = seqs(&[&[(0, 0)], &[(1, 0)], &[(0, 1)], &[(1, 1)]]);
        assert_eq!(Choices::generate(&DOMAIN, 3, inf1).first(), Some(vec![1, 0, 1]));
        assert_eq!(Choices::generate(&DOMAIN, 2, inf2).first(), Some(vec![2, 2]));
    }

    #[test]
    fn test_n_bounds() {
        let c1 = Choices {
            valid: vec![vec![vec![0, 1, 2], vec![0, 1, 2], vec![2]]],
            index: 3,
        };
        assert_eq!(c1.n_bounds(), 9);
        let c2 = Choices {
            valid: vec![vec![
                vec![0, 1, 2],
                vec![0, 1],
                vec![0, 1, 2],
                vec![0, 1, 2],
                vec![0, 2],
                vec![0],
            ]],
            index: 6,
        };
        assert_eq!(c2.n_bounds(), 108);
    }

    #[test]
    fn test_front_reduction_collapses_full_fan() {
        // every first-delta value occurs: the tail alone is the failure
        let inf = seqs(&[
            &[(0, 0), (2, 1), (1, 4)],
            &[(1, 0), (2, 1), (1, 4)],
            &[(2, 0), (2, 1), (1, 4)],
        ]);
        let simplified = simplify(&DOMAIN, inf);
        assert_eq!(simplified.len(), 1);
        assert!(simplified.contains(&vec![(2, 1), (1, 4)]));
    }
}
