use ndarray::Array2;

use crate::{
    alignment::{pair_type, Alignment},
    model::ModelConfig,
    params::Energy,
};

/// Sentinel marking a column pair that must never form a base pair.
pub const PAIR_SCORE_NONE: Energy = -10_000;

/// Hamming distances between the canonical pair types; two compensatory
/// substitutions score 2, a wobble-preserving one scores 1.
#[rustfmt::skip]
const PAIR_DISTANCE: [[Energy; 7]; 7] = [
    [0, 0, 0, 0, 0, 0, 0],
    [0, 0, 2, 2, 1, 2, 2], // CG
    [0, 2, 0, 1, 2, 2, 2], // GC
    [0, 2, 1, 0, 2, 1, 2], // GU
    [0, 1, 2, 2, 0, 2, 1], // UG
    [0, 2, 2, 1, 2, 0, 2], // AU
    [0, 2, 2, 2, 1, 2, 0], // UA
];

const UNIT: f64 = 100.0;

/// Covariance score per column pair. Positive scores reward compensatory
/// base-pair substitutions, negative scores penalize columns where part of
/// the alignment cannot pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairScores {
    scores: Array2<Energy>,
}

impl PairScores {
    /// Score of the column pair (i, j) with i < j, 1-based.
    pub fn get(&self, i: usize, j: usize) -> Energy {
        debug_assert!(i < j);
        self.scores[[i, j]]
    }

    pub(crate) fn set(&mut self, i: usize, j: usize, score: Energy) {
        debug_assert!(i < j);
        self.scores[[i, j]] = score;
    }

    /// Forbids the column pair (i, j).
    pub(crate) fn forbid(&mut self, i: usize, j: usize) {
        if i < j {
            self.scores[[i, j]] = PAIR_SCORE_NONE;
        }
    }
}

/// Computes the covariance score matrix of an alignment.
///
/// A pair of columns where more than half of the sequences cannot form a
/// canonical pair is marked with [`PAIR_SCORE_NONE`]. With the no-lone-pairs
/// model option, column pairs that could only ever form isolated pairs are
/// masked as well, so the recursion never has to consider them.
pub fn pair_scores(alignment: &Alignment, model: &ModelConfig) -> PairScores {
    let n = alignment.columns();
    let n_seq = alignment.n_seq();
    let mut scores = Array2::from_elem((n + 1, n + 1), PAIR_SCORE_NONE);

    for i in 1..n {
        for j in i + 1..=n {
            // frequency of each pair type; slot 0 counts non-pairing
            // sequences, slot 7 counts gap-gap pairs
            let mut frequency = [0usize; 8];
            for sequence in &alignment.sequences {
                let (a, b) = (sequence.codes[i], sequence.codes[j]);
                if a == 0 && b == 0 {
                    frequency[7] += 1;
                } else {
                    frequency[pair_type(a, b, model.wobble_pairs)] += 1;
                }
            }

            if 2 * frequency[0] + frequency[7] > n_seq {
                continue;
            }

            let mut distance_sum = 0;
            for k in 1..7 {
                for l in k..7 {
                    distance_sum += frequency[k] as Energy
                        * frequency[l] as Energy
                        * PAIR_DISTANCE[k][l];
                }
            }

            let score = model.covariance_factor
                * (UNIT * distance_sum as f64 / n_seq as f64
                    - model.non_compatible_factor
                        * UNIT
                        * (frequency[0] as f64 + 0.25 * frequency[7] as f64));
            scores[[i, j]] = score as Energy;
        }
    }

    let mut scores = PairScores { scores };
    if model.no_lonely_pairs {
        mask_isolated_pairs(&mut scores, n, model.min_pair_score);
    }
    scores
}

/// Masks column pairs that can neither stack outward nor inward.
fn mask_isolated_pairs(scores: &mut PairScores, n: usize, min_score: Energy) {
    let viable = |scores: &PairScores, i: usize, j: usize| {
        i >= 1 && j <= n && i < j && scores.get(i, j) >= min_score
    };

    let mut isolated = Vec::new();
    for i in 1..n {
        for j in i + 1..=n {
            if scores.get(i, j) < min_score {
                continue;
            }
            let outer = i > 1 && j < n && viable(scores, i - 1, j + 1);
            let inner = viable(scores, i + 1, j.wrapping_sub(1));
            if !outer && !inner {
                isolated.push((i, j));
            }
        }
    }
    for (i, j) in isolated {
        scores.forbid(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_canonical_columns_score_zero() {
        let alignment = Alignment::new(&["GC", "GC"], false).unwrap();
        let scores = pair_scores(&alignment, &ModelConfig::default());
        assert_eq!(scores.get(1, 2), 0);
    }

    #[test]
    fn compensatory_substitutions_are_rewarded() {
        let alignment = Alignment::new(&["GC", "CG"], false).unwrap();
        let scores = pair_scores(&alignment, &ModelConfig::default());
        assert!(scores.get(1, 2) > 0);
    }

    #[test]
    fn non_pairing_majorities_are_forbidden() {
        let alignment = Alignment::new(&["AA", "AA"], false).unwrap();
        let scores = pair_scores(&alignment, &ModelConfig::default());
        assert_eq!(scores.get(1, 2), PAIR_SCORE_NONE);
    }

    #[test]
    fn lone_pair_masking() {
        // the outer columns can pair, but nothing can stack on them
        let alignment = Alignment::new(&["GAAAAC", "GAAAAC"], false).unwrap();
        let model = ModelConfig {
            no_lonely_pairs: true,
            ..ModelConfig::default()
        };
        let scores = pair_scores(&alignment, &model);
        assert_eq!(scores.get(1, 6), PAIR_SCORE_NONE);
    }
}
