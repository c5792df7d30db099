use crate::{
    alignment::{Alignment, EncodedSequence, Symbol},
    constraints::{apply_hard_constraints, SoftConstraints},
    covariance::{pair_scores, PairScores},
    error::{Error, Result},
    matrices::TriIndex,
    model::{DangleModel, ModelConfig},
    params::{Energy, EnergyParams, MIN_LOOP_SIZE, SHORT_LOOP_PENALTY},
};

/// Pair type of two columns in one sequence, with the non-standard catch-all
/// type 7 for everything that does not form a canonical pair.
pub fn pair_type_or_any(sequence: &EncodedSequence, i: usize, j: usize, wobble: bool) -> usize {
    match crate::alignment::pair_type(sequence.codes[i], sequence.codes[j], wobble) {
        0 => 7,
        t => t,
    }
}

/// Everything the recursion, the backtracker and the evaluator share.
///
/// All per-alignment loop energies live here as single functions summing over
/// the sequences, so the three consumers cannot drift apart.
pub struct FoldContext<'a> {
    pub alignment: &'a Alignment,
    pub model: ModelConfig,
    pub params: EnergyParams,
    pub pair_scores: PairScores,
    pub soft: SoftConstraints,
    pub index: TriIndex,
}

impl<'a> FoldContext<'a> {
    pub fn new(alignment: &'a Alignment, model: &ModelConfig) -> Result<Self> {
        if model.circular && model.quadruplex {
            return Err(Error::CircularQuadruplex);
        }
        Ok(Self {
            alignment,
            model: model.clone(),
            params: EnergyParams::scaled(model.temperature),
            pair_scores: pair_scores(alignment, model),
            soft: SoftConstraints::default(),
            index: TriIndex::new(alignment.columns()),
        })
    }

    /// Applies a hard-constraint string to the covariance scores.
    pub fn constrain(&mut self, specification: &str) -> Result<()> {
        let columns = self.n();
        apply_hard_constraints(&mut self.pair_scores, specification, columns)
    }

    pub fn set_soft_constraints(&mut self, soft: SoftConstraints) {
        self.soft = soft;
    }

    pub fn n(&self) -> usize {
        self.alignment.columns()
    }

    pub fn n_seq(&self) -> usize {
        self.alignment.n_seq()
    }

    /// Rescales a summed integer energy to per-sequence kcal/mol.
    pub fn scale(&self, energy: Energy) -> f64 {
        energy as f64 / (self.n_seq() as f64 * 100.0)
    }

    pub fn pscore(&self, i: usize, j: usize) -> Energy {
        self.pair_scores.get(i, j)
    }

    /// Whether (i, j) is a candidate closing pair.
    pub fn pairable(&self, i: usize, j: usize) -> bool {
        j > i
            && j - i > MIN_LOOP_SIZE
            && self
                .model
                .max_pair_span
                .map_or(true, |span| j - i <= span)
            && self.pscore(i, j) >= self.model.min_pair_score
    }

    fn wobble(&self) -> bool {
        self.model.wobble_pairs
    }

    // Soft pseudo-energies are specified per sequence and therefore enter the
    // summed recursion multiplied by the number of sequences.

    /// Pseudo-energy of the closing pair (i, j).
    pub fn soft_pair(&self, i: usize, j: usize) -> Energy {
        match &self.soft.pair_energies {
            Some(energies) => energies[self.index.at(i, j)] * self.n_seq() as Energy,
            None => 0,
        }
    }

    /// Pseudo-energy of the exact helix stack (i, j) on (i+1, j-1).
    fn soft_stack(&self, i: usize, j: usize) -> Energy {
        match &self.soft.stack_energies {
            Some(energies) => {
                (energies[i] + energies[i + 1] + energies[j - 1] + energies[j])
                    * self.n_seq() as Energy
            }
            None => 0,
        }
    }

    /// Summed energy of the hairpin loop closed by (i, j).
    pub fn hairpin_energy(&self, i: usize, j: usize) -> Energy {
        let mut energy = self.soft_pair(i, j);
        for sequence in &self.alignment.sequences {
            let tt = pair_type_or_any(sequence, i, j, self.wobble());
            let size = sequence.col_to_pos[j - 1] - sequence.col_to_pos[i];
            if size < MIN_LOOP_SIZE {
                energy += SHORT_LOOP_PENALTY;
            } else {
                let start = sequence.col_to_pos[i - 1];
                energy += self.params.hairpin_loop(
                    size,
                    tt,
                    sequence.downstream[i],
                    sequence.upstream[j],
                    Some(&sequence.ungapped[start..]),
                );
            }
        }
        energy
    }

    /// Summed energy of the interior loop closed by (i, j) with inner pair
    /// (p, q). Includes stacks and bulges.
    pub fn interior_energy(&self, i: usize, j: usize, p: usize, q: usize) -> Energy {
        let mut energy = self.soft_pair(i, j);
        if p == i + 1 && q == j - 1 {
            energy += self.soft_stack(i, j);
        }
        for sequence in &self.alignment.sequences {
            let t1 = pair_type_or_any(sequence, i, j, self.wobble());
            let t2 = pair_type_or_any(sequence, q, p, self.wobble());
            let u1 = sequence.col_to_pos[p - 1] - sequence.col_to_pos[i];
            let u2 = sequence.col_to_pos[j - 1] - sequence.col_to_pos[q];
            energy += self.params.interior_loop(
                u1,
                u2,
                t1,
                t2,
                sequence.downstream[i],
                sequence.upstream[j],
                sequence.upstream[p],
                sequence.downstream[q],
            );
        }
        energy
    }

    /// Summed cost of closing a multiloop with the pair (i, j), excluding the
    /// per-column and per-stem terms of the enclosed fragments.
    pub fn multi_close_energy(&self, i: usize, j: usize) -> Energy {
        let mut energy = self.soft_pair(i, j)
            + self.params.ml_closing * self.n_seq() as Energy;
        for sequence in &self.alignment.sequences {
            let tt = pair_type_or_any(sequence, i, j, self.wobble());
            let reversed = crate::alignment::REVERSE_TYPE[tt];
            let (five, three) = match self.model.dangles {
                DangleModel::None => (-1, -1),
                DangleModel::Mismatch => (sequence.upstream[j], sequence.downstream[i]),
            };
            energy += self.params.multi_stem(reversed, five, three);
        }
        energy
    }

    /// Summed contribution of the stem (i, j) inside a multiloop.
    pub fn multi_stem_energy(&self, i: usize, j: usize) -> Energy {
        let mut energy = 0;
        for sequence in &self.alignment.sequences {
            let tt = pair_type_or_any(sequence, i, j, self.wobble());
            let (five, three) = match self.model.dangles {
                DangleModel::None => (-1, -1),
                DangleModel::Mismatch => (sequence.upstream[i], sequence.downstream[j]),
            };
            energy += self.params.multi_stem(tt, five, three);
        }
        energy
    }

    /// Summed contribution of the stem (i, j) in the exterior loop.
    pub fn exterior_stem_energy(&self, i: usize, j: usize) -> Energy {
        let n = self.n();
        let mut energy = 0;
        for sequence in &self.alignment.sequences {
            let tt = pair_type_or_any(sequence, i, j, self.wobble());
            let (five, three) = match self.model.dangles {
                DangleModel::None => (-1, -1),
                DangleModel::Mismatch => (
                    if i > 1 { sequence.upstream[i] } else { -1 },
                    if j < n { sequence.downstream[j] } else { -1 },
                ),
            };
            energy += self.params.exterior_stem(tt, five, three);
        }
        energy
    }

    /// Summed energy of the loop formed by a pair (i, j) enclosing a
    /// quadruplex with `u1` unpaired columns 5' and `u2` unpaired columns 3'
    /// of the motif.
    pub fn quad_host_energy(&self, i: usize, j: usize, u1: usize, u2: usize) -> Energy {
        self.soft_pair(i, j)
            + self.quad_host_mismatch(i, j)
            + self.n_seq() as Energy * self.params.internal_loop[u1 + u2]
    }

    /// Summed energy of the wrap-around loop of a circular fold whose only
    /// pair is (i, j): everything outside the pair is unpaired.
    pub fn exterior_hairpin_energy(&self, i: usize, j: usize) -> Energy {
        let n = self.n();
        let mut energy = 0;
        for sequence in &self.alignment.sequences {
            let tt = pair_type_or_any(sequence, j, i, self.wobble());
            let size = sequence.col_to_pos[i - 1] + sequence.col_to_pos[n]
                - sequence.col_to_pos[j];
            if size < MIN_LOOP_SIZE {
                energy += SHORT_LOOP_PENALTY;
            } else {
                energy += self.params.hairpin_loop(
                    size,
                    tt,
                    sequence.downstream[j],
                    sequence.upstream[i],
                    None,
                );
            }
        }
        energy
    }

    /// Summed energy of the wrap-around loop of a circular fold formed by
    /// the two pairs (i, j) and (p, q) with `j < p`.
    pub fn exterior_interior_energy(&self, i: usize, j: usize, p: usize, q: usize) -> Energy {
        let n = self.n();
        let mut energy = 0;
        for sequence in &self.alignment.sequences {
            let t1 = pair_type_or_any(sequence, j, i, self.wobble());
            let t2 = pair_type_or_any(sequence, q, p, self.wobble());
            let u1 = sequence.col_to_pos[p - 1] - sequence.col_to_pos[j];
            let u2 = sequence.col_to_pos[i - 1] + sequence.col_to_pos[n]
                - sequence.col_to_pos[q];
            energy += self.params.interior_loop(
                u1,
                u2,
                t1,
                t2,
                sequence.downstream[j],
                sequence.upstream[i],
                sequence.upstream[p],
                sequence.downstream[q],
            );
        }
        energy
    }

    /// Summed mismatch contribution of a pair (i, j) that directly encloses a
    /// quadruplex instead of an inner pair.
    pub fn quad_host_mismatch(&self, i: usize, j: usize) -> Energy {
        let mut energy = 0;
        for sequence in &self.alignment.sequences {
            let tt = pair_type_or_any(sequence, i, j, self.wobble());
            energy += self.params.interior_mismatch[base(sequence.downstream[i])]
                [base(sequence.upstream[j])];
            if tt > 2 {
                energy += self.params.terminal_au;
            }
        }
        energy
    }
}

fn base(symbol: Symbol) -> usize {
    if (1..5).contains(&symbol) {
        symbol as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_for(alignment: &Alignment) -> FoldContext<'_> {
        FoldContext::new(alignment, &ModelConfig::default()).unwrap()
    }

    #[test]
    fn identical_sequences_double_the_energy() {
        let single = Alignment::new(&["GAAAC"], false).unwrap();
        let double = Alignment::new(&["GAAAC", "GAAAC"], false).unwrap();
        let one = context_for(&single);
        let two = context_for(&double);
        assert_eq!(2 * one.hairpin_energy(1, 5), two.hairpin_energy(1, 5));
        assert_eq!(
            2 * one.exterior_stem_energy(1, 5),
            two.exterior_stem_energy(1, 5)
        );
    }

    #[test]
    fn scaling_is_per_sequence_kcal() {
        let alignment = Alignment::new(&["GAAAC", "GAAAC"], false).unwrap();
        let context = context_for(&alignment);
        assert_eq!(context.scale(-460), -2.3);
    }

    #[test]
    fn dangle_model_none_suppresses_neighbors() {
        let alignment = Alignment::new(&["AGAAACU"], false).unwrap();
        let mut model = ModelConfig::default();
        let with_dangles = FoldContext::new(&alignment, &model).unwrap();
        model.dangles = DangleModel::None;
        let without = FoldContext::new(&alignment, &model).unwrap();
        assert!(without.exterior_stem_energy(2, 6) >= with_dangles.exterior_stem_energy(2, 6));
    }

    #[test]
    fn short_loops_are_penalized_per_sequence() {
        // the ungapped loop of the second sequence has only two bases
        let alignment = Alignment::new(&["GAAAC", "GA-AC"], false).unwrap();
        let single = Alignment::new(&["GAAAC"], false).unwrap();
        let both = context_for(&alignment);
        let one = context_for(&single);
        assert_eq!(
            both.hairpin_energy(1, 5),
            one.hairpin_energy(1, 5) + SHORT_LOOP_PENALTY
        );
    }

    #[test]
    fn circular_quadruplex_is_rejected() {
        let alignment = Alignment::new(&["GAAAC"], true).unwrap();
        let model = ModelConfig {
            circular: true,
            quadruplex: true,
            ..ModelConfig::default()
        };
        assert!(matches!(
            FoldContext::new(&alignment, &model),
            Err(Error::CircularQuadruplex)
        ));
    }
}
