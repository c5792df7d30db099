use crate::{
    context::FoldContext,
    error::{Error, Result},
    gquad::{host_loop_admissible, quad_energy},
    model::BacktrackType,
    params::Energy,
    structure::{pairing_table, parse_quads, QuadMotif},
};

/// Energy of a fixed structure on an alignment, split into the channel the
/// thermodynamic model contributes and the channel the covariance scores
/// contribute. The value the fold minimizes is `total()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureEnergy {
    /// Summed loop energies over all sequences.
    pub structural: Energy,
    /// Summed covariance bonuses of all closing pairs and quadruplexes.
    pub covariance: Energy,
}

impl StructureEnergy {
    pub fn total(&self) -> Energy {
        self.structural - self.covariance
    }
}

/// Evaluates a dot-bracket structure (with `+` for quadruplex tetrads) on
/// the context's alignment.
///
/// The exterior loop is interpreted according to the model's backtrack type,
/// so the result is directly comparable with the corresponding matrix cell.
pub fn structure_energy(context: &FoldContext, structure: &str) -> Result<StructureEnergy> {
    let n = context.n();
    if structure.len() != n {
        return Err(Error::LengthMismatch {
            expected: n,
            found: structure.len(),
        });
    }

    let table = pairing_table(structure)?;
    let motifs = parse_quads(structure)?;

    let mut structural = exterior_energy(context, &table);
    let mut column = 1;
    while column <= n {
        let partner = table[column];
        if partner > column {
            structural += stack_walk(context, &table, column);
            column = partner + 1;
        } else {
            column += 1;
        }
    }
    structural += quad_correction(context, &table, &motifs);

    let mut covariance = 0;
    for (i, &partner) in table.iter().enumerate().skip(1) {
        if partner > i {
            covariance += context.pscore(i, partner);
        }
    }
    for motif in &motifs {
        covariance += quad_energy(context, motif.start, &motif.geometry).covariance;
    }

    Ok(StructureEnergy {
        structural,
        covariance,
    })
}

/// Direct branches (u, table[u]) of the loop between columns i and j,
/// exclusive, plus the number of unpaired columns between them.
fn direct_branches(table: &[usize], i: usize, j: usize) -> (Vec<(usize, usize)>, usize) {
    let mut branches = Vec::new();
    let mut unpaired = 0;
    let mut u = i + 1;
    while u < j {
        if table[u] > u {
            branches.push((u, table[u]));
            u = table[u] + 1;
        } else {
            unpaired += 1;
            u += 1;
        }
    }
    (branches, unpaired)
}

/// Contribution of the exterior loop, per the model's backtrack type.
fn exterior_energy(context: &FoldContext, table: &[usize]) -> Energy {
    let n = table[0];
    let (branches, unpaired) = direct_branches(table, 0, n + 1);
    let mut energy = 0;
    match context.model.backtrack_type {
        BacktrackType::Prefix => {
            for &(i, j) in &branches {
                energy += context.exterior_stem_energy(i, j);
            }
        }
        BacktrackType::Fragment => {
            for &(i, j) in &branches {
                energy += context.multi_stem_energy(i, j);
            }
            energy += context.params.ml_base * context.n_seq() as Energy * unpaired as Energy;
        }
        // the traced cell is the closing-pair energy itself, which carries
        // no exterior term
        BacktrackType::ClosingPair => {}
    }
    energy
}

/// Loop energies of the substructure enclosed by the pair starting at `i`,
/// descending through stacks and interior loops first.
fn stack_walk(context: &FoldContext, table: &[usize], mut i: usize) -> Energy {
    let mut j = table[i];
    let mut energy = 0;

    loop {
        let (branches, _) = direct_branches(table, i, j);
        match branches.len() {
            0 => {
                energy += context.hairpin_energy(i, j);
                return energy;
            }
            1 => {
                let (p, q) = branches[0];
                energy += context.interior_energy(i, j, p, q);
                i = p;
                j = q;
            }
            _ => {
                energy += multiloop_energy(context, table, i, j);
                for (p, _) in branches {
                    energy += stack_walk(context, table, p);
                }
                return energy;
            }
        }
    }
}

/// Energy of the multiloop closed by (i, j), stems and unpaired columns
/// included, substructures of the branches excluded.
fn multiloop_energy(context: &FoldContext, table: &[usize], i: usize, j: usize) -> Energy {
    let (branches, unpaired) = direct_branches(table, i, j);
    let mut energy = context.multi_close_energy(i, j)
        + context.params.ml_base * context.n_seq() as Energy * unpaired as Energy;
    for &(p, q) in &branches {
        energy += context.multi_stem_energy(p, q);
    }
    energy
}

/// Innermost pair enclosing column `p`, if any.
fn enclosing_pair(table: &[usize], p: usize) -> Option<(usize, usize)> {
    let mut k = p;
    while k > 1 {
        k -= 1;
        if table[k] == 0 {
            continue;
        }
        if table[k] < k {
            // a complete sibling, skip it
            k = table[k];
            continue;
        }
        return Some((k, table[k]));
    }
    None
}

/// Corrects the loop energies around quadruplex motifs.
///
/// The pairing-table walk sees tetrad columns as unpaired, so every loop
/// hosting a motif was scored as the wrong loop type: a pair enclosing only
/// a motif as a hairpin, a pair enclosing a motif next to one branch as an
/// interior loop, and motifs in multiloops and the exterior as plain
/// unpaired stretches. This pass subtracts the misread energies and adds
/// the quadruplex decomposition the recursion uses.
fn quad_correction(context: &FoldContext, table: &[usize], motifs: &[QuadMotif]) -> Energy {
    let n_seq = context.n_seq() as Energy;
    let ml_quad_stem = n_seq * context.params.multi_stem(0, -1, -1);
    let mut correction = 0;

    // group the motifs by their innermost enclosing pair
    let mut groups: Vec<(Option<(usize, usize)>, Vec<&QuadMotif>)> = Vec::new();
    for motif in motifs {
        let host = enclosing_pair(table, motif.start);
        match groups.iter_mut().find(|(pair, _)| *pair == host) {
            Some((_, members)) => members.push(motif),
            None => groups.push((host, vec![motif])),
        }
    }

    for (host, members) in groups {
        let quad_columns: usize = members.iter().map(|motif| motif.geometry.span()).sum();
        // only the structural channel; the tetrad mismatch penalties are
        // booked as negative covariance by the caller
        let mut motif_structural = 0;
        for motif in &members {
            motif_structural += quad_energy(context, motif.start, &motif.geometry).structural;
        }

        match host {
            None => {
                correction += motif_structural;
                if context.model.backtrack_type == BacktrackType::Fragment {
                    correction += ml_quad_stem * members.len() as Energy
                        - n_seq * context.params.ml_base * quad_columns as Energy;
                }
            }
            Some((i, j)) => {
                let (branches, unpaired) = direct_branches(table, i, j);
                if branches.is_empty() && members.len() == 1 {
                    // the walk misread the loop as a hairpin
                    let motif = members[0];
                    let u1 = motif.start - i - 1;
                    let u2 = j - motif.end() - 1;
                    correction -= context.hairpin_energy(i, j);
                    if host_loop_admissible(u1, u2) {
                        correction += motif_structural + context.quad_host_energy(i, j, u1, u2);
                    } else {
                        // geometry the recursion cannot produce, score it as
                        // a multiloop with a single quadruplex stem
                        correction += motif_structural
                            + ml_quad_stem
                            + context.multi_close_energy(i, j)
                            + n_seq
                                * context.params.ml_base
                                * (unpaired - quad_columns) as Energy;
                    }
                } else {
                    // the loop is really a multiloop with quadruplex stems
                    let misread = match branches.len() {
                        0 => context.hairpin_energy(i, j),
                        1 => {
                            let (p, q) = branches[0];
                            context.interior_energy(i, j, p, q)
                        }
                        _ => multiloop_energy(context, table, i, j),
                    };
                    correction -= misread;
                    correction += motif_structural
                        + ml_quad_stem * members.len() as Energy
                        + context.multi_close_energy(i, j)
                        + n_seq
                            * context.params.ml_base
                            * (unpaired - quad_columns) as Energy;
                    for &(p, q) in &branches {
                        correction += context.multi_stem_energy(p, q);
                    }
                }
            }
        }
    }

    correction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        alignment::Alignment, gquad::QuadGeometry, model::ModelConfig,
        params::SHORT_LOOP_PENALTY,
    };

    #[test]
    fn open_chain_scores_zero() {
        let alignment = Alignment::new(&["GAAAC", "GAAAC"], false).unwrap();
        let context = FoldContext::new(&alignment, &ModelConfig::default()).unwrap();
        let energy = structure_energy(&context, ".....").unwrap();
        assert_eq!(energy.structural, 0);
        assert_eq!(energy.covariance, 0);
    }

    #[test]
    fn single_hairpin_matches_the_loop_sum() {
        let alignment = Alignment::new(&["GGAAACC", "GGAAACC"], false).unwrap();
        let context = FoldContext::new(&alignment, &ModelConfig::default()).unwrap();
        let energy = structure_energy(&context, "((...))").unwrap();
        let expected = context.exterior_stem_energy(1, 7)
            + context.interior_energy(1, 7, 2, 6)
            + context.hairpin_energy(2, 6);
        assert_eq!(energy.structural, expected);
        assert_eq!(energy.covariance, context.pscore(1, 7) + context.pscore(2, 6));
    }

    #[test]
    fn rejects_wrong_length() {
        let alignment = Alignment::new(&["GAAAC"], false).unwrap();
        let context = FoldContext::new(&alignment, &ModelConfig::default()).unwrap();
        assert!(matches!(
            structure_energy(&context, "..."),
            Err(Error::LengthMismatch { .. })
        ));
    }

    #[test]
    fn short_ungapped_hairpins_use_the_fixed_penalty() {
        let alignment = Alignment::new(&["GAA-C"], false).unwrap();
        let context = FoldContext::new(&alignment, &ModelConfig::default()).unwrap();
        let energy = structure_energy(&context, "(...)").unwrap();
        assert_eq!(energy.structural, SHORT_LOOP_PENALTY);
    }

    #[test]
    fn exterior_loop_sums_its_stems() {
        let alignment = Alignment::new(&["GGAAACCGGAAACCA"], false).unwrap();
        let context = FoldContext::new(&alignment, &ModelConfig::default()).unwrap();
        // no outer pair: two hairpins in the exterior loop
        let energy = structure_energy(&context, "((...))((...)).").unwrap();
        let expected = context.exterior_stem_energy(1, 7)
            + context.exterior_stem_energy(8, 14)
            + context.interior_energy(1, 7, 2, 6)
            + context.interior_energy(8, 14, 9, 13)
            + context.hairpin_energy(2, 6)
            + context.hairpin_energy(9, 13);
        assert_eq!(energy.structural, expected);
    }

    #[test]
    fn tetrad_mismatches_stay_out_of_the_structural_channel() {
        let alignment = Alignment::new(&["GGAGGAGGAGG", "AGAGGAGGAGG"], false).unwrap();
        let model = ModelConfig {
            quadruplex: true,
            ..ModelConfig::default()
        };
        let context = FoldContext::new(&alignment, &model).unwrap();
        let energy = structure_energy(&context, "++.++.++.++").unwrap();
        let motif = quad_energy(
            &context,
            1,
            &QuadGeometry {
                stack: 2,
                linkers: [1, 1, 1],
            },
        );
        assert_eq!(energy.structural, motif.structural);
        assert_eq!(energy.covariance, motif.covariance);
        assert_eq!(energy.total(), motif.total);
    }

    #[test]
    fn exterior_quadruplex_adds_its_total() {
        let alignment = Alignment::new(&["GGAGGAGGAGG"], false).unwrap();
        let model = ModelConfig {
            quadruplex: true,
            ..ModelConfig::default()
        };
        let context = FoldContext::new(&alignment, &model).unwrap();
        let energy = structure_energy(&context, "++.++.++.++").unwrap();
        let expected = context.params.quad_stack(2, 3);
        assert_eq!(energy.total(), expected);
    }
}
