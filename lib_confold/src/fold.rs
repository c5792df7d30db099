use log::debug;

use crate::{
    backtrack::backtrack,
    context::FoldContext,
    error::Result,
    gquad::{host_loop_admissible, quad_energy, quad_matrix},
    matrices::{CircularDecomposition, CircularFold, FoldMatrices},
    model::BacktrackType,
    params::{is_impossible, Energy, INF, MAX_INTERIOR_UNPAIRED, MIN_LOOP_SIZE},
    structure::{dot_bracket, parse_quads, BasePair},
};

/// A folded consensus structure with its energies in per-sequence kcal/mol.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusStructure {
    pub structure: String,
    pub pairs: Vec<BasePair>,
    /// Minimum free energy, covariance contribution included.
    pub energy: f64,
    /// Covariance contribution alone; `energy + covariance` is the averaged
    /// thermodynamic part.
    pub covariance: f64,
}

/// Fills all dynamic-programming matrices for the given context.
pub fn fill_matrices(context: &FoldContext) -> FoldMatrices {
    let n = context.n();
    let n_seq = context.n_seq() as Energy;
    let mut matrices = FoldMatrices::new(n, context.model.quadruplex);
    if context.model.quadruplex {
        matrices.quad = Some(quad_matrix(context));
    }
    if n <= MIN_LOOP_SIZE {
        if context.model.circular {
            matrices.circular = Some(CircularFold {
                total: 0,
                decomposition: CircularDecomposition::Open,
            });
        }
        return matrices;
    }

    // rolling rows: cc/cc1 hold the unrestricted closing energies of the
    // current and previous row for the lonely-pair restriction, fmi the
    // current fragment row, dmli/dmli1 the best two-fragment splits
    let mut cc = vec![INF; n + 2];
    let mut cc1 = vec![INF; n + 2];
    let mut fmi = vec![INF; n + 2];
    let mut dmli = vec![INF; n + 2];
    let mut dmli1 = vec![INF; n + 2];

    for i in (1..=n - MIN_LOOP_SIZE - 1).rev() {
        for j in i + MIN_LOOP_SIZE + 1..=n {
            let ij = context.index.at(i, j);
            let mut stack_energy = INF;

            if context.pairable(i, j) {
                let psc = context.pscore(i, j);
                let mut new_c = context.hairpin_energy(i, j);

                let max_p = (j - 2 - MIN_LOOP_SIZE).min(i + MAX_INTERIOR_UNPAIRED + 1);
                for p in i + 1..=max_p {
                    let min_q = (p + 1 + MIN_LOOP_SIZE)
                        .max((j + p).saturating_sub(i + MAX_INTERIOR_UNPAIRED + 2));
                    for q in min_q..j {
                        if !context.pairable(p, q) {
                            continue;
                        }
                        let energy = context.interior_energy(i, j, p, q);
                        if p == i + 1 && q == j - 1 {
                            stack_energy = energy;
                        }
                        new_c =
                            new_c.min(energy + matrices.closing[context.index.at(p, q)]);
                    }
                }

                if !is_impossible(dmli1[j - 1]) {
                    new_c = new_c.min(dmli1[j - 1] + context.multi_close_energy(i, j));
                }

                if let Some(quad) = &matrices.quad {
                    let min_span = context.model.quad_bounds.min_box_size();
                    for p in i + 1..j {
                        let u1 = p - i - 1;
                        if u1 + 2 > MAX_INTERIOR_UNPAIRED {
                            break;
                        }
                        if p + min_span > j {
                            break;
                        }
                        for q in p + min_span - 1..j {
                            let u2 = j - 1 - q;
                            if !host_loop_admissible(u1, u2) {
                                continue;
                            }
                            let energy = quad[context.index.at(p, q)];
                            if is_impossible(energy) {
                                continue;
                            }
                            new_c =
                                new_c.min(energy + context.quad_host_energy(i, j, u1, u2));
                        }
                    }
                }

                if context.model.no_lonely_pairs {
                    // only the stack on the (possibly non-canonical) inner
                    // pair survives; cc keeps the unrestricted value so the
                    // helix below can still end in any loop
                    new_c = new_c.min(cc1[j - 1] + stack_energy);
                    cc[j] = new_c - psc;
                    matrices.closing[ij] = cc1[j - 1] + stack_energy - psc;
                } else {
                    matrices.closing[ij] = new_c - psc;
                }
            }

            let mut new_fml = matrices.fragment[context.index.at(i + 1, j)]
                + n_seq * context.params.ml_base;
            new_fml = new_fml.min(
                matrices.fragment[context.index.at(i, j - 1)]
                    + n_seq * context.params.ml_base,
            );
            if !is_impossible(matrices.closing[ij]) {
                new_fml =
                    new_fml.min(matrices.closing[ij] + context.multi_stem_energy(i, j));
            }
            if let Some(quad) = &matrices.quad {
                if !is_impossible(quad[ij]) {
                    new_fml =
                        new_fml.min(quad[ij] + n_seq * context.params.multi_stem(0, -1, -1));
                }
            }

            let mut decomp = INF;
            for k in i + 1 + MIN_LOOP_SIZE..=j.saturating_sub(2 + MIN_LOOP_SIZE) {
                decomp = decomp.min(fmi[k] + matrices.fragment[context.index.at(k + 1, j)]);
            }
            dmli[j] = decomp;
            new_fml = new_fml.min(decomp);
            matrices.fragment[ij] = new_fml;
            fmi[j] = new_fml;
        }

        std::mem::swap(&mut cc, &mut cc1);
        std::mem::swap(&mut dmli, &mut dmli1);
        cc.fill(INF);
        dmli.fill(INF);
        fmi.fill(INF);
    }

    for j in MIN_LOOP_SIZE + 2..=n {
        let mut best = matrices.prefix[j - 1];
        for k in 1..=j - MIN_LOOP_SIZE - 1 {
            let cell = context.index.at(k, j);
            let outside = matrices.prefix[k - 1];
            if !is_impossible(matrices.closing[cell]) {
                best = best.min(
                    outside + matrices.closing[cell] + context.exterior_stem_energy(k, j),
                );
            }
            if let Some(quad) = &matrices.quad {
                if !is_impossible(quad[cell]) {
                    best = best.min(outside + quad[cell]);
                }
            }
        }
        matrices.prefix[j] = best;
    }

    if context.model.circular {
        matrices.circular = Some(fill_circular(context, &matrices));
    }

    debug!(
        "filled matrices over {n} columns, {} sequences",
        context.n_seq()
    );
    matrices
}

/// Evaluates the wrap-around loop of a circular fold on top of the filled
/// linear matrices and records the winning decomposition for the traceback.
fn fill_circular(context: &FoldContext, matrices: &FoldMatrices) -> CircularFold {
    let n = context.n();
    let n_seq = context.n_seq() as Energy;
    let mut best = CircularFold {
        total: 0,
        decomposition: CircularDecomposition::Open,
    };

    for i in 1..n {
        for j in i + MIN_LOOP_SIZE + 1..=n {
            let cij = matrices.closing[context.index.at(i, j)];
            if is_impossible(cij) {
                continue;
            }

            if n - j + i - 1 >= MIN_LOOP_SIZE {
                let energy = cij + context.exterior_hairpin_energy(i, j);
                if energy < best.total {
                    best = CircularFold {
                        total: energy,
                        decomposition: CircularDecomposition::Hairpin { i, j },
                    };
                }
            }

            for p in j + 1..n {
                let u1 = p - j - 1;
                if u1 + i - 1 > MAX_INTERIOR_UNPAIRED {
                    break;
                }
                let min_q = (p + MIN_LOOP_SIZE + 1)
                    .max((u1 + i - 1 + n).saturating_sub(MAX_INTERIOR_UNPAIRED));
                for q in min_q..=n {
                    let cpq = matrices.closing[context.index.at(p, q)];
                    if is_impossible(cpq) {
                        continue;
                    }
                    let u2 = i - 1 + n - q;
                    if u1 + u2 > MAX_INTERIOR_UNPAIRED {
                        continue;
                    }
                    let energy = cij + cpq + context.exterior_interior_energy(i, j, p, q);
                    if energy < best.total {
                        best = CircularFold {
                            total: energy,
                            decomposition: CircularDecomposition::InteriorLoop { i, j, p, q },
                        };
                    }
                }
            }
        }
    }

    // wrap multiloop with at least three stems: fragments (1, k), (k+1, u),
    // (u+1, n) and the closing penalty, but no closing pair
    let mut fm2 = vec![(INF, 0usize); n + 2];
    for i in 1..=n {
        for u in i + MIN_LOOP_SIZE + 1..=n.saturating_sub(MIN_LOOP_SIZE + 1) {
            let energy = matrices.fragment[context.index.at(i, u)]
                + matrices.fragment[context.index.at(u + 1, n)];
            if energy < fm2[i].0 {
                fm2[i] = (energy, u);
            }
        }
    }
    for k in MIN_LOOP_SIZE + 2..n {
        let (rest, u) = fm2[k + 1];
        if is_impossible(rest) {
            continue;
        }
        let first = matrices.fragment[context.index.at(1, k)];
        if is_impossible(first) {
            continue;
        }
        let energy = first + rest + n_seq * context.params.ml_closing;
        if energy < best.total {
            best = CircularFold {
                total: energy,
                decomposition: CircularDecomposition::Multiloop { k, u },
            };
        }
    }

    best
}

/// The minimum energy of the fold, still in summed deka-calories.
pub fn minimum_energy(context: &FoldContext, matrices: &FoldMatrices) -> Energy {
    if let Some(circular) = matrices.circular {
        return circular.total;
    }
    let n = context.n();
    if n <= MIN_LOOP_SIZE {
        return match context.model.backtrack_type {
            BacktrackType::Prefix => 0,
            BacktrackType::ClosingPair | BacktrackType::Fragment => INF,
        };
    }
    match context.model.backtrack_type {
        BacktrackType::Prefix => matrices.prefix[n],
        BacktrackType::ClosingPair => matrices.closing[context.index.at(1, n)],
        BacktrackType::Fragment => matrices.fragment[context.index.at(1, n)],
    }
}

/// Computes the minimum-free-energy consensus structure of the context's
/// alignment.
pub fn consensus_fold(context: &FoldContext) -> Result<ConsensusStructure> {
    let n = context.n();
    if n <= MIN_LOOP_SIZE {
        return Ok(ConsensusStructure {
            structure: ".".repeat(n),
            pairs: Vec::new(),
            energy: 0.0,
            covariance: 0.0,
        });
    }

    let matrices = fill_matrices(context);
    let total = minimum_energy(context, &matrices);
    if is_impossible(total) {
        debug!("no admissible structure for the requested traceback");
        return Ok(ConsensusStructure {
            structure: ".".repeat(n),
            pairs: Vec::new(),
            energy: context.scale(total),
            covariance: 0.0,
        });
    }

    let pairs = backtrack(context, &matrices);
    let structure = dot_bracket(&pairs, n);

    let mut covariance = 0;
    for pair in &pairs {
        if !pair.is_tetrad() {
            covariance += context.pscore(pair.i, pair.j);
        }
    }
    for motif in parse_quads(&structure)? {
        covariance += quad_energy(context, motif.start, &motif.geometry).covariance;
    }

    debug!("minimum free energy {}", context.scale(total));
    Ok(ConsensusStructure {
        structure,
        pairs,
        energy: context.scale(total),
        covariance: context.scale(covariance),
    })
}
