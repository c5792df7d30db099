use log::trace;

use crate::{
    context::FoldContext,
    gquad::{find_quad_geometry, host_loop_admissible},
    matrices::{CircularDecomposition, FoldMatrices},
    model::BacktrackType,
    params::{is_impossible, Energy, MAX_INTERIOR_UNPAIRED, MIN_LOOP_SIZE},
    structure::BasePair,
};

/// What a work-stack item asks the tracer to reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TraceMode {
    /// A prefix 1..=j of the exterior loop.
    Prefix,
    /// A multiloop fragment (i, j).
    Fragment,
    /// A closed pair (i, j).
    Pair,
}

#[derive(Debug, Clone, Copy)]
struct TraceItem {
    i: usize,
    j: usize,
    mode: TraceMode,
}

/// Recovers one optimal structure from the filled matrices.
///
/// The caller must make sure the traced cell is feasible. A cell value the
/// tracer cannot reproduce from the recursion is an internal inconsistency
/// and panics.
pub fn backtrack(context: &FoldContext, matrices: &FoldMatrices) -> Vec<BasePair> {
    let n = context.n();
    let mut pairs = Vec::new();
    let mut stack = Vec::new();

    if n <= MIN_LOOP_SIZE {
        return pairs;
    }

    if let Some(circular) = matrices.circular {
        match circular.decomposition {
            CircularDecomposition::Open => return pairs,
            CircularDecomposition::Hairpin { i, j } => stack.push(TraceItem {
                i,
                j,
                mode: TraceMode::Pair,
            }),
            CircularDecomposition::InteriorLoop { i, j, p, q } => {
                stack.push(TraceItem {
                    i,
                    j,
                    mode: TraceMode::Pair,
                });
                stack.push(TraceItem {
                    i: p,
                    j: q,
                    mode: TraceMode::Pair,
                });
            }
            CircularDecomposition::Multiloop { k, u } => {
                stack.push(TraceItem {
                    i: 1,
                    j: k,
                    mode: TraceMode::Fragment,
                });
                stack.push(TraceItem {
                    i: k + 1,
                    j: u,
                    mode: TraceMode::Fragment,
                });
                stack.push(TraceItem {
                    i: u + 1,
                    j: n,
                    mode: TraceMode::Fragment,
                });
            }
        }
    } else {
        let mode = match context.model.backtrack_type {
            BacktrackType::Prefix => TraceMode::Prefix,
            BacktrackType::ClosingPair => TraceMode::Pair,
            BacktrackType::Fragment => TraceMode::Fragment,
        };
        stack.push(TraceItem { i: 1, j: n, mode });
    }

    while let Some(TraceItem { i, j, mode }) = stack.pop() {
        trace!("tracing ({i}, {j}) as {mode:?}");
        match mode {
            TraceMode::Prefix => trace_prefix(context, matrices, j, &mut pairs, &mut stack),
            TraceMode::Fragment => {
                trace_fragment(context, matrices, i, j, &mut pairs, &mut stack)
            }
            TraceMode::Pair => trace_pair(context, matrices, i, j, &mut pairs, &mut stack),
        }
    }

    pairs.sort_unstable_by_key(|pair| pair.i);
    pairs
}

fn trace_prefix(
    context: &FoldContext,
    matrices: &FoldMatrices,
    mut j: usize,
    pairs: &mut Vec<BasePair>,
    stack: &mut Vec<TraceItem>,
) {
    'prefix: loop {
        if j <= MIN_LOOP_SIZE + 1 {
            return;
        }
        if matrices.prefix[j] == matrices.prefix[j - 1] {
            j -= 1;
            continue;
        }
        let target = matrices.prefix[j];
        for k in (1..=j - MIN_LOOP_SIZE - 1).rev() {
            let cell = context.index.at(k, j);
            let outside = matrices.prefix[k - 1];
            if let Some(quad) = &matrices.quad {
                if !is_impossible(quad[cell]) && target == outside + quad[cell] {
                    trace_quad(context, k, j, quad[cell], pairs);
                    j = k - 1;
                    continue 'prefix;
                }
            }
            if !is_impossible(matrices.closing[cell])
                && target
                    == outside + matrices.closing[cell] + context.exterior_stem_energy(k, j)
            {
                stack.push(TraceItem {
                    i: k,
                    j,
                    mode: TraceMode::Pair,
                });
                j = k - 1;
                continue 'prefix;
            }
        }
        panic!("backtracking failed in the prefix matrix at column {j}");
    }
}

fn trace_fragment(
    context: &FoldContext,
    matrices: &FoldMatrices,
    mut i: usize,
    mut j: usize,
    pairs: &mut Vec<BasePair>,
    stack: &mut Vec<TraceItem>,
) {
    let n_seq = context.n_seq() as Energy;
    let unpaired = n_seq * context.params.ml_base;
    loop {
        let cell = context.index.at(i, j);
        let target = matrices.fragment[cell];

        if target == matrices.fragment[context.index.at(i + 1, j)] + unpaired {
            i += 1;
            continue;
        }
        if target == matrices.fragment[context.index.at(i, j - 1)] + unpaired {
            j -= 1;
            continue;
        }
        if !is_impossible(matrices.closing[cell])
            && target == matrices.closing[cell] + context.multi_stem_energy(i, j)
        {
            stack.push(TraceItem {
                i,
                j,
                mode: TraceMode::Pair,
            });
            return;
        }
        if let Some(quad) = &matrices.quad {
            if !is_impossible(quad[cell])
                && target == quad[cell] + n_seq * context.params.multi_stem(0, -1, -1)
            {
                trace_quad(context, i, j, quad[cell], pairs);
                return;
            }
        }
        for k in i + 1 + MIN_LOOP_SIZE..=j.saturating_sub(2 + MIN_LOOP_SIZE) {
            if target
                == matrices.fragment[context.index.at(i, k)]
                    + matrices.fragment[context.index.at(k + 1, j)]
            {
                stack.push(TraceItem {
                    i,
                    j: k,
                    mode: TraceMode::Fragment,
                });
                stack.push(TraceItem {
                    i: k + 1,
                    j,
                    mode: TraceMode::Fragment,
                });
                return;
            }
        }
        panic!("backtracking failed in the fragment matrix at ({i}, {j})");
    }
}

fn trace_pair(
    context: &FoldContext,
    matrices: &FoldMatrices,
    mut i: usize,
    mut j: usize,
    pairs: &mut Vec<BasePair>,
    stack: &mut Vec<TraceItem>,
) {
    let mut cij = 0;
    let mut canonical = true;
    'pair: loop {
        if canonical {
            cij = matrices.closing[context.index.at(i, j)];
        }

        if context.model.no_lonely_pairs && cij == matrices.closing[context.index.at(i, j)] {
            // the stored value is always the stack on the inner pair; undo
            // it and descend with the unrestricted inner value
            pairs.push(BasePair { i, j });
            cij = cij - context.interior_energy(i, j, i + 1, j - 1) + context.pscore(i, j);
            i += 1;
            j -= 1;
            canonical = false;
            continue;
        }
        canonical = true;
        pairs.push(BasePair { i, j });
        // remove the covariance bonus, leaving the pure loop minimum
        cij += context.pscore(i, j);

        if cij == context.hairpin_energy(i, j) {
            return;
        }

        let max_p = (j - 2 - MIN_LOOP_SIZE).min(i + MAX_INTERIOR_UNPAIRED + 1);
        for p in i + 1..=max_p {
            let min_q = (p + 1 + MIN_LOOP_SIZE)
                .max((j + p).saturating_sub(i + MAX_INTERIOR_UNPAIRED + 2));
            for q in (min_q..j).rev() {
                if !context.pairable(p, q) {
                    continue;
                }
                let inner = matrices.closing[context.index.at(p, q)];
                if is_impossible(inner) {
                    continue;
                }
                if cij == context.interior_energy(i, j, p, q) + inner {
                    i = p;
                    j = q;
                    continue 'pair;
                }
            }
        }

        if let Some(quad) = &matrices.quad {
            let min_span = context.model.quad_bounds.min_box_size();
            for p in i + 1..j {
                let u1 = p - i - 1;
                if u1 + 2 > MAX_INTERIOR_UNPAIRED || p + min_span > j {
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
                    if cij == energy + context.quad_host_energy(i, j, u1, u2) {
                        trace_quad(context, p, q, energy, pairs);
                        return;
                    }
                }
            }
        }

        let rest = cij - context.multi_close_energy(i, j);
        for k in i + 2 + MIN_LOOP_SIZE..=j.saturating_sub(3 + MIN_LOOP_SIZE) {
            if rest
                == matrices.fragment[context.index.at(i + 1, k)]
                    + matrices.fragment[context.index.at(k + 1, j - 1)]
            {
                stack.push(TraceItem {
                    i: i + 1,
                    j: k,
                    mode: TraceMode::Fragment,
                });
                stack.push(TraceItem {
                    i: k + 1,
                    j: j - 1,
                    mode: TraceMode::Fragment,
                });
                return;
            }
        }

        panic!("backtracking failed for the pair ({i}, {j})");
    }
}

fn trace_quad(
    context: &FoldContext,
    i: usize,
    j: usize,
    target: Energy,
    pairs: &mut Vec<BasePair>,
) {
    match find_quad_geometry(context, i, j, target) {
        Some(geometry) => {
            for column in geometry.tetrad_columns(i) {
                pairs.push(BasePair {
                    i: column,
                    j: column,
                });
            }
        }
        None => panic!("backtracking failed in the quadruplex matrix at ({i}, {j})"),
    }
}
