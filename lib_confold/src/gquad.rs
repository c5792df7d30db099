use crate::{
    alignment::GUANINE,
    context::FoldContext,
    model::QuadBounds,
    params::{Energy, INF, MAX_INTERIOR_UNPAIRED},
};

/// Geometry of a quadruplex motif: four runs of `stack` tetrad columns
/// separated by three linkers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadGeometry {
    pub stack: usize,
    pub linkers: [usize; 3],
}

impl QuadGeometry {
    /// Number of columns the motif occupies.
    pub fn span(&self) -> usize {
        4 * self.stack + self.linkers.iter().sum::<usize>()
    }

    /// First column of each of the four runs, for a motif starting at `i`.
    pub fn run_starts(&self, i: usize) -> [usize; 4] {
        let [l0, l1, l2] = self.linkers;
        [
            i,
            i + self.stack + l0,
            i + 2 * self.stack + l0 + l1,
            i + 3 * self.stack + l0 + l1 + l2,
        ]
    }

    /// All tetrad columns of a motif starting at `i`, in order.
    pub fn tetrad_columns(&self, i: usize) -> Vec<usize> {
        self.run_starts(i)
            .iter()
            .flat_map(|&start| start..start + self.stack)
            .collect()
    }
}

/// Energy of one quadruplex, split into the channels the evaluator reports.
///
/// `total` is what the recursion minimizes over and always satisfies
/// `total == structural - covariance`: sequences that cannot place a guanine
/// in a tetrad position pay a penalty which is booked as negative covariance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadEnergy {
    pub total: Energy,
    pub structural: Energy,
    pub covariance: Energy,
}

/// Whether a closing pair may host a quadruplex with `u1` unpaired columns
/// on its 5' side and `u2` on its 3' side. A motif flush against the pair on
/// one side needs at least three unpaired columns on the other.
pub fn host_loop_admissible(u1: usize, u2: usize) -> bool {
    match (u1, u2) {
        _ if u1 + u2 > MAX_INTERIOR_UNPAIRED => false,
        (0, u) | (u, 0) => u >= 3,
        _ => true,
    }
}

/// Whether every tetrad column of the motif carries a consensus guanine.
pub fn geometry_fits(context: &FoldContext, i: usize, geometry: &QuadGeometry) -> bool {
    let j = i + geometry.span() - 1;
    if j > context.n() {
        return false;
    }
    geometry
        .tetrad_columns(i)
        .iter()
        .all(|&column| context.alignment.consensus[column] == GUANINE)
}

/// Summed energy of a quadruplex motif starting at column `i`.
pub fn quad_energy(context: &FoldContext, i: usize, geometry: &QuadGeometry) -> QuadEnergy {
    let linker_total = geometry.linkers.iter().sum::<usize>();
    let structural = context.n_seq() as Energy
        * context.params.quad_stack(geometry.stack, linker_total);

    let mut penalty = 0;
    for sequence in &context.alignment.sequences {
        for column in geometry.tetrad_columns(i) {
            if sequence.codes[column] != GUANINE {
                penalty += context.params.quad_mismatch;
            }
        }
    }

    QuadEnergy {
        total: structural + penalty,
        structural,
        covariance: -penalty,
    }
}

fn geometries(bounds: QuadBounds, span: usize) -> impl Iterator<Item = QuadGeometry> {
    (bounds.min_stack..=bounds.max_stack).flat_map(move |stack| {
        (bounds.min_linker..=bounds.max_linker).flat_map(move |l0| {
            (bounds.min_linker..=bounds.max_linker).filter_map(move |l1| {
                let fixed = 4 * stack + l0 + l1;
                let l2 = span.checked_sub(fixed)?;
                (bounds.min_linker..=bounds.max_linker)
                    .contains(&l2)
                    .then_some(QuadGeometry {
                        stack,
                        linkers: [l0, l1, l2],
                    })
            })
        })
    })
}

/// Fills the quadruplex matrix: the best total quadruplex energy of every
/// column range, [`INF`] where no admissible geometry exists.
pub fn quad_matrix(context: &FoldContext) -> Vec<Energy> {
    let n = context.n();
    let bounds = context.model.quad_bounds;
    let mut matrix = vec![INF; context.index.len()];

    for span in bounds.min_box_size()..=bounds.max_box_size().min(n) {
        for i in 1..=n + 1 - span {
            let j = i + span - 1;
            let cell = context.index.at(i, j);
            for geometry in geometries(bounds, span) {
                if geometry_fits(context, i, &geometry) {
                    let energy = quad_energy(context, i, &geometry).total;
                    if energy < matrix[cell] {
                        matrix[cell] = energy;
                    }
                }
            }
        }
    }
    matrix
}

/// Recovers a geometry of the range (i, j) whose total energy matches the
/// matrix cell that is being traced back.
pub fn find_quad_geometry(
    context: &FoldContext,
    i: usize,
    j: usize,
    target: Energy,
) -> Option<QuadGeometry> {
    geometries(context.model.quad_bounds, j + 1 - i).find(|geometry| {
        geometry_fits(context, i, geometry)
            && quad_energy(context, i, geometry).total == target
    })
}
