use crate::params::{Energy, INF};

/// Linear index into the upper triangle of a column-pair matrix.
///
/// Cell (i, j) with `1 <= i <= j <= n` lives at `offset(j) + i`; the offsets
/// are precomputed once per fold.
#[derive(Debug, Clone)]
pub struct TriIndex {
    offsets: Vec<usize>,
}

impl TriIndex {
    pub fn new(n: usize) -> Self {
        let offsets = (0..=n).map(|j| j * j.saturating_sub(1) / 2).collect();
        Self { offsets }
    }

    #[inline]
    pub fn at(&self, i: usize, j: usize) -> usize {
        debug_assert!(1 <= i && i <= j && j < self.offsets.len());
        self.offsets[j] + i
    }

    /// Number of cells a triangular matrix over `n` columns needs.
    pub fn len(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0) + self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.len() <= 1
    }
}

/// How the optimal circular fold decomposes at the wrap-around loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircularDecomposition {
    /// The open chain is optimal.
    Open,
    /// A single pair whose outside forms a hairpin-like wrap loop.
    Hairpin { i: usize, j: usize },
    /// Two pairs whose outsides form an interior-like wrap loop.
    InteriorLoop {
        i: usize,
        j: usize,
        p: usize,
        q: usize,
    },
    /// A wrap multiloop split into the fragments (1, k), (k+1, u), (u+1, n).
    Multiloop { k: usize, u: usize },
}

/// Result of the wrap-around pass of a circular fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircularFold {
    pub total: Energy,
    pub decomposition: CircularDecomposition,
}

/// The dynamic-programming matrices of one fold.
///
/// `closing` holds the best energy of the segment (i, j) given that the two
/// columns pair; `fragment` the best energy of (i, j) as a multiloop fragment
/// with at least one stem; `prefix` the best energy of the prefix 1..=j. The
/// quadruplex matrix is only allocated when the motif decomposition is
/// enabled, the circular part only for circular folds.
#[derive(Debug, Clone)]
pub struct FoldMatrices {
    pub closing: Vec<Energy>,
    pub fragment: Vec<Energy>,
    pub prefix: Vec<Energy>,
    pub quad: Option<Vec<Energy>>,
    pub circular: Option<CircularFold>,
}

impl FoldMatrices {
    pub fn new(n: usize, quadruplex: bool) -> Self {
        let cells = TriIndex::new(n).len();
        Self {
            closing: vec![INF; cells],
            fragment: vec![INF; cells],
            prefix: vec![0; n + 1],
            quad: quadruplex.then(|| vec![INF; cells]),
            circular: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangular_index_is_injective() {
        let n = 12;
        let index = TriIndex::new(n);
        let mut seen = vec![false; index.len()];
        for j in 1..=n {
            for i in 1..=j {
                let cell = index.at(i, j);
                assert!(!seen[cell]);
                seen[cell] = true;
            }
        }
    }

    #[test]
    fn matrices_start_impossible() {
        let matrices = FoldMatrices::new(5, true);
        assert!(matrices.closing.iter().all(|&e| e == INF));
        assert!(matrices.quad.is_some());
        assert_eq!(matrices.prefix.len(), 6);
    }
}
