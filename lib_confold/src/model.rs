use crate::params::Energy;

/// Treatment of unpaired neighbors next to a helix end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DangleModel {
    /// Ignore unpaired neighbors entirely.
    None,
    /// Score both neighbors of every stem as a terminal mismatch.
    #[default]
    Mismatch,
}

/// Which matrix the traceback starts from.
///
/// `Prefix` is the regular minimum-free-energy traceback. `ClosingPair` and
/// `Fragment` force the whole alignment to be interpreted as a closed pair or
/// as a multiloop fragment, for callers that embed the result into a larger
/// decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BacktrackType {
    #[default]
    Prefix,
    ClosingPair,
    Fragment,
}

/// Geometry bounds for quadruplex motif detection.
///
/// A quadruplex consists of four runs of `stack` consecutive consensus
/// guanines separated by three linkers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuadBounds {
    pub min_stack: usize,
    pub max_stack: usize,
    pub min_linker: usize,
    pub max_linker: usize,
}

impl QuadBounds {
    /// Smallest number of columns a quadruplex can occupy.
    pub fn min_box_size(&self) -> usize {
        4 * self.min_stack + 3 * self.min_linker
    }

    /// Largest number of columns a quadruplex can occupy.
    pub fn max_box_size(&self) -> usize {
        4 * self.max_stack + 3 * self.max_linker
    }
}

impl Default for QuadBounds {
    fn default() -> Self {
        Self {
            min_stack: 2,
            max_stack: 7,
            min_linker: 1,
            max_linker: 15,
        }
    }
}

/// Model configuration shared read-only by all folds using it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelConfig {
    pub temperature: f64,
    pub dangles: DangleModel,
    /// Treat the alignment as circular and evaluate the wrap-around closing
    /// step.
    pub circular: bool,
    /// Enable the quadruplex-motif decomposition.
    pub quadruplex: bool,
    /// Disallow base pairs that are not immediately stacked on another pair.
    pub no_lonely_pairs: bool,
    /// Allow GU/UG wobble pairs.
    pub wobble_pairs: bool,
    /// Maximum allowed span `j - i` of a base pair, `None` for unbounded.
    pub max_pair_span: Option<usize>,
    /// Column pairs scoring below this are never considered for pairing.
    pub min_pair_score: Energy,
    /// Weight of the compensatory-mutation bonus.
    pub covariance_factor: f64,
    /// Weight of the penalty for sequences that cannot form a pair.
    pub non_compatible_factor: f64,
    pub backtrack_type: BacktrackType,
    pub quad_bounds: QuadBounds,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            temperature: 37.0,
            dangles: DangleModel::default(),
            circular: false,
            quadruplex: false,
            no_lonely_pairs: false,
            wobble_pairs: true,
            max_pair_span: None,
            min_pair_score: -200,
            covariance_factor: 1.0,
            non_compatible_factor: 1.0,
            backtrack_type: BacktrackType::default(),
            quad_bounds: QuadBounds::default(),
        }
    }
}
