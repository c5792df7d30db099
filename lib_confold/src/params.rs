use crate::alignment::Symbol;

/// Free energies are carried as integer deka-calories per mole, summed over
/// all sequences of the alignment. Reported values are rescaled by
/// `1 / (n_seq * 100)` to per-sequence kcal/mol.
pub type Energy = i32;

/// Sentinel for decompositions that are not possible.
pub const INF: Energy = 10_000_000;

/// Minimum number of unpaired columns enclosed by a hairpin.
pub const MIN_LOOP_SIZE: usize = 3;

/// Maximum total number of unpaired bases in an interior loop.
pub const MAX_INTERIOR_UNPAIRED: usize = 30;

/// Fixed substitute for the hairpin energy of a sequence whose ungapped loop
/// is shorter than [`MIN_LOOP_SIZE`].
pub const SHORT_LOOP_PENALTY: Energy = 600;

/// Pair types 1..=6 are the canonical pairs, 7 is the non-standard catch-all.
pub const N_PAIR_TYPES: usize = 8;

const K0: f64 = 273.15;
const T37: f64 = 37.0 + K0;

/// Returns true if an energy value is the "impossible" sentinel, possibly
/// with bounded additive noise from sentinel arithmetic.
pub fn is_impossible(energy: Energy) -> bool {
    energy >= INF / 2
}

/// Temperature-scaled energy parameter table.
///
/// The 37 °C defaults below are representative nearest-neighbor values; how
/// such tables are derived is outside the scope of this crate. All loop
/// energy primitives used by the recursion, the backtracker and the
/// evaluator live here so that the three always agree.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyParams {
    pub temperature: f64,
    pub hairpin: [Energy; 31],
    pub bulge: [Energy; 31],
    pub internal_loop: [Energy; 31],
    /// Stacking energies indexed by the outer pair type and the reversed
    /// inner pair type.
    pub stack: [[Energy; N_PAIR_TYPES]; N_PAIR_TYPES],
    /// Terminal mismatch inside a hairpin, indexed by the loop-side
    /// neighbors of the closing pair.
    pub hairpin_mismatch: [[Energy; 5]; 5],
    /// Terminal mismatch on either side of an interior loop.
    pub interior_mismatch: [[Energy; 5]; 5],
    pub dangle5: [[Energy; 5]; N_PAIR_TYPES],
    pub dangle3: [[Energy; 5]; N_PAIR_TYPES],
    pub terminal_au: Energy,
    /// Cost per unpaired column inside a multiloop.
    pub ml_base: Energy,
    /// Cost of closing a multiloop, per sequence.
    pub ml_closing: Energy,
    /// Cost per multiloop stem, per sequence.
    pub ml_intern: Energy,
    pub ninio: Energy,
    pub max_ninio: Energy,
    /// Logarithmic extrapolation factor for loops longer than 30.
    pub lxc: f64,
    /// Bonus for specific tetraloops, keyed by the six ungapped characters
    /// starting at the closing 5' base.
    pub tetraloop_bonus: Vec<([u8; 6], Energy)>,
    /// Quadruplex score `alpha * (stack - 1) + beta * ln(linkers - 2)`.
    pub quad_alpha: Energy,
    pub quad_beta: f64,
    /// Penalty per tetrad position a sequence cannot fill with a guanine.
    pub quad_mismatch: Energy,
}

#[rustfmt::skip]
const HAIRPIN37: [Energy; 31] = [
    INF, INF, INF, 540, 560, 570, 540, 600, 550, 640, 650,
    660, 670, 678, 686, 694, 701, 707, 713, 719, 725,
    730, 735, 740, 744, 749, 753, 757, 761, 765, 769,
];

#[rustfmt::skip]
const BULGE37: [Energy; 31] = [
    INF, 380, 280, 320, 360, 400, 440, 459, 470, 480, 490,
    500, 510, 519, 527, 534, 541, 548, 554, 560, 565,
    571, 576, 580, 585, 589, 594, 598, 602, 605, 609,
];

#[rustfmt::skip]
const INTERNAL37: [Energy; 31] = [
    INF, INF, 100, 100, 110, 200, 200, 210, 230, 240, 250,
    260, 270, 278, 286, 294, 301, 307, 313, 319, 325,
    330, 335, 340, 345, 349, 353, 357, 361, 365, 369,
];

// Rows: outer pair type; columns: reversed inner pair type.
#[rustfmt::skip]
const STACK37: [[Energy; N_PAIR_TYPES]; N_PAIR_TYPES] = [
    [0, 0, 0, 0, 0, 0, 0, 0],
    [0, -240, -330, -210, -140, -210, -210, -140],
    [0, -330, -340, -250, -150, -220, -240, -150],
    [0, -210, -250,  130,  -50, -140, -130,  -50],
    [0, -140, -150,  -50,   30,  -60, -100,   30],
    [0, -210, -220, -140,  -60, -110,  -90,  -60],
    [0, -210, -240, -130, -100,  -90, -130,  -90],
    [0, -140, -150,  -50,   30,  -60,  -90,    0],
];

// Columns/rows 0 correspond to a missing neighbor and contribute nothing.
#[rustfmt::skip]
const HAIRPIN_MISMATCH37: [[Energy; 5]; 5] = [
    [0,    0,    0,    0,    0],
    [0,  -80, -100, -110,  -90],
    [0,  -90,  -70,  -50,  -80],
    [0, -150, -110, -130, -120],
    [0,  -90,  -70,  -80,  -60],
];

#[rustfmt::skip]
const INTERIOR_MISMATCH37: [[Energy; 5]; 5] = [
    [0,   0,   0,   0,   0],
    [0,   0,   0, -110,   0],
    [0,   0,   0,   0,   0],
    [0, -110,   0,   0,   0],
    [0,   0,   0,   0,  -70],
];

#[rustfmt::skip]
const DANGLE5_37: [[Energy; 5]; N_PAIR_TYPES] = [
    [0, 0, 0, 0, 0],
    [0, -50, -30, -20, -10],
    [0, -20, -30, -10,   0],
    [0, -30, -30, -40, -20],
    [0, -30, -10, -20, -20],
    [0, -30, -30, -40, -20],
    [0, -30, -10, -20, -20],
    [0, 0, 0, 0, 0],
];

#[rustfmt::skip]
const DANGLE3_37: [[Energy; 5]; N_PAIR_TYPES] = [
    [0, 0, 0, 0, 0],
    [0, -110, -40, -130, -60],
    [0, -170, -80, -170, -120],
    [0,  -70, -10,  -70, -10],
    [0,  -80, -50,  -80, -60],
    [0,  -70, -10,  -70, -10],
    [0,  -80, -50,  -80, -60],
    [0, 0, 0, 0, 0],
];

const TETRALOOPS37: [(&[u8; 6], Energy); 6] = [
    (b"CUUCGG", -300),
    (b"CGAAAG", -300),
    (b"CGCAAG", -250),
    (b"CGAGAG", -200),
    (b"CGGAAG", -150),
    (b"GGGGAC", -300),
];

impl EnergyParams {
    /// Builds the parameter table for the given temperature in °C.
    ///
    /// The length-dependent loop terms are entropy-dominated and rescale
    /// linearly with absolute temperature; the remaining 37 °C defaults are
    /// used as-is.
    pub fn scaled(temperature: f64) -> Self {
        let tempf = (temperature + K0) / T37;
        let rescale = |e: Energy| {
            if e >= INF {
                INF
            } else {
                (e as f64 * tempf) as Energy
            }
        };
        let rescale_table = |table: &[Energy; 31]| {
            let mut out = [0; 31];
            for (o, e) in out.iter_mut().zip(table) {
                *o = rescale(*e);
            }
            out
        };

        Self {
            temperature,
            hairpin: rescale_table(&HAIRPIN37),
            bulge: rescale_table(&BULGE37),
            internal_loop: rescale_table(&INTERNAL37),
            stack: STACK37,
            hairpin_mismatch: HAIRPIN_MISMATCH37,
            interior_mismatch: INTERIOR_MISMATCH37,
            dangle5: DANGLE5_37,
            dangle3: DANGLE3_37,
            terminal_au: 50,
            ml_base: rescale(0),
            ml_closing: rescale(340),
            ml_intern: rescale(40),
            ninio: rescale(60),
            max_ninio: rescale(300),
            lxc: 107.856 * tempf,
            tetraloop_bonus: TETRALOOPS37
                .iter()
                .map(|(motif, bonus)| (**motif, *bonus))
                .collect(),
            quad_alpha: -1800,
            quad_beta: 1200.0,
            quad_mismatch: 300,
        }
    }

    fn extrapolate(&self, table: &[Energy; 31], size: usize) -> Energy {
        if size <= 30 {
            table[size]
        } else {
            table[30] + (self.lxc * (size as f64 / 30.0).ln()) as Energy
        }
    }

    /// Hairpin loop closed by a pair of type `pair_type`, with `size`
    /// unpaired (ungapped) bases, loop-side neighbors `si1`/`sj1` and the
    /// ungapped loop sequence starting at the closing 5' base.
    pub fn hairpin_loop(
        &self,
        size: usize,
        pair_type: usize,
        si1: Symbol,
        sj1: Symbol,
        loop_seq: Option<&[u8]>,
    ) -> Energy {
        let mut energy = self.extrapolate(&self.hairpin, size);

        if size == 4 {
            if let Some(seq) = loop_seq {
                if seq.len() >= 6 {
                    let motif = &seq[..6];
                    for (tetraloop, bonus) in &self.tetraloop_bonus {
                        if tetraloop == motif {
                            energy += bonus;
                            break;
                        }
                    }
                }
            }
        }

        if size == 3 {
            if pair_type > 2 {
                energy += self.terminal_au;
            }
        } else {
            energy += self.hairpin_mismatch[base(si1)][base(sj1)];
        }

        energy
    }

    /// Interior loop (including stacks and bulges) with `n1`/`n2` unpaired
    /// bases on the two sides, closed by `t1` with inner reversed pair `t2`.
    #[allow(clippy::too_many_arguments)]
    pub fn interior_loop(
        &self,
        n1: usize,
        n2: usize,
        t1: usize,
        t2: usize,
        si1: Symbol,
        sj1: Symbol,
        sp1: Symbol,
        sq1: Symbol,
    ) -> Energy {
        let (nl, ns) = if n1 > n2 { (n1, n2) } else { (n2, n1) };

        if nl == 0 {
            return self.stack[t1][t2];
        }

        if ns == 0 {
            // bulge
            let mut energy = self.extrapolate(&self.bulge, nl);
            if nl == 1 {
                energy += self.stack[t1][t2];
            } else {
                if t1 > 2 {
                    energy += self.terminal_au;
                }
                if t2 > 2 {
                    energy += self.terminal_au;
                }
            }
            return energy;
        }

        let mut energy = self.extrapolate(&self.internal_loop, nl + ns);
        energy += self.max_ninio.min((nl - ns) as Energy * self.ninio);
        energy += self.interior_mismatch[base(si1)][base(sj1)]
            + self.interior_mismatch[base(sq1)][base(sp1)];
        energy
    }

    /// Contribution of a multiloop stem, with optional dangling neighbors
    /// (`-1` suppresses the respective side).
    pub fn multi_stem(&self, pair_type: usize, si1: Symbol, sj1: Symbol) -> Energy {
        self.stem_mismatch(pair_type, si1, sj1)
            + if pair_type > 2 { self.terminal_au } else { 0 }
            + self.ml_intern
    }

    /// Contribution of a stem in the exterior loop.
    pub fn exterior_stem(&self, pair_type: usize, si1: Symbol, sj1: Symbol) -> Energy {
        self.stem_mismatch(pair_type, si1, sj1)
            + if pair_type > 2 { self.terminal_au } else { 0 }
    }

    // The two-sided case is the sum of the one-sided dangles. Keeping this
    // identity exact makes column-based and ungapped-boundary dangle
    // bookkeeping agree wherever a neighbor code is 0.
    fn stem_mismatch(&self, pair_type: usize, si1: Symbol, sj1: Symbol) -> Energy {
        let mut energy = 0;
        if si1 >= 0 {
            energy += self.dangle5[pair_type][base(si1)];
        }
        if sj1 >= 0 {
            energy += self.dangle3[pair_type][base(sj1)];
        }
        energy
    }

    /// Score of a quadruplex of `stack` tetrads with `linker_total` linker
    /// columns, for one sequence.
    pub fn quad_stack(&self, stack: usize, linker_total: usize) -> Energy {
        debug_assert!(linker_total >= 3);
        self.quad_alpha * (stack as Energy - 1)
            + (self.quad_beta * (linker_total as f64 - 2.0).ln()) as Energy
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

    #[test]
    fn scaling_at_37_degrees_is_identity() {
        let params = EnergyParams::scaled(37.0);
        assert_eq!(params.hairpin, HAIRPIN37);
        assert_eq!(params.ml_closing, 340);
    }

    #[test]
    fn stack_is_an_interior_loop_without_unpaired_bases() {
        let params = EnergyParams::scaled(37.0);
        assert_eq!(
            params.interior_loop(0, 0, 1, 2, 1, 1, 1, 1),
            params.stack[1][2]
        );
    }

    #[test]
    fn long_hairpins_extrapolate_logarithmically() {
        let params = EnergyParams::scaled(37.0);
        assert!(params.hairpin_loop(60, 1, 1, 1, None) > params.hairpin_loop(30, 1, 1, 1, None));
    }

    #[test]
    fn mismatch_is_sum_of_dangles() {
        let params = EnergyParams::scaled(37.0);
        let both = params.exterior_stem(1, 2, 3);
        let left = params.exterior_stem(1, 2, -1);
        let right = params.exterior_stem(1, -1, 3);
        assert_eq!(both, left + right);
    }
}
