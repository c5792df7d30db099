use crate::error::{Error, Result};

/// Numeric symbol code: 0 for gaps and unknowns, A=1, C=2, G=3, U/T=4.
/// Negative values are only used as "no neighbor" sentinels in energy
/// lookups.
pub type Symbol = i16;

pub const GUANINE: Symbol = 3;

/// Maps a pair type to the type of the reversed pair.
pub const REVERSE_TYPE: [usize; 8] = [0, 2, 1, 4, 3, 6, 5, 7];

pub fn is_gap(character: u8) -> bool {
    matches!(character, b'-' | b'_' | b'~' | b'.')
}

pub fn encode_symbol(character: u8) -> Symbol {
    match character.to_ascii_uppercase() {
        b'A' => 1,
        b'C' => 2,
        b'G' => 3,
        b'U' | b'T' => 4,
        _ => 0,
    }
}

/// Type of the pair formed by two symbol codes: CG=1, GC=2, GU=3, UG=4,
/// AU=5, UA=6, and 0 for everything that does not pair.
pub fn pair_type(a: Symbol, b: Symbol, wobble_pairs: bool) -> usize {
    match (a, b) {
        (2, 3) => 1,
        (3, 2) => 2,
        (3, 4) if wobble_pairs => 3,
        (4, 3) if wobble_pairs => 4,
        (1, 4) => 5,
        (4, 1) => 6,
        _ => 0,
    }
}

/// One aligned sequence, encoded for energy evaluation.
///
/// All positional arrays are 1-based like the recursion; index 0 is unused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSequence {
    /// Symbol code per alignment column, length `columns + 1`.
    pub codes: Vec<Symbol>,
    /// Nearest non-gap symbol 5' of each column (0 if none), length
    /// `columns + 2`.
    pub upstream: Vec<Symbol>,
    /// Nearest non-gap symbol 3' of each column (0 if none), length
    /// `columns + 2`.
    pub downstream: Vec<Symbol>,
    /// The gap-stripped sequence characters, 0-based.
    pub ungapped: Vec<u8>,
    /// Number of ungapped positions up to and including each column,
    /// length `columns + 1`.
    pub col_to_pos: Vec<usize>,
}

impl EncodedSequence {
    pub fn encode(sequence: &str, circular: bool) -> Self {
        let bytes = sequence.as_bytes();
        let columns = bytes.len();

        let mut codes = vec![0; columns + 1];
        for (column, &character) in bytes.iter().enumerate() {
            codes[column + 1] = encode_symbol(character);
        }

        let mut upstream = vec![0; columns + 2];
        let mut downstream = vec![0; columns + 2];
        let mut ungapped = Vec::with_capacity(columns);
        let mut col_to_pos = vec![0; columns + 1];

        if circular {
            // the nearest neighbors wrap around the origin
            for column in (1..=columns).rev() {
                if !is_gap(bytes[column - 1]) {
                    upstream[1] = codes[column];
                    break;
                }
            }
            for column in 1..=columns {
                if !is_gap(bytes[column - 1]) {
                    downstream[columns] = codes[column];
                    break;
                }
            }
        }

        for column in 1..=columns {
            if is_gap(bytes[column - 1]) {
                upstream[column + 1] = upstream[column];
            } else {
                ungapped.push(bytes[column - 1]);
                upstream[column + 1] = codes[column];
            }
            col_to_pos[column] = ungapped.len();
        }
        for column in (1..=columns).rev() {
            if is_gap(bytes[column - 1]) {
                downstream[column - 1] = downstream[column];
            } else {
                downstream[column - 1] = codes[column];
            }
        }

        Self {
            codes,
            upstream,
            downstream,
            ungapped,
            col_to_pos,
        }
    }

    pub fn ungapped_len(&self) -> usize {
        self.ungapped.len()
    }
}

/// The encoded, immutable view of one alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub sequences: Vec<EncodedSequence>,
    /// Consensus symbol code per column, 1-based.
    pub consensus: Vec<Symbol>,
    columns: usize,
}

impl Alignment {
    /// Encodes all sequences. Fails fast on an empty alignment or unequal
    /// sequence lengths; the recursion never re-checks these.
    pub fn new(sequences: &[&str], circular: bool) -> Result<Self> {
        if sequences.is_empty() {
            return Err(Error::EmptyAlignment);
        }
        let columns = sequences[0].len();
        for sequence in sequences {
            if sequence.len() != columns {
                return Err(Error::UnequalSequenceLengths {
                    expected: columns,
                    found: sequence.len(),
                });
            }
        }

        let encoded = sequences
            .iter()
            .map(|sequence| EncodedSequence::encode(sequence, circular))
            .collect();

        Ok(Self {
            sequences: encoded,
            consensus: consensus(sequences, columns),
            columns,
        })
    }

    pub fn n_seq(&self) -> usize {
        self.sequences.len()
    }

    pub fn columns(&self) -> usize {
        self.columns
    }
}

/// Most frequent character per column, encoded; first one wins ties.
fn consensus(sequences: &[&str], columns: usize) -> Vec<Symbol> {
    let mut consensus = vec![0; columns + 1];
    for column in 1..=columns {
        let mut counts = [0usize; 256];
        let mut best = sequences[0].as_bytes()[column - 1];
        for sequence in sequences {
            let character = sequence.as_bytes()[column - 1];
            counts[character as usize] += 1;
            if counts[character as usize] > counts[best as usize] {
                best = character;
            }
        }
        consensus[column] = encode_symbol(best);
    }
    consensus
}

/// Average and minimum pairwise percent identity of the raw aligned
/// sequences. Used for reporting only.
pub fn mean_pairwise_identity(sequences: &[&str]) -> (f64, f64) {
    let mut pair_count = 0usize;
    let mut identity_sum = 0.0;
    let mut minimum = 100.0f64;

    for (index, first) in sequences.iter().enumerate() {
        for second in &sequences[index + 1..] {
            let matching = first
                .bytes()
                .zip(second.bytes())
                .filter(|(a, b)| a == b)
                .count();
            let identity = 100.0 * matching as f64 / first.len().max(1) as f64;
            identity_sum += identity;
            minimum = minimum.min(identity);
            pair_count += 1;
        }
    }

    if pair_count == 0 {
        (100.0, 100.0)
    } else {
        (identity_sum / pair_count as f64, minimum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_symbols_and_gaps() {
        let encoded = EncodedSequence::encode("A-CGU", false);
        assert_eq!(encoded.codes[1..], [1, 0, 2, 3, 4]);
        assert_eq!(encoded.ungapped, b"ACGU");
        assert_eq!(encoded.col_to_pos[1..], [1, 1, 2, 3, 4]);
    }

    #[test]
    fn neighbors_skip_gaps() {
        let encoded = EncodedSequence::encode("A--GU", false);
        // upstream neighbor of column 4 (G) is A
        assert_eq!(encoded.upstream[4], 1);
        // downstream neighbor of column 1 (A) is G
        assert_eq!(encoded.downstream[1], 3);
        // sequence ends have no neighbors on a linear backbone
        assert_eq!(encoded.upstream[1], 0);
        assert_eq!(encoded.downstream[5], 0);
    }

    #[test]
    fn circular_neighbors_wrap() {
        let encoded = EncodedSequence::encode("AGGU-", true);
        assert_eq!(encoded.upstream[1], 4);
        assert_eq!(encoded.downstream[4], 1);
    }

    #[test]
    fn rejects_unequal_lengths() {
        assert!(matches!(
            Alignment::new(&["ACGU", "ACG"], false),
            Err(Error::UnequalSequenceLengths { .. })
        ));
        assert!(matches!(Alignment::new(&[], false), Err(Error::EmptyAlignment)));
    }

    #[test]
    fn consensus_prefers_majority() {
        let alignment = Alignment::new(&["GGA", "GCA", "GCC"], false).unwrap();
        assert_eq!(alignment.consensus[1..], [3, 2, 1]);
    }

    #[test]
    fn pairwise_identity() {
        let (mean, min) = mean_pairwise_identity(&["ACGU", "ACGA"]);
        assert_eq!(mean, 75.0);
        assert_eq!(min, 75.0);
    }

    #[test]
    fn canonical_pair_types() {
        assert_eq!(pair_type(2, 3, true), 1);
        assert_eq!(pair_type(3, 4, true), 3);
        assert_eq!(pair_type(3, 4, false), 0);
        assert_eq!(pair_type(1, 1, true), 0);
    }
}
