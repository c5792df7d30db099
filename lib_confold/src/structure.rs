use crate::{
    error::{Error, Result},
    gquad::QuadGeometry,
};

/// One element of a consensus structure. Regular pairs have `i < j`; a
/// quadruplex tetrad column is recorded as a self-pair with `i == j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasePair {
    pub i: usize,
    pub j: usize,
}

impl BasePair {
    pub fn is_tetrad(&self) -> bool {
        self.i == self.j
    }
}

/// Renders a pair list as dot-bracket notation, tetrad columns as `+`.
pub fn dot_bracket(pairs: &[BasePair], columns: usize) -> String {
    let mut structure = vec![b'.'; columns];
    for pair in pairs {
        if pair.is_tetrad() {
            structure[pair.i - 1] = b'+';
        } else {
            structure[pair.i - 1] = b'(';
            structure[pair.j - 1] = b')';
        }
    }
    String::from_utf8(structure).unwrap_or_default()
}

/// Builds the 1-based pairing table of a dot-bracket string: `table[i]` is
/// the partner of column i or 0, `table[0]` is the number of columns.
/// Quadruplex tetrad columns (`+`) are left unpaired here; the evaluator
/// handles them in a separate correction pass.
pub fn pairing_table(structure: &str) -> Result<Vec<usize>> {
    let columns = structure.len();
    let mut table = vec![0; columns + 1];
    table[0] = columns;

    let mut open = Vec::new();
    for (index, character) in structure.bytes().enumerate() {
        let column = index + 1;
        match character {
            b'.' | b'+' => {}
            b'(' => open.push(column),
            b')' => {
                let i = open.pop().ok_or(Error::UnbalancedBracket { column })?;
                table[i] = column;
                table[column] = i;
            }
            other => {
                return Err(Error::InvalidCharacter {
                    character: other as char,
                    column,
                })
            }
        }
    }

    if let Some(&column) = open.first() {
        return Err(Error::UnbalancedBracket { column });
    }
    Ok(table)
}

/// Loop index per column: columns enclosed by the same closing pair share a
/// number, exterior columns get 0.
pub fn loop_index(table: &[usize]) -> Vec<usize> {
    let columns = table[0];
    let mut index = vec![0; columns + 1];
    let mut stack = Vec::new();
    let mut loops = 0;

    for column in 1..=columns {
        let partner = table[column];
        if partner > column {
            loops += 1;
            stack.push(loops);
        }
        index[column] = stack.last().copied().unwrap_or(0);
        if partner != 0 && partner < column {
            stack.pop();
        }
    }
    index
}

/// A quadruplex motif as written in a structure string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadMotif {
    /// First column of the motif.
    pub start: usize,
    pub geometry: QuadGeometry,
}

impl QuadMotif {
    /// Last column of the motif.
    pub fn end(&self) -> usize {
        self.start + self.geometry.span() - 1
    }
}

/// Parses all quadruplex motifs of a structure string, left to right.
///
/// A motif is four runs of `+` of equal length separated by at least one
/// other column each.
pub fn parse_quads(structure: &str) -> Result<Vec<QuadMotif>> {
    let bytes = structure.as_bytes();
    let mut runs = Vec::new();
    let mut column = 1;
    while column <= bytes.len() {
        if bytes[column - 1] == b'+' {
            let start = column;
            while column <= bytes.len() && bytes[column - 1] == b'+' {
                column += 1;
            }
            runs.push((start, column - start));
        } else {
            column += 1;
        }
    }

    let mut motifs = Vec::new();
    for group in runs.chunks(4) {
        let (start, stack) = group[0];
        if group.len() != 4 || group.iter().any(|&(_, length)| length != stack) {
            return Err(Error::MalformedQuadruplex { column: start });
        }
        let mut linkers = [0; 3];
        for (linker, window) in linkers.iter_mut().zip(group.windows(2)) {
            let (previous, length) = window[0];
            *linker = window[1].0 - (previous + length);
        }
        motifs.push(QuadMotif {
            start,
            geometry: QuadGeometry { stack, linkers },
        });
    }
    Ok(motifs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_bracket_round_trip() {
        let pairs = [BasePair { i: 1, j: 10 }, BasePair { i: 2, j: 9 }];
        let structure = dot_bracket(&pairs, 10);
        assert_eq!(structure, "((......))");
        let table = pairing_table(&structure).unwrap();
        assert_eq!(table[1], 10);
        assert_eq!(table[9], 2);
        assert_eq!(table[5], 0);
    }

    #[test]
    fn tetrads_render_as_plus_and_stay_unpaired() {
        let pairs = [
            BasePair { i: 2, j: 2 },
            BasePair { i: 4, j: 4 },
            BasePair { i: 6, j: 6 },
            BasePair { i: 8, j: 8 },
        ];
        let structure = dot_bracket(&pairs, 9);
        assert_eq!(structure, ".+.+.+.+.");
        let table = pairing_table(&structure).unwrap();
        assert!(table[1..].iter().all(|&partner| partner == 0));
    }

    #[test]
    fn rejects_malformed_structures() {
        assert!(matches!(
            pairing_table("(.."),
            Err(Error::UnbalancedBracket { column: 1 })
        ));
        assert!(matches!(
            pairing_table("..)"),
            Err(Error::UnbalancedBracket { column: 3 })
        ));
        assert!(pairing_table("(.[)").is_err());
    }

    #[test]
    fn loop_index_distinguishes_loops() {
        let table = pairing_table("((...))(...)").unwrap();
        let index = loop_index(&table);
        assert_eq!(index[4], 2);
        assert_eq!(index[10], 3);
        assert_eq!(index[1], 1);
    }

    #[test]
    fn parses_quadruplex_runs() {
        let motifs = parse_quads("..++.++.++.++..").unwrap();
        assert_eq!(motifs.len(), 1);
        assert_eq!(motifs[0].start, 3);
        assert_eq!(
            motifs[0].geometry,
            QuadGeometry {
                stack: 2,
                linkers: [1, 1, 1]
            }
        );
        assert_eq!(motifs[0].end(), 13);
    }

    #[test]
    fn rejects_unequal_tetrad_runs() {
        assert!(parse_quads("++.+.++.++").is_err());
        assert!(parse_quads("++.++.++").is_err());
    }
}
