use crate::{
    covariance::PairScores,
    error::{Error, Result},
    params::Energy,
};

/// Per-sequence soft constraints: pseudo-energies added to specific loop
/// closures during filling, backtracking and evaluation alike.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoftConstraints {
    /// Pseudo-energy per column pair, triangular with the shared linear
    /// index function (see [`crate::matrices::TriIndex`]).
    pub pair_energies: Option<Vec<Energy>>,
    /// Pseudo-energy per column, added once for each of the four columns of
    /// an exact helix stack. 1-based.
    pub stack_energies: Option<Vec<Energy>>,
}

/// Applies a hard-constraint string in pseudo-dot-bracket notation to the
/// covariance score matrix.
///
/// - `.` leaves the column unconstrained,
/// - `x` forces it unpaired,
/// - `<` forces it to pair with some downstream column,
/// - `>` forces it to pair with some upstream column,
/// - `(`/`)` force the specific enclosed pair (conflicting and crossing
///   pairs are forbidden, the forced pair's score is lifted to at least 0),
/// - `|` forces the column to pair with some partner by lifting the
///   covariance veto for all of its pairs.
pub fn apply_hard_constraints(
    scores: &mut PairScores,
    specification: &str,
    columns: usize,
) -> Result<()> {
    if specification.len() != columns {
        return Err(Error::LengthMismatch {
            expected: columns,
            found: specification.len(),
        });
    }

    let mut open = Vec::new();
    for (index, character) in specification.bytes().enumerate() {
        let j = index + 1;
        match character {
            b'.' => {}
            b'x' => {
                for l in 1..j {
                    scores.forbid(l, j);
                }
                for l in j + 1..=columns {
                    scores.forbid(j, l);
                }
            }
            b'<' => {
                for l in 1..j {
                    scores.forbid(l, j);
                }
            }
            b'>' => {
                for l in j + 1..=columns {
                    scores.forbid(j, l);
                }
            }
            b'|' => {
                for l in 1..j {
                    if scores.get(l, j) < 0 {
                        scores.set(l, j, 0);
                    }
                }
                for l in j + 1..=columns {
                    if scores.get(j, l) < 0 {
                        scores.set(j, l, 0);
                    }
                }
            }
            b'(' => {
                for l in 1..j {
                    scores.forbid(l, j);
                }
                open.push(j);
            }
            b')' => {
                let i = open.pop().ok_or(Error::UnbalancedBracket { column: j })?;
                let forced = scores.get(i, j).max(0);
                // no pair may cross or conflict with the forced one
                for k in i + 1..j {
                    for l in 1..i {
                        scores.forbid(l, k);
                    }
                    for l in j + 1..=columns {
                        scores.forbid(k, l);
                    }
                }
                for l in 1..=columns {
                    scores.forbid(l.min(i), l.max(i));
                    scores.forbid(l.min(j), l.max(j));
                }
                scores.set(i, j, forced);
            }
            other => {
                return Err(Error::InvalidCharacter {
                    character: other as char,
                    column: j,
                })
            }
        }
    }

    if let Some(&column) = open.first() {
        return Err(Error::UnbalancedBracket { column });
    }
    Ok(())
}
