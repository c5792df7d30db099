use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("An IO error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("A parsing error occurred on string '{input}': {kind:?}")]
    Parser {
        input: String,
        kind: nom::error::ErrorKind,
    },

    #[error("Parsing was unsuccessful due to incomplete input: {0:?}")]
    ParserIncomplete(nom::Needed),

    #[error("The alignment contains no sequences")]
    EmptyAlignment,

    #[error("Unequal aligned sequence lengths: expected {expected}, found {found}")]
    UnequalSequenceLengths { expected: usize, found: usize },

    #[error("The string has length {found}, but the alignment has {expected} columns")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Unbalanced bracket at column {column}")]
    UnbalancedBracket { column: usize },

    #[error("Invalid character '{character}' at column {column}")]
    InvalidCharacter { character: char, column: usize },

    #[error("Quadruplex motifs are not supported on circular alignments")]
    CircularQuadruplex,

    #[error("Malformed quadruplex motif starting at column {column}")]
    MalformedQuadruplex { column: usize },
}
