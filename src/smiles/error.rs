use thiserror::Error;

use crate::kekulize::KekulizeError;

/// Errors produced when reading a SMILES string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmilesError {
    #[error("empty SMILES string")]
    EmptyInput,
    #[error("unexpected end of SMILES")]
    UnexpectedEnd,
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { pos: usize, ch: char },
    /// A well-formed element symbol outside the supported element table.
    #[error("unsupported element '{symbol}' at position {pos}")]
    UnsupportedElement { pos: usize, symbol: String },
    #[error("unclosed bracket atom starting at position {pos}")]
    UnclosedBracket { pos: usize },
    #[error("unclosed ring {digit}")]
    UnclosedRing { digit: u16 },
    #[error("unmatched parenthesis at position {pos}")]
    UnmatchedParen { pos: usize },
    #[error("bond symbol at position {pos} is not followed by an atom")]
    DanglingBond { pos: usize },
    #[error("{field} at position {pos} is out of range")]
    OutOfRange { pos: usize, field: &'static str },
    #[error("conflicting bond types on ring closure {digit}")]
    RingBondConflict { digit: u16 },
    #[error(transparent)]
    Kekulize(#[from] KekulizeError),
}
