use thiserror::Error;

/// Errors produced when parsing a SMARTS pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmartsError {
    #[error("empty SMARTS string")]
    EmptyInput,
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { pos: usize, ch: char },
    #[error("unexpected end of SMARTS")]
    UnexpectedEnd,
    #[error("unclosed bracket atom starting at position {pos}")]
    UnclosedBracket { pos: usize },
    #[error("unclosed ring {digit}")]
    UnclosedRing { digit: u16 },
    #[error("unmatched parenthesis at position {pos}")]
    UnmatchedParen { pos: usize },
    #[error("invalid atomic number at position {pos}")]
    InvalidAtomicNum { pos: usize },
    #[error("recursive SMARTS at position {pos} is not supported")]
    RecursiveUnsupported { pos: usize },
}
