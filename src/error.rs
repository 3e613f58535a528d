use thiserror::Error;

use crate::atom_type::AtomTypingError;
use crate::kekulize::KekulizeError;
use crate::scorer::ScoringError;
use crate::smiles::SmilesError;

/// Broad category of a per-molecule failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The input cannot be processed as given.
    Structural,
    /// A chemistry primitive (typing, kekulization) failed on the input.
    ChemistryPrimitive,
    /// The scoring model could not evaluate an atom.
    Scoring,
    /// A bug: a panic caught at the worker boundary.
    Internal,
}

/// Why no prediction was produced for one molecule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("molecule has {0} disconnected fragments")]
    Disconnected(usize),
    #[error("unsupported element {symbol} at atom {atom}")]
    UnsupportedElement { atom: usize, symbol: String },
    #[error("molecule has {heavy_atoms} heavy atoms, limit is {limit}")]
    TooLarge { heavy_atoms: usize, limit: usize },
    #[error("molecule has no heavy atoms")]
    Empty,
    #[error("invalid SMILES: {0}")]
    InvalidSmiles(SmilesError),
    #[error(transparent)]
    AtomTyping(#[from] AtomTypingError),
    #[error(transparent)]
    Kekulize(#[from] KekulizeError),
    #[error("scoring failed: {0}")]
    Scoring(#[from] ScoringError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl PredictionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictionError::Disconnected(_)
            | PredictionError::UnsupportedElement { .. }
            | PredictionError::TooLarge { .. }
            | PredictionError::Empty
            | PredictionError::InvalidSmiles(_) => ErrorKind::Structural,
            PredictionError::AtomTyping(_) | PredictionError::Kekulize(_) => ErrorKind::ChemistryPrimitive,
            PredictionError::Scoring(_) => ErrorKind::Scoring,
            PredictionError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<SmilesError> for PredictionError {
    /// Kekulization failures inside the reader are chemistry failures, not
    /// syntax errors.
    fn from(err: SmilesError) -> Self {
        match err {
            SmilesError::Kekulize(inner) => PredictionError::Kekulize(inner),
            other => PredictionError::InvalidSmiles(other),
        }
    }
}
