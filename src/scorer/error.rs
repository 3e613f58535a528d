use thiserror::Error;

/// Failures of the probability model or the applicability-domain index.
///
/// Only model failures are fatal to a molecule; index failures make the
/// scorer omit the confidence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("model evaluation failed: {0}")]
    Evaluation(String),
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("invalid reference set: {0}")]
    InvalidReference(String),
    #[error("fingerprint has {got} bits, index expects {expected}")]
    FingerprintWidth { expected: usize, got: usize },
    #[error("reference index is empty")]
    EmptyIndex,
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
}

impl ScoringError {
    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
