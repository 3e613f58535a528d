use thiserror::Error;

use crate::reaction::ReactionError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("malformed rule table: {0}")]
    Json(String),
    #[error("rule {name:?} has an invalid pattern")]
    InvalidPattern {
        name: String,
        #[source]
        source: ReactionError,
    },
    #[error("rule name {0:?} appears more than once")]
    DuplicateName(String),
    #[error("rule {name:?} has priority {priority}, expected a finite non-negative weight")]
    InvalidPriority { name: String, priority: f64 },
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
}
