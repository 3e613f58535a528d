use thiserror::Error;

use crate::kekulize::KekulizeError;
use crate::smarts::SmartsError;

/// Errors from parsing a reaction SMARTS or applying it to one mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactionError {
    #[error("no '>>' separator found in reaction SMARTS")]
    MissingSeparator,
    #[error("too many '>' separators in reaction SMARTS")]
    TooManySeparators,
    #[error("reaction has no reactant template")]
    EmptyReactants,
    #[error("reaction has no product template")]
    EmptyProducts,
    #[error("invalid {section} template: {source}")]
    InvalidTemplate {
        section: &'static str,
        #[source]
        source: SmartsError,
    },
    #[error("map class {map_class} appears more than once in the {section} template")]
    DuplicateMapClass { section: &'static str, map_class: u16 },
    /// A product atom that is not carried over from the reactant must name
    /// its element.
    #[error("product template atom {index} has no element")]
    UnspecifiedProductAtom { index: usize },
    /// The mapping does not come from this reaction's reactant template.
    #[error("mapping covers {got} atoms, reactant template has {expected}")]
    MappingMismatch { expected: usize, got: usize },
    #[error("product kekulization failed: {0}")]
    Kekulize(#[from] KekulizeError),
}
