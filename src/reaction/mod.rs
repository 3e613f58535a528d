//! Reaction SMARTS transformations.
//!
//! A [`Reaction`] pairs a reactant template with a product template. Atoms
//! are carried from one side to the other by map class (`[C:1]`); matching
//! happens against the reactant template only, and [`Reaction::apply`]
//! rewrites a private copy of the molecule for one mapping.

mod apply;
pub mod error;
mod parser;

pub use error::ReactionError;
pub use parser::parse_reaction_smarts;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::mol::Mol;
use crate::smarts::{find_smarts_mappings_in, AtomExpr, BondExpr, MatchContext};
use crate::substruct::Mapping;

#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub(crate) reactant: Mol<AtomExpr, BondExpr>,
    pub(crate) product: Mol<AtomExpr, BondExpr>,
}

impl Reaction {
    pub fn reactant_template(&self) -> &Mol<AtomExpr, BondExpr> {
        &self.reactant
    }

    pub fn product_template(&self) -> &Mol<AtomExpr, BondExpr> {
        &self.product
    }

    /// All mappings of the reactant template onto the context's molecule.
    pub fn mappings(&self, ctx: &MatchContext) -> Vec<Mapping> {
        find_smarts_mappings_in(ctx, &self.reactant)
    }

    /// Convenience over [`Reaction::mappings`] and [`Reaction::apply`]: one
    /// product per mapping, failures included.
    pub fn run(&self, mol: &Mol<Atom, Bond>) -> Vec<Result<Mol<Atom, Bond>, ReactionError>> {
        let ctx = MatchContext::new(mol);
        self.mappings(&ctx)
            .iter()
            .map(|mapping| self.apply(mol, mapping))
            .collect()
    }
}

pub fn from_reaction_smarts(s: &str) -> Result<Reaction, ReactionError> {
    parse_reaction_smarts(s)
}
